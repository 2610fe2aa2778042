//! File-backed token store.
//!
//! The token is kept in a small JSON document under the `access_token` key,
//! the CLI's counterpart of browser local storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use classbook_core::traits::{TokenStore, ACCESS_TOKEN_KEY};

#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse session file: {}", self.path.display()))
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create session directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(values).context("failed to serialize session")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write session file: {}", self.path.display()))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match self.read() {
            Ok(mut values) => values.remove(ACCESS_TOKEN_KEY),
            Err(e) => {
                warn!("ignoring unreadable session file: {e:#}");
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<()> {
        let mut values = self.read().unwrap_or_default();
        values.insert(ACCESS_TOKEN_KEY.to_string(), token.to_string());
        self.write(&values)
    }

    fn clear(&self) -> Result<()> {
        let mut values = self.read().unwrap_or_default();
        if values.remove(ACCESS_TOKEN_KEY).is_none() && !self.path.exists() {
            return Ok(());
        }
        if values.is_empty() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove session file: {}", self.path.display()))
        } else {
            self.write(&values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested/session.json"));
        assert!(store.get().is_none());

        store.set("tok-1").unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"access_token\""));

        let reopened = FileTokenStore::new(store.path().to_path_buf());
        assert_eq!(reopened.get().as_deref(), Some("tok-1"));

        reopened.clear().unwrap();
        assert!(store.get().is_none());
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileTokenStore::new(&path);
        assert!(store.get().is_none());
        store.set("tok-2").unwrap();
        assert_eq!(store.get().as_deref(), Some("tok-2"));
        store.clear().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn clear_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"access_token": "t", "theme": "dark"}"#).unwrap();
        let store = FileTokenStore::new(&path);
        store.clear().unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("theme"));
        assert!(!raw.contains("access_token"));
    }
}
