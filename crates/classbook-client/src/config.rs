//! Client configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use classbook_core::traits::TokenStore;

use crate::http::{HttpApi, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};
use crate::store::FileTokenStore;

/// Top-level classbook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the journal API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where the bearer token is persisted.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_token_file() -> PathBuf {
    dirs_path()
        .map(|d| d.join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".classbook-session.json"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token_file: default_token_file(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied as-is and never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + len];
        out.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `classbook.toml` in the current directory
/// 2. `~/.config/classbook/config.toml`
///
/// Environment variable override: `CLASSBOOK_API_URL`.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("classbook.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    if let Ok(url) = std::env::var("CLASSBOOK_API_URL") {
        config.base_url = url;
    }

    config.base_url = resolve_env_vars(&config.base_url);
    config.token_file = PathBuf::from(resolve_env_vars(&config.token_file.to_string_lossy()));
    anyhow::ensure!(config.timeout_secs >= 1, "timeout_secs must be at least 1");

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("classbook"))
}

/// Build the HTTP client and the token store it shares with the session.
pub fn create_client(config: &ClientConfig) -> Result<(Arc<HttpApi>, Arc<dyn TokenStore>)> {
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let api = HttpApi::new(
        Some(config.base_url.clone()),
        config.timeout_secs,
        tokens.clone(),
    )?;
    Ok((Arc::new(api), tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_CLASSBOOK_TEST_VAR", "school.test");
        assert_eq!(resolve_env_vars("${_CLASSBOOK_TEST_VAR}"), "school.test");
        assert_eq!(
            resolve_env_vars("https://${_CLASSBOOK_TEST_VAR}/api"),
            "https://school.test/api"
        );
        std::env::remove_var("_CLASSBOOK_TEST_VAR");
    }

    #[test]
    fn resolve_env_vars_does_not_reexpand_values() {
        std::env::set_var("_CLASSBOOK_SELF_REF", "${_CLASSBOOK_SELF_REF}");
        assert_eq!(
            resolve_env_vars("${_CLASSBOOK_SELF_REF}/api"),
            "${_CLASSBOOK_SELF_REF}/api"
        );
        std::env::remove_var("_CLASSBOOK_SELF_REF");

        assert_eq!(resolve_env_vars("${_CLASSBOOK_UNSET_VAR}x"), "x");
        assert_eq!(resolve_env_vars("a ${unterminated"), "a ${unterminated");
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token_file.ends_with("session.json"));
    }

    #[test]
    fn parse_partial_config() {
        let config: ClientConfig = toml::from_str(
            r#"
base_url = "https://journal.school.test"
token_file = "session.json"
"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://journal.school.test");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.token_file, PathBuf::from("session.json"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/classbook.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classbook.toml");
        std::fs::write(&path, "timeout_secs = 5\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 5);

        std::fs::write(&path, "timeout_secs = 0\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }

    #[test]
    fn factory_shares_token_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            token_file: dir.path().join("session.json"),
            ..ClientConfig::default()
        };
        let (api, tokens) = create_client(&config).unwrap();
        assert_eq!(api.base_url(), "http://localhost:8000");
        tokens.set("tok").unwrap();
        assert!(config.token_file.exists());
    }
}
