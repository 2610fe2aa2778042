pub mod auth;
pub mod classes;
pub mod entries;
pub mod init;
pub mod students;
pub mod subjects;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use classbook_client::{create_client, load_config_from};
use classbook_core::traits::{JournalApi, TokenStore};
use classbook_core::views::{Banner, Confirm};
use classbook_core::AuthSession;

/// How listings are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Everything a command needs: the shared client, its token store, and the
/// session built on top of them.
pub struct App {
    pub api: Arc<dyn JournalApi>,
    pub tokens: Arc<dyn TokenStore>,
    pub session: AuthSession,
    pub format: OutputFormat,
}

impl App {
    pub fn connect(config_path: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        tracing::debug!(base_url = %config.base_url, "using journal API");
        let (http, tokens) = create_client(&config)?;
        let api: Arc<dyn JournalApi> = http;
        let session = AuthSession::new(api.clone(), tokens.clone());
        Ok(Self {
            api,
            tokens,
            session,
            format,
        })
    }

    /// Connect and resolve the stored token; fail if nobody is signed in.
    pub async fn signed_in(config_path: Option<PathBuf>, format: OutputFormat) -> Result<Self> {
        let mut app = Self::connect(config_path, format)?;
        if app.tokens.get().is_none() {
            anyhow::bail!("not logged in. Run `classbook login` first.");
        }
        if app.session.restore().await.is_none() {
            anyhow::bail!("session expired. Run `classbook login` again.");
        }
        Ok(app)
    }
}

/// Turn a view's error banner into a command failure.
pub fn check_banner(banner: &Banner) -> Result<()> {
    match banner.message() {
        Some(msg) => anyhow::bail!("{msg}"),
        None => Ok(()),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Confirmation read from stdin, or granted up front with `--yes`.
pub struct PromptConfirm {
    pub assume_yes: bool,
}

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
