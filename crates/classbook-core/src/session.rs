//! Authentication session manager.
//!
//! Owns the current user and the lifecycle of the bearer token: exchanges
//! credentials for a token, resolves the user behind a stored token, and
//! forgets both on logout. Failures are terminal per attempt.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::user_message;
use crate::model::{User, UserCreate};
use crate::traits::{JournalApi, TokenStore};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Result of a login or registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

pub struct AuthSession {
    api: Arc<dyn JournalApi>,
    tokens: Arc<dyn TokenStore>,
    user: Option<User>,
    loading: bool,
}

impl AuthSession {
    /// A session that has not yet looked at the stored token.
    pub fn new(api: Arc<dyn JournalApi>, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            tokens,
            user: None,
            loading: true,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// True until [`restore`](Self::restore) has run.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Resolve the user behind a previously stored token.
    ///
    /// A token the server rejects is discarded.
    pub async fn restore(&mut self) -> Option<&User> {
        if self.tokens.get().is_some() {
            match self.api.current_user().await {
                Ok(user) => {
                    debug!(username = %user.username, "restored session");
                    self.user = Some(user);
                }
                Err(e) => {
                    warn!("stored token rejected, discarding it: {e:#}");
                    self.discard_token();
                }
            }
        }
        self.loading = false;
        self.user.as_ref()
    }

    /// Exchange credentials for a token, store it, and load the user.
    pub async fn login(&mut self, username: &str, password: &str) -> AuthOutcome {
        let token = match self.api.login(username, password).await {
            Ok(t) => t,
            Err(e) => {
                warn!(username, "login rejected: {e:#}");
                return AuthOutcome::failed(user_message(&e, LOGIN_FAILED));
            }
        };

        if let Err(e) = self.tokens.set(&token.access_token) {
            return AuthOutcome::failed(format!("{LOGIN_FAILED}: {e:#}"));
        }

        match self.api.current_user().await {
            Ok(user) => {
                info!(username = %user.username, "logged in");
                self.user = Some(user);
                AuthOutcome::ok()
            }
            Err(e) => {
                warn!(username, "token issued but user lookup failed: {e:#}");
                self.discard_token();
                AuthOutcome::failed(user_message(&e, LOGIN_FAILED))
            }
        }
    }

    /// Create an account. Does not log in.
    pub async fn register(&mut self, user: &UserCreate) -> AuthOutcome {
        match self.api.register(user).await {
            Ok(created) => {
                info!(username = %created.username, "registered");
                AuthOutcome::ok()
            }
            Err(e) => AuthOutcome::failed(user_message(&e, REGISTRATION_FAILED)),
        }
    }

    pub fn logout(&mut self) {
        self.discard_token();
        if let Some(user) = self.user.take() {
            info!(username = %user.username, "logged out");
        }
    }

    fn discard_token(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!("failed to clear stored token: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockApi;
    use crate::traits::MemoryTokenStore;

    fn setup() -> (Arc<MemoryTokenStore>, Arc<MockApi>, AuthSession) {
        let tokens = Arc::new(MemoryTokenStore::new());
        let api = Arc::new(MockApi::new(tokens.clone()));
        api.add_user("anna", "anna@school.test", "secret");
        let session = AuthSession::new(api.clone(), tokens.clone());
        (tokens, api, session)
    }

    #[tokio::test]
    async fn valid_login_stores_token_and_user() {
        let (tokens, _api, mut session) = setup();

        let outcome = session.login("anna", "secret").await;
        assert_eq!(outcome, AuthOutcome::ok());
        assert!(tokens.get().is_some());
        assert_eq!(session.user().unwrap().username, "anna");
    }

    #[tokio::test]
    async fn invalid_login_leaves_no_token() {
        let (tokens, api, mut session) = setup();

        let outcome = session.login("anna", "wrong").await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Incorrect username or password")
        );
        assert!(tokens.get().is_none());
        assert!(!session.is_authenticated());
        assert_eq!(api.call_count("current_user"), 0);
    }

    #[tokio::test]
    async fn failed_user_lookup_discards_token() {
        let (tokens, api, mut session) = setup();
        api.fail_on("current_user", 500, serde_json::Value::Null);

        let outcome = session.login("anna", "secret").await;
        assert_eq!(outcome.error.as_deref(), Some("Login failed"));
        assert!(tokens.get().is_none());
    }

    #[tokio::test]
    async fn restore_resolves_or_discards() {
        let (tokens, _api, mut session) = setup();
        assert!(session.is_loading());
        session.login("anna", "secret").await;
        let token = tokens.get().unwrap();

        let api = Arc::new(MockApi::new(tokens.clone()));
        let mut fresh = AuthSession::new(api, tokens.clone());
        // The new backend never issued this token.
        assert!(fresh.restore().await.is_none());
        assert!(!fresh.is_loading());
        assert!(tokens.get().is_none());

        tokens.set(&token).unwrap();
        assert!(session.restore().await.is_some());
    }

    #[tokio::test]
    async fn restore_without_token_skips_network() {
        let (_tokens, api, mut session) = setup();
        assert!(session.restore().await.is_none());
        assert_eq!(api.total_calls(), 0);
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn register_reports_duplicate_username() {
        let (_tokens, _api, mut session) = setup();
        let user = UserCreate {
            username: "boris".into(),
            email: "boris@school.test".into(),
            password: "pw".into(),
        };
        assert!(session.register(&user).await.success);
        let again = session.register(&user).await;
        assert_eq!(again.error.as_deref(), Some("Username already registered"));
        // Registration does not log in.
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (tokens, _api, mut session) = setup();
        session.login("anna", "secret").await;
        session.logout();
        assert!(tokens.get().is_none());
        assert!(session.user().is_none());
    }
}
