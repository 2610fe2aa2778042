//! Core trait definitions for the journal API transport and token storage.
//!
//! `JournalApi` is implemented by `classbook-client` over HTTP and by
//! [`MockApi`](crate::mock::MockApi) in memory.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::{
    Class, ClassCreate, ClassWithStudents, Id, JournalEntry, JournalEntryCreate, MessageResponse,
    Student, StudentCreate, Subject, SubjectCreate, TokenResponse, User, UserCreate,
};

// ---------------------------------------------------------------------------
// Journal API trait
// ---------------------------------------------------------------------------

/// One method per REST endpoint the application consumes.
///
/// Failures are returned as `anyhow::Error` wrapping an
/// [`ApiError`](crate::error::ApiError) so callers can downcast and inspect
/// the status.
#[async_trait]
pub trait JournalApi: Send + Sync {
    /// `POST /auth/token` with form-encoded credentials.
    async fn login(&self, username: &str, password: &str) -> anyhow::Result<TokenResponse>;

    /// `POST /auth/register`.
    async fn register(&self, user: &UserCreate) -> anyhow::Result<User>;

    /// `GET /auth/me`.
    async fn current_user(&self) -> anyhow::Result<User>;

    /// `GET /classes`.
    async fn list_classes(&self) -> anyhow::Result<Vec<Class>>;

    /// `POST /classes`.
    async fn create_class(&self, class: &ClassCreate) -> anyhow::Result<Class>;

    /// `GET /classes-with-students`.
    async fn list_classes_with_students(&self) -> anyhow::Result<Vec<ClassWithStudents>>;

    /// `GET /students`.
    async fn list_students(&self) -> anyhow::Result<Vec<Student>>;

    /// `POST /students`.
    async fn create_student(&self, student: &StudentCreate) -> anyhow::Result<Student>;

    /// `DELETE /students/{id}`.
    async fn delete_student(&self, id: Id) -> anyhow::Result<MessageResponse>;

    /// `GET /subjects`.
    async fn list_subjects(&self) -> anyhow::Result<Vec<Subject>>;

    /// `POST /subjects`.
    async fn create_subject(&self, subject: &SubjectCreate) -> anyhow::Result<Subject>;

    /// `DELETE /subjects/{id}`.
    async fn delete_subject(&self, id: Id) -> anyhow::Result<MessageResponse>;

    /// `GET /entries`.
    async fn list_entries(&self) -> anyhow::Result<Vec<JournalEntry>>;

    /// `GET /entries/{id}`.
    async fn get_entry(&self, id: Id) -> anyhow::Result<JournalEntry>;

    /// `POST /entries`.
    async fn create_entry(&self, entry: &JournalEntryCreate) -> anyhow::Result<JournalEntry>;

    /// `PUT /entries/{id}`, replacing the whole entry.
    async fn update_entry(&self, id: Id, entry: &JournalEntryCreate)
        -> anyhow::Result<JournalEntry>;

    /// `DELETE /entries/{id}`.
    async fn delete_entry(&self, id: Id) -> anyhow::Result<MessageResponse>;
}

// ---------------------------------------------------------------------------
// Token storage
// ---------------------------------------------------------------------------

/// Key the bearer token is persisted under.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Persistence for the bearer token shared by the session and the HTTP client.
pub trait TokenStore: Send + Sync {
    /// The stored token, if any.
    fn get(&self) -> Option<String>;

    /// Replace the stored token.
    fn set(&self, token: &str) -> anyhow::Result<()>;

    /// Forget the stored token. Clearing an empty store is not an error.
    fn clear(&self) -> anyhow::Result<()>;
}

/// Token store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) -> anyhow::Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());
        store.set("abc").unwrap();
        assert_eq!(store.get().as_deref(), Some("abc"));
        store.clear().unwrap();
        assert!(store.get().is_none());
        store.clear().unwrap();
    }
}
