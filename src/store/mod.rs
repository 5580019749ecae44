// Session persistence layer
//
// A small key-value store holding the bearer session. Keys mirror the
// browser contract: access_token, refresh_token, user (JSON-encoded).

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::auth::types::{Principal, Session};

/// Key under which the short-lived bearer token is stored
pub const KEY_ACCESS_TOKEN: &str = "access_token";
/// Key under which the long-lived refresh token is stored
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
/// Key under which the authenticated user is stored, JSON-encoded
pub const KEY_USER: &str = "user";

/// Errors raised by the session store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value backend the session store writes through
///
/// `put_many` and `remove_many` must apply their entries as a group so a
/// session is never persisted half-written.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError>;
    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError>;

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.remove_many(&[key])
    }
}

/// Typed accessor over the raw key-value backend
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StorageBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Open a SQLite-backed store at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(SqliteBackend::open(path)?)))
    }

    /// Open a store that keeps everything in memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(KEY_REFRESH_TOKEN)
    }

    pub fn user(&self) -> Result<Option<Principal>, StoreError> {
        match self.backend.get(KEY_USER)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// The full session, or None unless both tokens are present
    pub fn session(&self) -> Result<Option<Session>, StoreError> {
        let access_token = match self.access_token()? {
            Some(token) => token,
            None => return Ok(None),
        };
        let refresh_token = match self.refresh_token()? {
            Some(token) => token,
            None => return Ok(None),
        };
        Ok(Some(Session {
            access_token,
            refresh_token,
            user: self.user()?,
        }))
    }

    /// Persist a freshly established session as a single group write
    pub fn store_session(&self, session: &Session) -> Result<(), StoreError> {
        let user_json = match &session.user {
            Some(user) => Some(serde_json::to_string(user)?),
            None => None,
        };
        let mut entries = vec![
            (KEY_ACCESS_TOKEN, session.access_token.as_str()),
            (KEY_REFRESH_TOKEN, session.refresh_token.as_str()),
        ];
        if let Some(json) = &user_json {
            entries.push((KEY_USER, json.as_str()));
        }
        self.backend.put_many(&entries)
    }

    /// Overwrite just the access token, as the refresh exchange does
    pub fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.backend.put(KEY_ACCESS_TOKEN, token)
    }

    /// Overwrite the cached user, as a profile update does
    pub fn set_user(&self, user: &Principal) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        self.backend.put(KEY_USER, &json)
    }

    /// Drop the whole session as a single group removal
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend
            .remove_many(&[KEY_ACCESS_TOKEN, KEY_REFRESH_TOKEN, KEY_USER])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> Principal {
        Principal {
            id: 7,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            display_name: Some("Alice".to_string()),
            bio: None,
            avatar_url: None,
            role: "author".to_string(),
        }
    }

    fn sample_session() -> Session {
        Session {
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            user: Some(sample_user()),
        }
    }

    #[test]
    fn test_store_and_read_session() {
        let store = SessionStore::in_memory();
        assert!(store.session().unwrap().is_none());

        store.store_session(&sample_session()).unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("A1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert_eq!(store.user().unwrap().unwrap().username, "alice");

        let session = store.session().unwrap().unwrap();
        assert_eq!(session.access_token, "A1");
        assert_eq!(session.refresh_token, "R1");
    }

    #[test]
    fn test_session_requires_both_tokens() {
        let store = SessionStore::in_memory();
        store.set_access_token("A1").unwrap();
        // Refresh token missing, so there is no usable session
        assert!(store.session().unwrap().is_none());
    }

    #[test]
    fn test_set_access_token_preserves_rest() {
        let store = SessionStore::in_memory();
        store.store_session(&sample_session()).unwrap();

        store.set_access_token("A2").unwrap();

        assert_eq!(store.access_token().unwrap().as_deref(), Some("A2"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("R1"));
        assert_eq!(store.user().unwrap().unwrap().username, "alice");
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let store = SessionStore::in_memory();
        store.store_session(&sample_session()).unwrap();

        store.clear().unwrap();

        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
        assert!(store.user().unwrap().is_none());
    }

    #[test]
    fn test_set_user_overwrites_cached_user() {
        let store = SessionStore::in_memory();
        store.store_session(&sample_session()).unwrap();

        let mut updated = sample_user();
        updated.display_name = Some("Alice Cooper".to_string());
        store.set_user(&updated).unwrap();

        let user = store.user().unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Alice Cooper"));
        assert_eq!(store.access_token().unwrap().as_deref(), Some("A1"));
    }
}
