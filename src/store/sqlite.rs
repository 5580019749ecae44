// SQLite-backed session storage

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;

use super::{StorageBackend, StoreError};

/// Key-value store persisted in a local SQLite database
///
/// Group writes run inside a transaction, so a crash mid-write never
/// leaves a partial session behind.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`, creating parent directories
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS session_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StorageBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT value FROM session_store WHERE key = ?1",
            [key],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO session_store (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM session_store WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_key_reads_as_none() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.get("access_token").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites_existing_value() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.put("access_token", "A1").unwrap();
        backend.put("access_token", "A2").unwrap();
        assert_eq!(backend.get("access_token").unwrap().as_deref(), Some("A2"));
    }

    #[test]
    fn test_group_write_and_remove() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .put_many(&[("access_token", "A1"), ("refresh_token", "R1")])
            .unwrap();
        assert_eq!(backend.get("access_token").unwrap().as_deref(), Some("A1"));
        assert_eq!(backend.get("refresh_token").unwrap().as_deref(), Some("R1"));

        backend
            .remove_many(&["access_token", "refresh_token", "user"])
            .unwrap();
        assert!(backend.get("access_token").unwrap().is_none());
        assert!(backend.get("refresh_token").unwrap().is_none());
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/session.db");
        let backend = SqliteBackend::open(&path).unwrap();
        backend.put("access_token", "A1").unwrap();
        drop(backend);

        // Reopen and confirm the value survived
        let backend = SqliteBackend::open(&path).unwrap();
        assert_eq!(backend.get("access_token").unwrap().as_deref(), Some("A1"));
    }

    proptest! {
        #[test]
        fn test_roundtrip_arbitrary_values(key in "[a-z_]{1,20}", value in ".{0,200}") {
            let backend = SqliteBackend::open_in_memory().unwrap();
            backend.put(&key, &value).unwrap();
            prop_assert_eq!(backend.get(&key).unwrap(), Some(value));
        }
    }
}
