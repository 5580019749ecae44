// In-memory session storage, used by tests and ephemeral sessions

use std::collections::HashMap;
use std::sync::Mutex;

use super::{StorageBackend, StoreError};

/// Key-value store that lives and dies with the process
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut map = self.entries.lock().unwrap();
        for (key, value) in entries {
            map.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut map = self.entries.lock().unwrap();
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}
