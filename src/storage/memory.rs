//! In-process storage backend with an optional byte quota.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::KeyValueStorage;
use crate::error::{BundleError, Result};

/// `HashMap`-backed storage. Quota counts key plus value bytes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Stored values.
    map: Mutex<HashMap<String, String>>,
    /// Maximum total bytes, unlimited when `None`.
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Unlimited in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory storage that rejects writes pushing usage above `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Total bytes currently used.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        usage(&self.lock())
    }

    /// Lock the map, recovering from a poisoned mutex.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        match self.map.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Sum of key and value lengths.
fn usage(map: &HashMap<String, String>) -> usize {
    map.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.lock();
        if let Some(quota) = self.quota_bytes {
            let replaced = map.get(key).map_or(0, |old| key.len() + old.len());
            let projected = usage(&map) - replaced + key.len() + value.len();
            if projected > quota {
                return Err(BundleError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        map.insert(key.to_string(), value.to_string());
        drop(map);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set("a", "1").expect("set");
        assert_eq!(storage.get("a").expect("get"), Some("1".to_string()));
        storage.remove("a").expect("remove");
        assert_eq!(storage.get("a").expect("get"), None);
        storage.remove("a").expect("removing a missing key is fine");
    }

    #[test]
    fn quota_rejects_oversized_write() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "12345").expect("fits");
        let err = storage.set("j", "123456").expect_err("over quota");
        assert!(matches!(err, BundleError::QuotaExceeded { .. }));
        // Replacing an existing value only counts the difference.
        storage.set("k", "123456789").expect("replacement fits");
        assert_eq!(storage.used_bytes(), 10);
    }
}
