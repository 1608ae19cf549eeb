//! Durable, quota-aware bundle store: one compressed record per locale.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bundle::{TranslationBundle, now_millis};
use crate::codec::{CompressedRecord, CompressionCodec, SCHEMA_VERSION};
use crate::error::{BundleError, Result};
use crate::storage::KeyValueStorage;

/// Default key prefix for persisted bundles.
pub const DEFAULT_NAMESPACE: &str = "lexicache_translations_";

/// Share of the persisted footprint `cleanup` tries to reclaim, as numerator over 4.
const CLEANUP_RECLAIM_QUARTERS: usize = 1;

/// Record layout written to storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    /// Locale the record belongs to.
    locale: String,
    /// Unix milliseconds of the write.
    saved_at: i64,
    /// Codec output.
    #[serde(flatten)]
    record: CompressedRecord,
}

/// Footprint summary of the persisted tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of persisted locales.
    pub entries: usize,
    /// Bytes occupied by the serialized records.
    pub total_bytes: usize,
    /// Records stored with compression.
    pub compressed_entries: usize,
    /// Sum of uncompressed bundle sizes.
    pub original_bytes: usize,
}

/// Bundle store over a `KeyValueStorage`.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    /// Backend.
    storage: Arc<dyn KeyValueStorage>,
    /// Codec applied on save/load.
    codec: CompressionCodec,
    /// Prefix for every key this store owns.
    namespace: String,
}

impl PersistentStore {
    /// What: Create a store over `storage`.
    ///
    /// Inputs:
    /// - `storage`: Key-value backend
    /// - `codec`: Codec used for records
    /// - `namespace`: Key prefix isolating this store's records
    #[must_use]
    pub fn new(
        storage: Arc<dyn KeyValueStorage>,
        codec: CompressionCodec,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            codec,
            namespace: namespace.into(),
        }
    }

    /// Storage key for `locale`.
    fn key_for(&self, locale: &str) -> String {
        format!("{}{locale}", self.namespace)
    }

    /// What: Persist a bundle.
    ///
    /// Inputs:
    /// - `locale`: Locale the bundle is stored under
    /// - `bundle`: Bundle to write
    ///
    /// # Errors
    /// - `QuotaExceeded` when storage is still full after one cleanup-and-retry cycle
    /// - Codec or backend errors
    ///
    /// Details:
    /// - On a quota error, runs `cleanup()` and retries exactly once.
    pub fn save(&self, locale: &str, bundle: &TranslationBundle) -> Result<()> {
        let stored = StoredRecord {
            locale: locale.to_string(),
            saved_at: now_millis(),
            record: self.codec.compress(bundle)?,
        };
        let value = serde_json::to_string(&stored)?;
        let key = self.key_for(locale);

        match self.storage.set(&key, &value) {
            Ok(()) => {}
            Err(BundleError::QuotaExceeded { .. }) => {
                tracing::warn!(locale, bytes = value.len(), "storage quota hit, cleaning up");
                let freed = self.cleanup()?;
                tracing::debug!(locale, freed, "retrying save after cleanup");
                self.storage.set(&key, &value)?;
            }
            Err(e) => return Err(e),
        }

        tracing::debug!(
            locale,
            entries = bundle.len(),
            original_size = stored.record.original_size,
            stored_size = stored.record.compressed_size,
            compressed = stored.record.is_compressed,
            "persisted bundle"
        );
        Ok(())
    }

    /// What: Read and validate a persisted bundle.
    ///
    /// Inputs:
    /// - `locale`: Locale to load
    ///
    /// Output:
    /// - `Some(bundle)` for a valid record, `None` on a miss
    ///
    /// Details:
    /// - Unparsable, schema-mismatched, empty, checksum-failing or undecodable
    ///   records are removed and reported as a miss.
    /// - Backend read errors are logged and reported as a miss.
    #[must_use]
    pub fn load(&self, locale: &str) -> Option<TranslationBundle> {
        let key = self.key_for(locale);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(locale, error = %e, "failed to read persisted bundle");
                return None;
            }
        };

        match self.decode(locale, &raw) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                tracing::warn!(locale, error = %e, "discarding corrupt persisted bundle");
                if let Err(e) = self.storage.remove(&key) {
                    tracing::warn!(locale, error = %e, "failed to remove corrupt record");
                }
                None
            }
        }
    }

    /// Parse and validate a raw stored record.
    fn decode(&self, locale: &str, raw: &str) -> Result<TranslationBundle> {
        let stored: StoredRecord = serde_json::from_str(raw).map_err(|e| BundleError::Integrity {
            locale: locale.to_string(),
            reason: format!("unparsable record: {e}"),
        })?;
        let integrity = |reason: String| BundleError::Integrity {
            locale: locale.to_string(),
            reason,
        };
        if stored.record.schema_version != SCHEMA_VERSION {
            return Err(integrity(format!(
                "schema version {} != {SCHEMA_VERSION}",
                stored.record.schema_version
            )));
        }
        if stored.locale != locale {
            return Err(integrity(format!("record belongs to '{}'", stored.locale)));
        }
        let bundle = self.codec.decompress(&stored.record)?;
        if bundle.is_empty() {
            return Err(integrity("bundle has no entries".to_string()));
        }
        if !bundle.verify_checksum() {
            return Err(integrity("checksum mismatch".to_string()));
        }
        Ok(bundle)
    }

    /// What: Delete a persisted locale.
    ///
    /// # Errors
    /// - Backend delete failures
    pub fn remove(&self, locale: &str) -> Result<()> {
        self.storage.remove(&self.key_for(locale))
    }

    /// What: Free space by dropping the oldest records.
    ///
    /// Output:
    /// - Bytes reclaimed
    ///
    /// # Errors
    /// - Backend listing or delete failures
    ///
    /// Details:
    /// - Records are ordered by `saved_at` ascending; unreadable records sort first.
    /// - Deletes until at least a quarter of the namespaced footprint is reclaimed
    ///   or nothing is left.
    pub fn cleanup(&self) -> Result<usize> {
        let mut records: Vec<(String, i64, usize)> = Vec::new();
        for key in self.namespaced_keys()? {
            let Some(raw) = self.storage.get(&key)? else {
                continue;
            };
            let saved_at = serde_json::from_str::<StoredRecord>(&raw)
                .map_or(i64::MIN, |r| r.saved_at);
            records.push((key, saved_at, raw.len()));
        }
        records.sort_by_key(|(_, saved_at, _)| *saved_at);

        let total: usize = records.iter().map(|(_, _, size)| size).sum();
        let target = (total * CLEANUP_RECLAIM_QUARTERS).div_ceil(4);
        let mut freed = 0;
        let mut removed = 0;
        for (key, _, size) in records {
            if freed >= target && removed > 0 {
                break;
            }
            self.storage.remove(&key)?;
            freed += size;
            removed += 1;
        }
        tracing::info!(removed, freed, total, "persistent store cleanup finished");
        Ok(freed)
    }

    /// What: Remove every record in this store's namespace.
    ///
    /// # Errors
    /// - Backend listing or delete failures
    pub fn clear(&self) -> Result<()> {
        let keys = self.namespaced_keys()?;
        let count = keys.len();
        for key in keys {
            self.storage.remove(&key)?;
        }
        tracing::info!(count, "cleared persisted bundles");
        Ok(())
    }

    /// What: List persisted locale codes.
    ///
    /// # Errors
    /// - Backend listing failures
    pub fn locales(&self) -> Result<Vec<String>> {
        let mut locales: Vec<String> = self
            .namespaced_keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.namespace).map(str::to_string))
            .collect();
        locales.sort();
        Ok(locales)
    }

    /// What: Summarise the persisted footprint.
    ///
    /// # Errors
    /// - Backend listing or read failures
    pub fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();
        for key in self.namespaced_keys()? {
            let Some(raw) = self.storage.get(&key)? else {
                continue;
            };
            stats.entries += 1;
            stats.total_bytes += raw.len();
            if let Ok(stored) = serde_json::from_str::<StoredRecord>(&raw) {
                stats.original_bytes += stored.record.original_size;
                if stored.record.is_compressed {
                    stats.compressed_entries += 1;
                }
            }
        }
        Ok(stats)
    }

    /// Keys owned by this store.
    fn namespaced_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .storage
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.namespace))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Entries;
    use crate::storage::MemoryStorage;

    fn bundle(locale: &str, n: usize) -> TranslationBundle {
        let mut entries = Entries::new();
        for i in 0..n {
            entries.insert(format!("key.{i}"), format!("{locale} value {i}"));
        }
        TranslationBundle::new(locale, entries, "1", None)
    }

    fn store_over(storage: Arc<MemoryStorage>) -> PersistentStore {
        PersistentStore::new(storage, CompressionCodec::default(), DEFAULT_NAMESPACE)
    }

    #[test]
    fn save_then_load_round_trips() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(storage);
        let original = bundle("fr", 300);
        store.save("fr", &original).expect("save");
        let loaded = store.load("fr").expect("hit");
        assert_eq!(loaded.entries, original.entries);
        assert_eq!(store.locales().expect("locales"), vec!["fr".to_string()]);
        let stats = store.stats().expect("stats");
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.compressed_entries, 1);
        assert!(stats.total_bytes < stats.original_bytes);
    }

    #[test]
    fn unparsable_record_is_a_miss_and_removed() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(Arc::clone(&storage));
        storage
            .set(&format!("{DEFAULT_NAMESPACE}de"), "not json")
            .expect("seed");
        assert!(store.load("de").is_none());
        assert_eq!(
            storage.get(&format!("{DEFAULT_NAMESPACE}de")).expect("get"),
            None
        );
    }

    #[test]
    fn checksum_mismatch_is_a_miss_and_removed() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(Arc::clone(&storage));
        let mut tampered = bundle("es", 3);
        tampered.checksum = "0".repeat(64);
        store.save("es", &tampered).expect("save");
        assert!(store.load("es").is_none());
        assert!(store.locales().expect("locales").is_empty());
    }

    #[test]
    fn undecodable_payload_is_a_miss_and_removed() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(Arc::clone(&storage));
        store.save("nl", &bundle("nl", 300)).expect("save");
        let key = format!("{DEFAULT_NAMESPACE}nl");
        let raw = storage.get(&key).expect("get").expect("present");
        let mut value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["isCompressed"], serde_json::json!(true));
        value["payload"] = serde_json::json!("%%% not base64 %%%");
        storage.set(&key, &value.to_string()).expect("reseed");

        assert!(store.load("nl").is_none());
        assert_eq!(storage.get(&key).expect("get"), None);
    }

    #[test]
    fn schema_mismatch_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(Arc::clone(&storage));
        store.save("it", &bundle("it", 3)).expect("save");
        let key = format!("{DEFAULT_NAMESPACE}it");
        let raw = storage.get(&key).expect("get").expect("present");
        let mut value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        value["schemaVersion"] = serde_json::json!(SCHEMA_VERSION + 1);
        storage.set(&key, &value.to_string()).expect("reseed");
        assert!(store.load("it").is_none());
        assert_eq!(storage.get(&key).expect("get"), None);
    }

    #[test]
    fn empty_bundle_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(storage);
        store
            .save("pl", &TranslationBundle::new("pl", Entries::new(), "1", None))
            .expect("save");
        assert!(store.load("pl").is_none());
    }

    #[test]
    fn cleanup_removes_oldest_quarter() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(Arc::clone(&storage));
        for (i, locale) in ["a", "b", "c", "d"].iter().enumerate() {
            let stored = StoredRecord {
                locale: (*locale).to_string(),
                saved_at: i64::try_from(i).expect("small"),
                record: CompressionCodec::default()
                    .compress(&bundle(locale, 2))
                    .expect("compress"),
            };
            storage
                .set(
                    &format!("{DEFAULT_NAMESPACE}{locale}"),
                    &serde_json::to_string(&stored).expect("json"),
                )
                .expect("seed");
        }
        storage.set("unrelated", "keep me").expect("seed");

        let freed = store.cleanup().expect("cleanup");
        assert!(freed > 0);
        let locales = store.locales().expect("locales");
        assert!(!locales.contains(&"a".to_string()));
        assert!(locales.contains(&"d".to_string()));
        assert_eq!(
            storage.get("unrelated").expect("get"),
            Some("keep me".to_string())
        );
    }

    #[test]
    fn quota_error_triggers_cleanup_and_single_retry() {
        let one = serde_json::to_string(&StoredRecord {
            locale: "aa".into(),
            saved_at: 0,
            record: CompressionCodec::default()
                .compress(&bundle("aa", 2))
                .expect("compress"),
        })
        .expect("json")
        .len();
        // Room for roughly two records.
        let storage = Arc::new(MemoryStorage::with_quota(one * 2 + 80));
        let store = store_over(Arc::clone(&storage));
        store.save("aa", &bundle("aa", 2)).expect("first");
        store.save("bb", &bundle("bb", 2)).expect("second");
        store.save("cc", &bundle("cc", 2)).expect("third succeeds after cleanup");
        let locales = store.locales().expect("locales");
        assert!(locales.contains(&"cc".to_string()));
        assert!(locales.len() <= 2);
    }

    #[test]
    fn quota_error_propagates_when_retry_fails() {
        let storage = Arc::new(MemoryStorage::with_quota(16));
        let store = store_over(storage);
        let err = store.save("en", &bundle("en", 5)).expect_err("cannot fit");
        assert!(matches!(err, BundleError::QuotaExceeded { .. }));
    }

    #[test]
    fn clear_only_touches_namespace() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_over(Arc::clone(&storage));
        store.save("en", &bundle("en", 2)).expect("save");
        storage.set("other", "x").expect("seed");
        store.clear().expect("clear");
        assert!(store.locales().expect("locales").is_empty());
        assert_eq!(storage.get("other").expect("get"), Some("x".to_string()));
    }
}
