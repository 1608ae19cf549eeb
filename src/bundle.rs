//! Translation bundle: one locale's complete key -> string map plus metadata.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Ordered key -> translated string map. Ordering keeps serialization deterministic.
pub type Entries = BTreeMap<String, String>;

/// Fixed per-bundle overhead added to the entry footprint when sizing cache entries.
const METADATA_OVERHEAD_BYTES: usize = 128;

/// Complete translation map for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationBundle {
    /// Locale code the entries belong to (e.g. `"fr"`).
    pub locale: String,
    /// Key -> translated string.
    pub entries: Entries,
    /// Opaque version label.
    pub version: String,
    /// Unix time in milliseconds of the last successful acquisition.
    pub last_updated: i64,
    /// Version token for conditional fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Hex SHA-256 digest of `entries`.
    pub checksum: String,
}

impl TranslationBundle {
    /// What: Build a bundle stamped with the current time.
    ///
    /// Inputs:
    /// - `locale`: Locale code
    /// - `entries`: Key -> string map
    /// - `version`: Version label
    /// - `etag`: Optional version token from the server
    ///
    /// Output:
    /// - Bundle with a freshly computed checksum
    #[must_use]
    pub fn new(
        locale: impl Into<String>,
        entries: Entries,
        version: impl Into<String>,
        etag: Option<String>,
    ) -> Self {
        let checksum = checksum_entries(&entries);
        Self {
            locale: locale.into(),
            entries,
            version: version.into(),
            last_updated: now_millis(),
            etag,
            checksum,
        }
    }

    /// True when the stored checksum matches the entries.
    #[must_use]
    pub fn verify_checksum(&self) -> bool {
        checksum_entries(&self.entries) == self.checksum
    }

    /// What: Decide whether the bundle is older than `max_age`.
    ///
    /// Inputs:
    /// - `max_age`: Maximum acceptable age
    /// - `now_ms`: Current Unix time in milliseconds
    ///
    /// Output:
    /// - `true` when `now_ms - last_updated > max_age`
    #[must_use]
    pub fn is_stale(&self, max_age: Duration, now_ms: i64) -> bool {
        let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.last_updated) > max_age_ms
    }

    /// Estimated in-memory footprint in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        let entries: usize = self.entries.iter().map(|(k, v)| k.len() + v.len()).sum();
        entries
            + self.locale.len()
            + self.version.len()
            + self.checksum.len()
            + self.etag.as_ref().map_or(0, String::len)
            + METADATA_OVERHEAD_BYTES
    }

    /// Mark the bundle as freshly confirmed by the server.
    pub const fn touch(&mut self, now_ms: i64) {
        self.last_updated = now_ms;
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the bundle carries no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Direct entry lookup.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

/// What: Compute the deterministic digest of a bundle's entries.
///
/// Inputs:
/// - `entries`: Ordered entry map
///
/// Output:
/// - Lowercase hex SHA-256
///
/// Details:
/// - Keys and values are separated by NUL bytes so `("ab","c")` and `("a","bc")` differ.
#[must_use]
pub fn checksum_entries(entries: &Entries) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in entries {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Current Unix time in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
