//! Error taxonomy shared by every stage of the bundle pipeline.

use std::time::Duration;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Errors raised while acquiring, storing or decoding translation bundles.
///
/// Only the storage write path lets `QuotaExceeded` escape to its caller;
/// the loader absorbs everything else into its fallback chain.
#[derive(Error, Debug)]
pub enum BundleError {
    /// Transport failure (connection refused, DNS, malformed body, `success: false`).
    #[error("network error: {0}")]
    Network(String),
    /// The fetch did not complete before the configured timeout.
    #[error("fetching '{locale}' timed out after {after:?}")]
    Timeout {
        /// Locale being fetched.
        locale: String,
        /// Configured timeout.
        after: Duration,
    },
    /// Non-2xx response that is not a not-modified answer.
    #[error("unexpected HTTP status {status} for '{locale}'")]
    HttpStatus {
        /// Locale being fetched.
        locale: String,
        /// Response status code.
        status: u16,
    },
    /// A nominally successful response carried zero entries.
    #[error("no translations received for '{locale}'")]
    EmptyPayload {
        /// Locale being fetched.
        locale: String,
    },
    /// Persisted record failed schema or checksum validation.
    #[error("integrity check failed for '{locale}': {reason}")]
    Integrity {
        /// Locale of the record.
        locale: String,
        /// What did not match.
        reason: String,
    },
    /// Underlying storage refused the write for lack of space.
    #[error("storage quota exceeded while writing '{key}'")]
    QuotaExceeded {
        /// Storage key of the rejected write.
        key: String,
    },
    /// Payload could not be turned back into a bundle.
    #[error("decompression failed: {0}")]
    Decompression(String),
    /// Filesystem error from a storage backend.
    #[error("storage I/O error: {0}")]
    Storage(#[from] std::io::Error),
    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl BundleError {
    /// What: Tell whether another network attempt could plausibly succeed.
    ///
    /// Output:
    /// - `true` for network-family errors (transport, timeout, status, empty payload)
    ///
    /// Details:
    /// - Storage, codec and configuration errors are never retried by the loader.
    #[must_use]
    pub const fn is_recoverable_by_retry(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout { .. }
                | Self::HttpStatus { .. }
                | Self::EmptyPayload { .. }
        )
    }
}

impl From<reqwest::Error> for BundleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
