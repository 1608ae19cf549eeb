//! Reversible transform between a bundle and its storage representation.
//!
//! Bundles are serialized to JSON first. Small payloads are stored raw; larger
//! ones are DEFLATE-compressed and base64-encoded, but the compressed form is
//! only kept when it beats 90% of the raw size.

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use serde::{Deserialize, Serialize};

use crate::bundle::TranslationBundle;
use crate::error::{BundleError, Result};

/// Storage schema version written into every record.
pub const SCHEMA_VERSION: u32 = 1;

/// Default serialized size below which compression is skipped.
pub const DEFAULT_MIN_COMPRESS_SIZE: usize = 1024;

/// Algorithm used for a record's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Raw JSON.
    None,
    /// DEFLATE (LZ77 family), base64-encoded.
    Lz,
}

/// Storage-ready representation of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedRecord {
    /// Raw JSON or base64 of the compressed JSON.
    pub payload: String,
    /// Whether `payload` is compressed.
    pub is_compressed: bool,
    /// Length in bytes of the serialized bundle.
    pub original_size: usize,
    /// Length in bytes of `payload`.
    pub compressed_size: usize,
    /// Algorithm used for `payload`.
    pub algorithm: Algorithm,
    /// Schema version of the record layout.
    pub schema_version: u32,
}

/// Compression codec with a configurable size threshold.
#[derive(Debug, Clone, Copy)]
pub struct CompressionCodec {
    /// Serialized size below which compression is not attempted.
    min_size: usize,
}

impl Default for CompressionCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COMPRESS_SIZE)
    }
}

impl CompressionCodec {
    /// Create a codec that skips compression for payloads shorter than `min_size`.
    #[must_use]
    pub const fn new(min_size: usize) -> Self {
        Self { min_size }
    }

    /// What: Turn a bundle into a storable record.
    ///
    /// Inputs:
    /// - `bundle`: Bundle to encode
    ///
    /// Output:
    /// - `CompressedRecord` holding either raw JSON or compressed payload
    ///
    /// # Errors
    /// - `Serialization` if the bundle cannot be serialized
    /// - `Storage` if the in-memory encoder fails
    ///
    /// Details:
    /// - Below the threshold the JSON is stored as-is with `algorithm = none`.
    /// - The compressed payload is kept only if `compressed_size < 0.9 * original_size`.
    pub fn compress(&self, bundle: &TranslationBundle) -> Result<CompressedRecord> {
        let json = serde_json::to_string(bundle)?;
        let original_size = json.len();

        if original_size < self.min_size {
            tracing::trace!(
                locale = %bundle.locale,
                original_size,
                min_size = self.min_size,
                "bundle below compression threshold"
            );
            return Ok(raw_record(json));
        }

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes())?;
        let compressed = encoder.finish()?;
        let payload = BASE64.encode(compressed);
        let compressed_size = payload.len();

        if compressed_size.saturating_mul(10) < original_size.saturating_mul(9) {
            tracing::debug!(
                locale = %bundle.locale,
                original_size,
                compressed_size,
                "bundle compressed"
            );
            Ok(CompressedRecord {
                payload,
                is_compressed: true,
                original_size,
                compressed_size,
                algorithm: Algorithm::Lz,
                schema_version: SCHEMA_VERSION,
            })
        } else {
            tracing::debug!(
                locale = %bundle.locale,
                original_size,
                compressed_size,
                "compression not worthwhile, storing raw"
            );
            Ok(raw_record(json))
        }
    }

    /// What: Restore a bundle from a record produced by `compress`.
    ///
    /// Inputs:
    /// - `record`: Stored record
    ///
    /// Output:
    /// - The original bundle
    ///
    /// # Errors
    /// - `Decompression` when the flag and algorithm disagree, base64 or inflate
    ///   fails, the inflated size differs from `original_size`, or the JSON is invalid
    ///
    /// Details:
    /// - Never returns partially decoded data.
    pub fn decompress(&self, record: &CompressedRecord) -> Result<TranslationBundle> {
        let json = match (record.algorithm, record.is_compressed) {
            (Algorithm::None, false) => record.payload.clone(),
            (Algorithm::Lz, true) => inflate(&record.payload)?,
            (algorithm, flag) => {
                return Err(BundleError::Decompression(format!(
                    "inconsistent record: algorithm {algorithm:?} with is_compressed={flag}"
                )));
            }
        };

        if json.len() != record.original_size {
            return Err(BundleError::Decompression(format!(
                "size mismatch: expected {} bytes, got {}",
                record.original_size,
                json.len()
            )));
        }

        serde_json::from_str(&json)
            .map_err(|e| BundleError::Decompression(format!("invalid bundle JSON: {e}")))
    }
}

/// Record that stores the serialized JSON without compression.
fn raw_record(json: String) -> CompressedRecord {
    let size = json.len();
    CompressedRecord {
        payload: json,
        is_compressed: false,
        original_size: size,
        compressed_size: size,
        algorithm: Algorithm::None,
        schema_version: SCHEMA_VERSION,
    }
}

/// Base64-decode and inflate a compressed payload back to JSON text.
fn inflate(payload: &str) -> Result<String> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| BundleError::Decompression(format!("invalid base64: {e}")))?;
    let mut decoder = DeflateDecoder::new(bytes.as_slice());
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .map_err(|e| BundleError::Decompression(format!("inflate failed: {e}")))?;
    Ok(json)
}
