//! Directory-backed storage: one file per key, atomic replace on write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::KeyValueStorage;
use crate::error::{BundleError, Result};

/// Extension of value files.
const VALUE_EXT: &str = "json";
/// Extension of in-progress writes.
const TMP_EXT: &str = "tmp";

/// Storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Directory holding one file per key.
    dir: PathBuf,
    /// Maximum total bytes of value files, unlimited when `None`.
    quota_bytes: Option<u64>,
}

impl FileStorage {
    /// What: Open (and create if needed) a storage directory.
    ///
    /// Inputs:
    /// - `dir`: Directory to hold value files
    /// - `quota_bytes`: Optional cap on the total size of stored values
    ///
    /// Output:
    /// - `FileStorage` rooted at `dir`
    ///
    /// # Errors
    /// - `Storage` if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>, quota_bytes: Option<u64>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(path = %dir.display(), ?quota_bytes, "opened file storage");
        Ok(Self { dir, quota_bytes })
    }

    /// Directory the storage lives in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the value file for `key`.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{VALUE_EXT}", encode_key(key)))
    }

    /// Total size of value files on disk.
    fn used_bytes(&self) -> Result<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == VALUE_EXT) {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

/// What: Make a storage key safe to use as a file name.
///
/// Details:
/// - ASCII alphanumerics, `-` and `_` pass through; every other byte becomes `%XX`.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Inverse of `encode_key`; `None` for names it could not have produced.
fn decode_key(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(quota) = self.quota_bytes {
            let existing = fs::metadata(&path).map_or(0, |m| m.len());
            let incoming = value.len() as u64;
            let projected = self.used_bytes()? - existing + incoming;
            if projected > quota {
                tracing::debug!(key, projected, quota, "file storage quota reached");
                return Err(BundleError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        let tmp = path.with_extension(TMP_EXT);
        let written = fs::write(&tmp, value).and_then(|()| fs::rename(&tmp, &path));
        match written {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                if e.kind() == ErrorKind::StorageFull {
                    Err(BundleError::QuotaExceeded {
                        key: key.to_string(),
                    })
                } else {
                    Err(e.into())
                }
            }
        }
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == VALUE_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Some(key) = decode_key(stem)
            {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
