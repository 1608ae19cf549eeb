//! Durable string key-value storage primitive.
//!
//! The persistent bundle store is written against `KeyValueStorage` so it can run on
//! a directory of files in production and on an in-memory map in tests.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;

/// Minimal platform storage: get/set/remove/clear over string keys.
pub trait KeyValueStorage: Send + Sync + std::fmt::Debug {
    /// Read a value, `Ok(None)` when the key is absent.
    ///
    /// # Errors
    /// - Backend read failures
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// - `QuotaExceeded` when the backend is full
    /// - Other backend write failures
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting a missing key is not an error.
    ///
    /// # Errors
    /// - Backend delete failures
    fn remove(&self, key: &str) -> Result<()>;

    /// List every stored key.
    ///
    /// # Errors
    /// - Backend listing failures
    fn keys(&self) -> Result<Vec<String>>;

    /// Delete every key.
    ///
    /// # Errors
    /// - Backend delete failures
    fn clear(&self) -> Result<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}
