//! Two-tier bundle cache: a bounded memory tier over a compressed persistent tier.

pub mod memory;
pub mod persistent;

pub use memory::{CacheEntry, MemoryCache, MemoryStats, Priority};
pub use persistent::{PersistentStore, StoreStats};
