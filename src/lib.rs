//! Library entry for lexicache: locale-aware translation bundle delivery and caching.
//!
//! The pipeline is `loader` -> `cache::persistent` (through `codec` and `storage`)
//! -> `cache::memory` -> `translator`, with the pure `locale` rule engines on the side.

pub mod bundle;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod loader;
pub mod locale;
pub mod storage;
pub mod transport;
pub mod translator;

pub use bundle::TranslationBundle;
pub use error::{BundleError, Result};
pub use loader::{LoadOutcome, LoadRequest, Loader};
pub use translator::Translator;
