//! Engine configuration loaded from `lexicache.yml`.
//!
//! ```yaml
//! base_url: https://translations.example.org/api
//! default_locale: en
//! fallback_locale: en
//! fallbacks:
//!   de-CH: de
//! memory:
//!   max_entries: 10
//!   max_bytes: 5242880
//! storage:
//!   quota_bytes: 10485760
//! loader:
//!   max_age_secs: 86400
//!   timeout_ms: 10000
//!   retry_count: 3
//!   base_delay_ms: 1000
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::memory::{DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES};
use crate::cache::persistent::DEFAULT_NAMESPACE;
use crate::codec::DEFAULT_MIN_COMPRESS_SIZE;
use crate::error::{BundleError, Result};
use crate::locale::{base_language, detect_system_locale, is_valid_locale_format};

/// Config file name searched in the config directories.
pub const CONFIG_FILE_NAME: &str = "lexicache.yml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Translation service root.
    pub base_url: String,
    /// Locale used when nothing else is requested.
    pub default_locale: String,
    /// Locale tried when the requested one cannot be acquired.
    pub fallback_locale: String,
    /// Per-locale fallback overrides.
    pub fallbacks: HashMap<String, String>,
    /// Directory for persisted bundles; XDG cache dir when unset.
    pub cache_dir: Option<PathBuf>,
    /// Memory tier limits.
    pub memory: MemoryConfig,
    /// Persistent tier settings.
    pub storage: StorageConfig,
    /// Codec settings.
    pub compression: CompressionConfig,
    /// Loader timing.
    pub loader: LoaderConfig,
    /// File this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Fields whose absence changes how the file is applied.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExplicitFields {
    /// `default_locale` as written in the file.
    default_locale: Option<String>,
}

/// Memory tier limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum cached locales.
    pub max_entries: usize,
    /// Maximum cumulative bytes.
    pub max_bytes: usize,
}

/// Persistent tier settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Byte quota for stored records; unlimited when unset.
    pub quota_bytes: Option<u64>,
    /// Key prefix of persisted records.
    pub namespace: String,
}

/// Codec settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Serialized size below which bundles are stored raw.
    pub min_size: usize,
}

/// Loader timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Age after which a cached bundle is refreshed.
    pub max_age_secs: u64,
    /// Per-attempt network timeout.
    pub timeout_ms: u64,
    /// Retries after the first failed attempt.
    pub retry_count: u32,
    /// Delay unit; attempt `n` waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
    /// Upper bound of random jitter added to each retry delay.
    pub jitter_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            default_locale: "en".to_string(),
            fallback_locale: "en".to_string(),
            fallbacks: HashMap::new(),
            cache_dir: None,
            memory: MemoryConfig::default(),
            storage: StorageConfig::default(),
            compression: CompressionConfig::default(),
            loader: LoaderConfig::default(),
            source: None,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_bytes: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_COMPRESS_SIZE,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 24 * 60 * 60,
            timeout_ms: 10_000,
            retry_count: 3,
            base_delay_ms: 1_000,
            jitter_ms: 0,
        }
    }
}

impl LoaderConfig {
    /// Staleness threshold.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay unit between retries.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl EngineConfig {
    /// What: Parse configuration from YAML text.
    ///
    /// # Errors
    /// - `Config` when the YAML is malformed or has wrongly typed fields
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_norway::from_str(yaml).map_err(|e| BundleError::Config(e.to_string()))
    }

    /// What: Load configuration from an explicit path or the standard locations.
    ///
    /// Inputs:
    /// - `explicit`: Path given on the command line, if any
    ///
    /// Output:
    /// - Parsed configuration, or defaults when no file exists
    ///
    /// Details:
    /// - When the file does not set `default_locale`, the system locale is used.
    /// - Runs before logging is set up, so it does not log; `source` records the file read.
    ///
    /// # Errors
    /// - `Config` when an explicit path is missing or any found file fails to parse
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.is_file() => {
                return Err(BundleError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => resolve_config_path(),
        };

        let Some(path) = path else {
            return Ok(Self::default().with_system_locale(detect_system_locale()));
        };

        let contents = fs::read_to_string(&path)
            .map_err(|e| BundleError::Config(format!("failed to read {}: {e}", path.display())))?;
        let in_file = |e: BundleError| match e {
            BundleError::Config(msg) => BundleError::Config(format!("{}: {msg}", path.display())),
            other => other,
        };
        let mut config = Self::from_yaml(&contents).map_err(in_file)?;
        let explicit_fields: ExplicitFields = serde_norway::from_str(&contents)
            .map_err(|e| in_file(BundleError::Config(e.to_string())))?;
        if explicit_fields.default_locale.is_none() {
            config = config.with_system_locale(detect_system_locale());
        }
        config.source = Some(path);
        Ok(config)
    }

    /// What: Use `detected` as the default locale when it is a valid locale code.
    ///
    /// Inputs:
    /// - `detected`: System locale, e.g. from `detect_system_locale`
    #[must_use]
    pub fn with_system_locale(mut self, detected: Option<String>) -> Self {
        if let Some(locale) = detected.filter(|l| is_valid_locale_format(l)) {
            self.default_locale = locale;
        }
        self
    }

    /// What: Resolve the fallback locale for `locale`.
    ///
    /// Output:
    /// - Explicit override for the full code, then for the base language, then `fallback_locale`
    #[must_use]
    pub fn fallback_for(&self, locale: &str) -> String {
        self.fallbacks
            .get(locale)
            .or_else(|| self.fallbacks.get(&base_language(locale)))
            .cloned()
            .unwrap_or_else(|| self.fallback_locale.clone())
    }

    /// Directory for persisted bundles.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| xdg_base_dir("XDG_CACHE_HOME", &[".cache"]).join("lexicache"))
    }

    /// Directory for persisted bundle records.
    #[must_use]
    pub fn bundles_dir(&self) -> PathBuf {
        self.cache_dir().join("bundles")
    }

    /// Directory for log files.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.cache_dir().join("logs")
    }
}

/// First existing config file in `$XDG_CONFIG_HOME/lexicache/` or `$HOME/.config/lexicache/`.
fn resolve_config_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME")
        && !xdg.trim().is_empty()
    {
        candidates.push(Path::new(&xdg).join("lexicache").join(CONFIG_FILE_NAME));
    }
    if let Ok(home) = env::var("HOME") {
        candidates.push(
            Path::new(&home)
                .join(".config")
                .join("lexicache")
                .join(CONFIG_FILE_NAME),
        );
    }
    candidates.into_iter().find(|p| p.is_file())
}

/// What: Resolve an XDG base directory from environment or default to `$HOME` + segments.
///
/// Inputs:
/// - `var`: Environment variable to check (e.g., `XDG_CACHE_HOME`)
/// - `home_default`: Fallback path segments relative to `$HOME` if `var` is unset/empty
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    home_default
        .iter()
        .fold(PathBuf::from(home), |base, seg| base.join(seg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.memory.max_entries, 10);
        assert_eq!(config.memory.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.loader.max_age(), Duration::from_secs(86_400));
        assert_eq!(config.loader.retry_count, 3);
        assert_eq!(config.compression.min_size, 1024);
        assert_eq!(config.storage.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r"
base_url: https://t.example.org/api
fallbacks:
  de-CH: de
  pt: es
loader:
  retry_count: 1
";
        let config = EngineConfig::from_yaml(yaml).expect("parse");
        assert_eq!(config.base_url, "https://t.example.org/api");
        assert_eq!(config.loader.retry_count, 1);
        assert_eq!(config.loader.timeout_ms, 10_000);
        assert_eq!(config.memory.max_entries, 10);
        assert_eq!(config.fallback_for("de-CH"), "de");
        assert_eq!(config.fallback_for("pt-BR"), "es");
        assert_eq!(config.fallback_for("fr"), "en");
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = EngineConfig::from_yaml("loader: [1, 2").expect_err("invalid");
        assert!(matches!(err, BundleError::Config(_)));
        let err = EngineConfig::from_yaml("memory:\n  max_entries: lots").expect_err("wrong type");
        assert!(matches!(err, BundleError::Config(_)));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory for test");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "default_locale: ru\ncache_dir: /tmp/lexi\n").expect("write config");
        let config = EngineConfig::load(Some(&path)).expect("load");
        assert_eq!(config.default_locale, "ru");
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/lexi"));
        assert_eq!(config.logs_dir(), PathBuf::from("/tmp/lexi/logs"));
        assert_eq!(config.bundles_dir(), PathBuf::from("/tmp/lexi/bundles"));
    }

    #[test]
    fn parse_error_names_the_file_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory for test");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "loader: [1, 2").expect("write config");
        let err = EngineConfig::load(Some(&path)).expect_err("invalid");
        let message = err.to_string();
        assert!(message.contains(&path.display().to_string()));
        assert_eq!(message.matches("configuration error").count(), 1);
    }

    #[test]
    fn system_locale_fills_only_a_missing_default() {
        let config = EngineConfig::default().with_system_locale(Some("de-DE".to_string()));
        assert_eq!(config.default_locale, "de-DE");
        let config = EngineConfig::default().with_system_locale(Some("not a locale!".to_string()));
        assert_eq!(config.default_locale, "en");
        let config = EngineConfig::default().with_system_locale(None);
        assert_eq!(config.default_locale, "en");

        let temp_dir = TempDir::new().expect("Failed to create temp directory for test");
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "default_locale: ru\n").expect("write config");
        let config = EngineConfig::load(Some(&path)).expect("load");
        assert_eq!(config.default_locale, "ru");
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory for test");
        let err = EngineConfig::load(Some(&temp_dir.path().join("nope.yml"))).expect_err("missing");
        assert!(matches!(err, BundleError::Config(_)));
    }
}
