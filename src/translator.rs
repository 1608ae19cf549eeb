//! Lookup façade: active locale, key resolution, plural forms and text direction.
//!
//! Lookups never fail. A key resolves against the active bundle, then the
//! fallback-locale bundle, then the built-in bundle, then the caller's fallback
//! text, and finally the key itself.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use lru::LruCache;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::bundle::TranslationBundle;
use crate::cache::Priority;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::loader::{LoadOutcome, LoadRequest, Loader, builtin_bundle};
use crate::locale::{Direction, PluralCategory, category_for, is_rtl, plural_key};

/// Number of distinct missing keys remembered for log de-duplication.
const MISSING_KEY_CAPACITY: usize = 1024;

/// Placeholder replaced by the count in plural templates.
const COUNT_PLACEHOLDER: &str = "{{count}}";

/// Bundles backing lookups for the active locale.
#[derive(Debug, Clone)]
struct ActiveState {
    /// Active locale code.
    locale: String,
    /// Bundle served for the active locale (may itself be a fallback).
    bundle: Arc<TranslationBundle>,
    /// Fallback-locale bundle, when the fallback differs from the active locale.
    fallback: Option<Arc<TranslationBundle>>,
    /// Built-in safety net for the active locale.
    builtin: Arc<TranslationBundle>,
    /// Writing direction of the active locale.
    direction: Direction,
}

impl ActiveState {
    /// State before anything was loaded: built-ins only.
    fn initial(locale: &str) -> Self {
        let builtin = builtin_bundle(locale);
        Self {
            locale: locale.to_string(),
            bundle: Arc::clone(&builtin),
            fallback: None,
            builtin,
            direction: direction_of(locale),
        }
    }

    /// Bundles in resolution order: active, fallback, built-in.
    fn layers(&self) -> impl Iterator<Item = &TranslationBundle> {
        std::iter::once(self.bundle.as_ref())
            .chain(self.fallback.as_deref())
            .chain(std::iter::once(self.builtin.as_ref()))
    }

    /// First bundle in resolution order that has `key`.
    fn lookup(&self, key: &str) -> Option<&str> {
        self.lookup_any(&[key])
    }

    /// First of `keys` found, trying every key in one bundle before the next bundle.
    fn lookup_any(&self, keys: &[&str]) -> Option<&str> {
        self.layers()
            .find_map(|bundle| keys.iter().find_map(|key| bundle.get(key)))
    }
}

/// Static direction of a locale.
fn direction_of(locale: &str) -> Direction {
    if is_rtl(locale) {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

/// Translation lookup service for one active locale.
#[derive(Debug)]
pub struct Translator {
    /// Bundle acquisition.
    loader: Loader,
    /// Fallback and default-locale settings.
    config: EngineConfig,
    /// Active locale and its bundles.
    state: RwLock<ActiveState>,
    /// `(locale, key)` pairs already reported missing.
    missing: Mutex<LruCache<String, ()>>,
    /// Locale change notifications.
    locale_tx: watch::Sender<String>,
}

impl Translator {
    /// What: Create a translator on `config.default_locale`.
    ///
    /// Inputs:
    /// - `loader`: Bundle loader
    /// - `config`: Engine configuration
    ///
    /// Details:
    /// - Until `change_locale` or `initialize` completes, lookups resolve against
    ///   the built-in bundle only.
    #[must_use]
    pub fn new(loader: Loader, config: EngineConfig) -> Self {
        let locale = config.default_locale.clone();
        let capacity = NonZeroUsize::new(MISSING_KEY_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        let (locale_tx, _) = watch::channel(locale.clone());
        Self {
            loader,
            state: RwLock::new(ActiveState::initial(&locale)),
            config,
            missing: Mutex::new(LruCache::new(capacity)),
            locale_tx,
        }
    }

    /// Load the configured default locale.
    pub async fn initialize(&self) -> LoadOutcome {
        let locale = self.config.default_locale.clone();
        self.change_locale(&locale).await
    }

    /// Read the active state, recovering from a poisoned lock.
    fn read(&self) -> RwLockReadGuard<'_, ActiveState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Replace the active state, recovering from a poisoned lock.
    fn replace(&self, next: ActiveState) {
        match self.state.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Lock the missing-key set, recovering from a poisoned mutex.
    fn missing(&self) -> MutexGuard<'_, LruCache<String, ()>> {
        match self.missing.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Loader backing this translator.
    #[must_use]
    pub const fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Active locale code.
    #[must_use]
    pub fn locale(&self) -> String {
        self.read().locale.clone()
    }

    /// Bundle currently served for the active locale.
    #[must_use]
    pub fn bundle(&self) -> Arc<TranslationBundle> {
        Arc::clone(&self.read().bundle)
    }

    /// Writing direction of the active locale.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.read().direction
    }

    /// Receiver notified with the new locale code after each locale change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.locale_tx.subscribe()
    }

    /// What: Switch the active locale.
    ///
    /// Inputs:
    /// - `locale`: Locale to activate
    ///
    /// Output:
    /// - Outcome of loading the locale; the switch happens even when a fallback was served
    ///
    /// Details:
    /// - The fallback locale is loaded at `Priority::Normal` so lookups can fall back to it.
    /// - Subscribers are notified only when the locale code actually changes.
    pub async fn change_locale(&self, locale: &str) -> LoadOutcome {
        let fallback_locale = self.config.fallback_for(locale);
        let outcome = self
            .loader
            .load(
                LoadRequest::new(locale)
                    .fallback(fallback_locale.as_str())
                    .priority(Priority::High),
            )
            .await;
        let fallback = self.load_fallback_bundle(locale, &fallback_locale).await;
        self.activate(locale, &outcome, fallback);
        outcome
    }

    /// What: Reload the active locale from the network, bypassing the cache check.
    ///
    /// Output:
    /// - Outcome of the forced load
    pub async fn refresh(&self) -> LoadOutcome {
        let locale = self.locale();
        let fallback_locale = self.config.fallback_for(&locale);
        let outcome = self
            .loader
            .load(
                LoadRequest::new(locale.as_str())
                    .fallback(fallback_locale.as_str())
                    .force_refresh(true)
                    .priority(Priority::High),
            )
            .await;
        let fallback = self.read().fallback.clone();
        self.activate(&locale, &outcome, fallback);
        outcome
    }

    /// Bundle for the fallback locale, unless it is the active locale itself.
    async fn load_fallback_bundle(
        &self,
        locale: &str,
        fallback_locale: &str,
    ) -> Option<Arc<TranslationBundle>> {
        if fallback_locale.is_empty() || fallback_locale == locale {
            return None;
        }
        let outcome = self
            .loader
            .load(LoadRequest::new(fallback_locale).priority(Priority::Normal))
            .await;
        Some(outcome.bundle)
    }

    /// Install a load outcome as the active state and notify subscribers.
    fn activate(
        &self,
        locale: &str,
        outcome: &LoadOutcome,
        fallback: Option<Arc<TranslationBundle>>,
    ) {
        self.replace(ActiveState {
            locale: locale.to_string(),
            bundle: Arc::clone(&outcome.bundle),
            fallback,
            builtin: builtin_bundle(locale),
            direction: direction_of(locale),
        });
        let changed = self.locale_tx.send_if_modified(|current| {
            if current == locale {
                false
            } else {
                locale.clone_into(current);
                true
            }
        });
        info!(
            locale,
            served = %outcome.bundle.locale,
            entries = outcome.bundle.len(),
            used_fallback = outcome.used_fallback,
            changed,
            "locale activated"
        );
    }

    /// `get(key, None)`.
    #[must_use]
    pub fn t(&self, key: &str) -> String {
        self.get(key, None)
    }

    /// What: Resolve a key.
    ///
    /// Inputs:
    /// - `key`: Translation key
    /// - `fallback`: Text returned when no bundle has the key
    ///
    /// Output:
    /// - Translation, caller fallback, or the key itself
    #[must_use]
    pub fn get(&self, key: &str, fallback: Option<&str>) -> String {
        let state = self.read();
        if let Some(value) = state.lookup(key) {
            return value.to_string();
        }
        let locale = state.locale.clone();
        drop(state);
        self.report_missing(&locale, key);
        fallback.unwrap_or(key).to_string()
    }

    /// What: Resolve the plural form of `base_key` for `count`.
    ///
    /// Inputs:
    /// - `base_key`: Key without category suffix
    /// - `count`: Item count; replaces `{{count}}` in the template
    /// - `fallback`: Template used when no form exists
    ///
    /// Output:
    /// - Template for the active locale's category, then `other`, then the bare key,
    ///   then `fallback`, then `base_key`; with the count substituted
    ///
    /// Details:
    /// - All three forms are tried in the active bundle before the fallback and
    ///   built-in bundles are consulted.
    #[must_use]
    pub fn plural(&self, base_key: &str, count: u64, fallback: Option<&str>) -> String {
        let state = self.read();
        let category = category_for(&state.locale, count);
        let primary = plural_key(base_key, category);
        let other = (category != PluralCategory::Other)
            .then(|| plural_key(base_key, PluralCategory::Other));

        let keys: Vec<&str> = [Some(primary.as_str()), other.as_deref(), Some(base_key)]
            .into_iter()
            .flatten()
            .collect();
        let template = state.lookup_any(&keys).map(str::to_string);
        let locale = state.locale.clone();
        drop(state);

        let template = template.unwrap_or_else(|| {
            self.report_missing(&locale, &primary);
            fallback.unwrap_or(base_key).to_string()
        });
        template.replace(COUNT_PLACEHOLDER, &count.to_string())
    }

    /// Log a missing key once per locale.
    fn report_missing(&self, locale: &str, key: &str) {
        let first_time = self.missing().put(format!("{locale}\u{0}{key}"), ()).is_none();
        if first_time {
            debug!(locale, key, "missing translation key");
        }
    }

    /// What: Drop a locale from both cache tiers.
    ///
    /// # Errors
    /// - Storage errors while removing the persisted record
    pub fn deactivate_locale(&self, locale: &str) -> Result<()> {
        let cache = self.loader.cache();
        cache.remove(locale);
        if let Some(store) = cache.store() {
            store.remove(locale)?;
        }
        info!(locale, "locale deactivated");
        Ok(())
    }

    /// What: Clear memory and persistent tiers.
    ///
    /// Details:
    /// - The active state keeps its bundles, so lookups keep working until the next load.
    ///
    /// # Errors
    /// - Storage errors while clearing persisted records
    pub fn clear_cache(&self) -> Result<()> {
        let cache = self.loader.cache();
        cache.clear();
        if let Some(store) = cache.store() {
            store.clear()?;
        }
        info!("translation cache cleared");
        Ok(())
    }
}
