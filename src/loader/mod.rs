//! Bundle acquisition: cache check, network with timeout and retries, fallback chain.
//!
//! Every load ends with a usable bundle. When the network and both cache tiers
//! fail, the built-in bundle for the locale is served.

pub mod builtin;
mod inflight;
mod state;

pub use builtin::{builtin_bundle, is_builtin};
pub use inflight::InFlightLoad;
pub use state::{LoadOutcome, LoadRequest, LoadStage};

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use rand::RngExt;
use tracing::{debug, info, warn};

use crate::bundle::{TranslationBundle, now_millis};
use crate::cache::{MemoryCache, PersistentStore, Priority};
use crate::codec::CompressionCodec;
use crate::config::{EngineConfig, LoaderConfig};
use crate::error::{BundleError, Result};
use crate::storage::FileStorage;
use crate::transport::{BundleTransport, FetchResponse, HttpTransport};
use inflight::{FinishGuard, InFlightLoads, WaiterGuard};

/// Bundle chosen by the state machine before it reaches `Done`.
struct Served {
    /// Bundle handed to the caller.
    bundle: Arc<TranslationBundle>,
    /// Anything other than fresh data for the requested locale.
    used_fallback: bool,
    /// No new body downloaded.
    from_cache: bool,
}

/// Result of one successful network attempt.
struct Fetched {
    /// New or revalidated bundle.
    bundle: Arc<TranslationBundle>,
    /// Server answered 304 and the cached copy was reused.
    not_modified: bool,
}

/// State carried across the stages of one load.
struct LoadRun<'a> {
    /// Loader driving the run.
    loader: &'a Loader,
    /// Request being served.
    request: &'a LoadRequest,
    /// Retries allowed after the first attempt.
    retries: u32,
    /// Per-attempt timeout.
    timeout: Duration,
    /// Copy of the requested locale found in either cache tier, fresh or stale.
    cached: Option<Arc<TranslationBundle>>,
    /// Bundle picked so far.
    served: Option<Served>,
}

impl<'a> LoadRun<'a> {
    /// Resolve per-call overrides and look up any cached copy.
    fn new(loader: &'a Loader, request: &'a LoadRequest) -> Self {
        let config = &loader.inner.config;
        Self {
            loader,
            request,
            retries: request.retry_count.unwrap_or(config.retry_count),
            timeout: request.timeout.unwrap_or_else(|| config.timeout()),
            cached: loader.inner.cache.get(&request.locale),
            served: None,
        }
    }

    /// Requested locale.
    fn locale(&self) -> &'a str {
        &self.request.locale
    }

    /// Record the bundle to hand out and move to `Done`.
    fn serve(
        &mut self,
        bundle: Arc<TranslationBundle>,
        used_fallback: bool,
        from_cache: bool,
    ) -> LoadStage {
        self.served = Some(Served {
            bundle,
            used_fallback,
            from_cache,
        });
        LoadStage::Done
    }

    /// Run one stage and return the next.
    async fn step(&mut self, stage: LoadStage) -> LoadStage {
        match stage {
            LoadStage::Idle if self.request.force_refresh => LoadStage::Fetching { attempt: 1 },
            LoadStage::Idle => LoadStage::CacheCheck,
            LoadStage::CacheCheck => self.cache_check(),
            LoadStage::Fetching { attempt } => self.fetch(attempt).await,
            LoadStage::Retrying { attempt, delay } => {
                tokio::time::sleep(delay).await;
                LoadStage::Fetching {
                    attempt: attempt + 1,
                }
            }
            LoadStage::StaleCopy => self.stale_copy(),
            LoadStage::FallbackLocale => self.fallback_locale().await,
            LoadStage::FallbackBuiltin => {
                warn!(locale = self.locale(), "serving built-in bundle");
                self.serve(builtin_bundle(self.locale()), true, false)
            }
            LoadStage::Done => LoadStage::Done,
        }
    }

    /// Serve a fresh cached copy, otherwise go to the network.
    fn cache_check(&mut self) -> LoadStage {
        let locale = self.locale();
        match self.cached.clone() {
            Some(bundle) if !self.loader.is_stale(&bundle) => {
                debug!(locale, "fresh cache hit");
                self.serve(bundle, false, true)
            }
            Some(_) => {
                debug!(locale, "cached bundle is stale, refreshing");
                LoadStage::Fetching { attempt: 1 }
            }
            None => LoadStage::Fetching { attempt: 1 },
        }
    }

    /// One network attempt; retry while allowed, then fall back.
    async fn fetch(&mut self, attempt: u32) -> LoadStage {
        let locale = self.locale();
        let result = self
            .loader
            .fetch_once(locale, self.cached.as_ref(), self.timeout)
            .await;
        match result {
            Ok(fetched) => {
                self.loader.remember(locale, &fetched.bundle, self.request.priority);
                info!(
                    locale,
                    attempt,
                    entries = fetched.bundle.len(),
                    not_modified = fetched.not_modified,
                    "bundle loaded"
                );
                self.serve(fetched.bundle, false, fetched.not_modified)
            }
            Err(err) if attempt <= self.retries && err.is_recoverable_by_retry() => {
                let delay = self.loader.backoff(attempt);
                warn!(
                    locale,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "fetch failed, retrying"
                );
                LoadStage::Retrying { attempt, delay }
            }
            Err(err) => {
                warn!(locale, attempt, error = %err, "fetch failed, falling back");
                LoadStage::StaleCopy
            }
        }
    }

    /// Serve a stale copy of the requested locale, if one exists.
    fn stale_copy(&mut self) -> LoadStage {
        match self.cached.clone() {
            Some(bundle) => {
                info!(locale = self.locale(), "serving stale cached copy");
                self.serve(bundle, true, true)
            }
            None => LoadStage::FallbackLocale,
        }
    }

    /// Serve the fallback locale, if it can be acquired.
    async fn fallback_locale(&mut self) -> LoadStage {
        let fallback = self
            .loader
            .load_fallback_locale(
                self.locale(),
                self.request.fallback_locale.as_deref(),
                self.timeout,
            )
            .await;
        match fallback {
            Some(served) => {
                self.served = Some(served);
                LoadStage::Done
            }
            None => LoadStage::FallbackBuiltin,
        }
    }

    /// Build the outcome; the built-in bundle stands in if nothing was served.
    fn finish(self, stages: Vec<LoadStage>) -> LoadOutcome {
        let locale = self.locale();
        let served = self.served.unwrap_or_else(|| Served {
            bundle: builtin_bundle(locale),
            used_fallback: true,
            from_cache: false,
        });
        LoadOutcome {
            bundle: served.bundle,
            used_fallback: served.used_fallback,
            from_cache: served.from_cache,
            stages,
        }
    }
}

/// Shared loader internals.
#[derive(Debug)]
struct LoaderInner {
    /// Memory tier, optionally backed by persistent storage.
    cache: Arc<MemoryCache>,
    /// Bundle source.
    transport: Arc<dyn BundleTransport>,
    /// Timing defaults.
    config: LoaderConfig,
    /// Running loads.
    in_flight: InFlightLoads,
}

/// Deduplicating bundle loader. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Loader {
    /// Shared state.
    inner: Arc<LoaderInner>,
}

impl Loader {
    /// What: Create a loader.
    ///
    /// Inputs:
    /// - `cache`: Memory tier (with its persistent tier, if any)
    /// - `transport`: Bundle source
    /// - `config`: Max age, timeout, retry and backoff defaults
    #[must_use]
    pub fn new(
        cache: Arc<MemoryCache>,
        transport: Arc<dyn BundleTransport>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                cache,
                transport,
                config,
                in_flight: InFlightLoads::default(),
            }),
        }
    }

    /// What: Assemble the production stack described by `config`.
    ///
    /// Inputs:
    /// - `config`: Engine configuration
    ///
    /// Output:
    /// - Loader over file storage in `config.bundles_dir()`, a memory tier and `HttpTransport`
    ///
    /// # Errors
    /// - `Storage` if the bundle directory cannot be created
    /// - `Network` if the HTTP client cannot be built
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let storage = FileStorage::open(config.bundles_dir(), config.storage.quota_bytes)?;
        let store = PersistentStore::new(
            Arc::new(storage),
            CompressionCodec::new(config.compression.min_size),
            config.storage.namespace.as_str(),
        );
        let cache = MemoryCache::new(
            config.memory.max_entries,
            config.memory.max_bytes,
            Some(store),
        );
        let transport = HttpTransport::new(&config.base_url, config.loader.timeout())?;
        Ok(Self::new(
            Arc::new(cache),
            Arc::new(transport),
            config.loader.clone(),
        ))
    }

    /// Memory tier used by this loader.
    #[must_use]
    pub fn cache(&self) -> &Arc<MemoryCache> {
        &self.inner.cache
    }

    /// Bundle source used by this loader.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn BundleTransport> {
        &self.inner.transport
    }

    /// Timing defaults.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Loads currently running.
    #[must_use]
    pub fn in_flight(&self) -> Vec<InFlightLoad> {
        self.inner.in_flight.snapshot()
    }

    /// True when `bundle` is older than the configured max age.
    #[must_use]
    pub fn is_stale(&self, bundle: &TranslationBundle) -> bool {
        bundle.is_stale(self.inner.config.max_age(), now_millis())
    }

    /// What: Acquire a bundle for a locale.
    ///
    /// Inputs:
    /// - `request`: Locale, fallback locale and per-call overrides
    ///
    /// Output:
    /// - A `LoadOutcome`; never an error
    ///
    /// Details:
    /// - A call for a locale that is already loading awaits the running load and
    ///   shares its outcome; the joining call's overrides are ignored.
    /// - The load runs on its own task, so it still caches its result and leaves
    ///   the in-flight registry when every caller has gone away.
    pub async fn load(&self, request: LoadRequest) -> LoadOutcome {
        let locale = request.locale.clone();
        let (shared, started) =
            self.inner
                .in_flight
                .join_or_start(&locale, request.priority, |id| {
                    let loader = self.clone();
                    let key = locale.clone();
                    let task = tokio::spawn(async move {
                        let _finish = FinishGuard::new(&loader.inner.in_flight, &key, id);
                        loader.run(request).await
                    });
                    let locale = locale.clone();
                    async move {
                        match task.await {
                            Ok(outcome) => outcome,
                            Err(join_err) => {
                                warn!(locale = %locale, error = %join_err, "load task failed");
                                LoadOutcome {
                                    bundle: builtin_bundle(&locale),
                                    used_fallback: true,
                                    from_cache: false,
                                    stages: vec![
                                        LoadStage::Idle,
                                        LoadStage::FallbackBuiltin,
                                        LoadStage::Done,
                                    ],
                                }
                            }
                        }
                    }
                    .boxed()
                });
        if !started {
            debug!(locale = %locale, "joining in-flight load");
        }

        let _waiter = WaiterGuard::new(&self.inner.in_flight, &locale);
        shared.await
    }

    /// What: Load several locales concurrently at `Priority::Normal`.
    ///
    /// Inputs:
    /// - `locales`: Locales to warm
    /// - `fallback_locale`: Fallback for each load
    ///
    /// Output:
    /// - One outcome per locale, in input order
    pub async fn preload(&self, locales: &[String], fallback_locale: &str) -> Vec<LoadOutcome> {
        let loads = locales.iter().map(|locale| {
            self.load(
                LoadRequest::new(locale.as_str())
                    .fallback(fallback_locale)
                    .priority(Priority::Normal),
            )
        });
        let outcomes = futures::future::join_all(loads).await;
        info!(
            count = outcomes.len(),
            fallbacks = outcomes.iter().filter(|o| o.used_fallback).count(),
            "preload complete"
        );
        outcomes
    }

    /// Drive the state machine for one request.
    async fn run(&self, request: LoadRequest) -> LoadOutcome {
        let mut run = LoadRun::new(self, &request);
        let mut stages = Vec::new();
        let mut stage = LoadStage::Idle;
        while stage != LoadStage::Done {
            stages.push(stage);
            stage = run.step(stage).await;
        }
        stages.push(LoadStage::Done);
        run.finish(stages)
    }

    /// What: One network attempt bounded by `timeout`.
    ///
    /// Details:
    /// - The request runs on its own task; on timeout the loader stops waiting and
    ///   the late response is discarded.
    /// - A 304 reuses the cached copy with a refreshed timestamp.
    async fn fetch_once(
        &self,
        locale: &str,
        cached: Option<&Arc<TranslationBundle>>,
        timeout: Duration,
    ) -> Result<Fetched> {
        let etag = cached.and_then(|bundle| bundle.etag.as_deref());
        let request = tokio::spawn(self.inner.transport.fetch(locale, etag));
        let response = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) => {
                return Err(BundleError::Network(format!("fetch task failed: {join_err}")));
            }
            Err(_) => {
                return Err(BundleError::Timeout {
                    locale: locale.to_string(),
                    after: timeout,
                });
            }
        };

        match response {
            FetchResponse::NotModified => {
                let Some(cached) = cached else {
                    return Err(BundleError::Network(format!(
                        "server answered 304 for {locale} without a cached copy"
                    )));
                };
                let mut refreshed = TranslationBundle::clone(cached);
                refreshed.touch(now_millis());
                Ok(Fetched {
                    bundle: Arc::new(refreshed),
                    not_modified: true,
                })
            }
            FetchResponse::Bundle { translations, .. } if translations.is_empty() => {
                Err(BundleError::EmptyPayload {
                    locale: locale.to_string(),
                })
            }
            FetchResponse::Bundle { translations, etag } => {
                let version = etag.as_deref().map_or_else(
                    || now_millis().to_string(),
                    |tag| tag.trim_matches('"').to_string(),
                );
                Ok(Fetched {
                    bundle: Arc::new(TranslationBundle::new(locale, translations, version, etag)),
                    not_modified: false,
                })
            }
        }
    }

    /// What: Serve the fallback locale from cache, or fetch it once.
    ///
    /// Output:
    /// - `None` when there is no usable fallback locale or it could not be acquired
    async fn load_fallback_locale(
        &self,
        locale: &str,
        fallback: Option<&str>,
        timeout: Duration,
    ) -> Option<Served> {
        let fallback = fallback.filter(|f| !f.is_empty() && *f != locale)?;

        if let Some(bundle) = self.inner.cache.get(fallback) {
            info!(locale, fallback, "serving cached fallback locale");
            return Some(Served {
                bundle,
                used_fallback: true,
                from_cache: true,
            });
        }

        match self.fetch_once(fallback, None, timeout).await {
            Ok(fetched) => {
                self.remember(fallback, &fetched.bundle, Priority::Normal);
                info!(locale, fallback, "serving fetched fallback locale");
                Some(Served {
                    bundle: fetched.bundle,
                    used_fallback: true,
                    from_cache: false,
                })
            }
            Err(err) => {
                warn!(locale, fallback, error = %err, "fallback locale unavailable");
                None
            }
        }
    }

    /// Cache a fetched bundle in memory and persist it; storage failures are logged only.
    fn remember(&self, locale: &str, bundle: &Arc<TranslationBundle>, priority: Priority) {
        self.inner.cache.set(locale, Arc::clone(bundle), priority);
        if let Some(store) = self.inner.cache.store()
            && let Err(err) = store.save(locale, bundle)
        {
            warn!(locale, error = %err, "failed to persist bundle");
        }
    }

    /// Delay after failed attempt `attempt`: `attempt * base_delay` plus optional jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.inner.config.base_delay().saturating_mul(attempt);
        let max_jitter = self.inner.config.jitter_ms;
        if max_jitter == 0 {
            return base;
        }
        let jitter_ms = rand::rng().random_range(0..=max_jitter);
        base + Duration::from_millis(jitter_ms)
    }
}
