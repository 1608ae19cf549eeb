//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use lexicache::cache::{MemoryCache, PersistentStore};
use lexicache::codec::CompressionCodec;
use lexicache::config::LoaderConfig;
use lexicache::error::{BundleError, Result};
use lexicache::loader::Loader;
use lexicache::storage::KeyValueStorage;
use lexicache::transport::{BundleTransport, FetchResponse};

/// One served bundle body.
#[derive(Debug, Clone)]
struct Served {
    translations: BTreeMap<String, String>,
    etag: Option<String>,
}

/// In-process translation service: serves configured bundles, honours ETags,
/// can be slowed down or taken offline, and records every request.
#[derive(Debug, Default)]
pub struct FakeTransport {
    bundles: Mutex<HashMap<String, Served>>,
    delay: Mutex<Duration>,
    offline: AtomicBool,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `pairs` for `locale` under `etag`.
    pub fn serve(&self, locale: &str, pairs: &[(&str, &str)], etag: Option<&str>) {
        let translations = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.bundles.lock().expect("bundles lock").insert(
            locale.to_string(),
            Served {
                translations,
                etag: etag.map(str::to_string),
            },
        );
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().expect("delay lock") = delay;
    }

    /// Total requests received.
    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    /// Requests received for `locale`.
    pub fn calls_for(&self, locale: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .filter(|l| l.as_str() == locale)
            .count()
    }

    fn respond(&self, locale: &str, etag: Option<&str>) -> Result<FetchResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BundleError::Network("connection refused".to_string()));
        }
        let bundles = self.bundles.lock().expect("bundles lock");
        let Some(served) = bundles.get(locale) else {
            return Err(BundleError::HttpStatus {
                locale: locale.to_string(),
                status: 404,
            });
        };
        if etag.is_some() && etag == served.etag.as_deref() {
            return Ok(FetchResponse::NotModified);
        }
        Ok(FetchResponse::Bundle {
            translations: served.translations.clone(),
            etag: served.etag.clone(),
        })
    }
}

impl BundleTransport for FakeTransport {
    fn fetch(&self, locale: &str, etag: Option<&str>) -> BoxFuture<'static, Result<FetchResponse>> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(locale.to_string());
        let delay = *self.delay.lock().expect("delay lock");
        let response = self.respond(locale, etag);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'static, Result<bool>> {
        let healthy = !self.offline.load(Ordering::SeqCst);
        async move { Ok(healthy) }.boxed()
    }
}

/// Loader timing used across scenarios: short backoff, default max age.
pub fn test_loader_config() -> LoaderConfig {
    LoaderConfig {
        timeout_ms: 1_000,
        retry_count: 2,
        base_delay_ms: 100,
        ..LoaderConfig::default()
    }
}

/// Persistent store over `storage` with default namespace and codec.
pub fn store_over(storage: Arc<dyn KeyValueStorage>) -> PersistentStore {
    PersistentStore::new(storage, CompressionCodec::default(), "lexicache_translations_")
}

/// Loader over a fresh memory tier, optionally backed by `store`.
pub fn loader_over(transport: Arc<FakeTransport>, store: Option<PersistentStore>) -> Loader {
    let cache = Arc::new(MemoryCache::new(10, 1 << 20, store));
    Loader::new(cache, transport, test_loader_config())
}
