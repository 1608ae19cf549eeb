//! Network transport serving translation bundles.
//!
//! The loader only depends on `BundleTransport`; `HttpTransport` is the production
//! implementation and tests plug in scripted fakes.

mod http;

pub use http::HttpTransport;

use std::collections::BTreeMap;

use futures::future::BoxFuture;

use crate::error::Result;

/// Answer to a conditional bundle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse {
    /// The cached copy identified by the sent ETag is still current.
    NotModified,
    /// A full bundle body.
    Bundle {
        /// Key -> translated string.
        translations: BTreeMap<String, String>,
        /// Version token of this body.
        etag: Option<String>,
    },
}

/// Source of translation bundles.
///
/// Futures are `'static` so the loader can spawn a request and stop waiting on it
/// at the timeout without cancelling it.
pub trait BundleTransport: Send + Sync + std::fmt::Debug {
    /// What: Fetch the bundle for `locale`.
    ///
    /// Inputs:
    /// - `locale`: Locale code
    /// - `etag`: Version token of the cached copy, sent as `If-None-Match`
    ///
    /// Output:
    /// - `FetchResponse::NotModified` or a full body
    ///
    /// # Errors
    /// - Network-family `BundleError`s
    fn fetch(&self, locale: &str, etag: Option<&str>) -> BoxFuture<'static, Result<FetchResponse>>;

    /// What: Probe the service health endpoint.
    ///
    /// Output:
    /// - `true` when the service reports healthy
    ///
    /// # Errors
    /// - Network-family `BundleError`s
    fn health(&self) -> BoxFuture<'static, Result<bool>>;
}
