//! `reqwest`-backed transport for `GET /translations/{locale}`.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ETAG, HeaderMap, HeaderValue, IF_NONE_MATCH};
use serde::Deserialize;

use super::{BundleTransport, FetchResponse};
use crate::error::{BundleError, Result};

/// Body of a translations response.
#[derive(Debug, Deserialize)]
struct TranslationsBody {
    /// Server-side success flag.
    success: bool,
    /// Key -> translated string.
    #[serde(default)]
    translations: BTreeMap<String, String>,
}

/// Body of a health response.
#[derive(Debug, Deserialize)]
struct HealthBody {
    /// Reported status, `"ok"` when healthy.
    #[serde(default)]
    status: String,
}

/// HTTP transport with a pooled client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Shared client (connection pooling is built in).
    client: reqwest::Client,
    /// Base URL without trailing slash, e.g. `https://example.org/api`.
    base_url: String,
}

impl HttpTransport {
    /// What: Build a transport for `base_url`.
    ///
    /// Inputs:
    /// - `base_url`: Service root; `/translations/{locale}` is appended
    /// - `connect_timeout`: TCP/TLS connect timeout
    ///
    /// # Errors
    /// - `Network` if the HTTP client cannot be constructed
    ///
    /// Details:
    /// - No overall request timeout is set here; the loader races each fetch itself.
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(format!("lexicache/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the bundle endpoint for `locale`.
    #[must_use]
    pub fn translations_url(&self, locale: &str) -> String {
        format!("{}/translations/{}", self.base_url, percent_encode(locale))
    }
}

/// Percent-encode a path segment (RFC 3986 unreserved characters pass through).
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

impl BundleTransport for HttpTransport {
    fn fetch(&self, locale: &str, etag: Option<&str>) -> BoxFuture<'static, Result<FetchResponse>> {
        let client = self.client.clone();
        let url = self.translations_url(locale);
        let locale = locale.to_string();
        let etag = etag.map(str::to_string);
        async move {
            let mut request = client.get(&url);
            if let Some(tag) = &etag {
                request = request.header(IF_NONE_MATCH, tag);
            }
            tracing::debug!(%url, has_etag = etag.is_some(), "requesting translations");
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::NOT_MODIFIED {
                tracing::debug!(%locale, "translations not modified");
                return Ok(FetchResponse::NotModified);
            }
            if !status.is_success() {
                return Err(BundleError::HttpStatus {
                    locale,
                    status: status.as_u16(),
                });
            }

            let new_etag = response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body: TranslationsBody = response.json().await?;
            if !body.success {
                return Err(BundleError::Network(format!(
                    "server reported failure for '{locale}'"
                )));
            }
            tracing::info!(
                %locale,
                entries = body.translations.len(),
                etag = new_etag.as_deref().unwrap_or(""),
                "fetched translations"
            );
            Ok(FetchResponse::Bundle {
                translations: body.translations,
                etag: new_etag,
            })
        }
        .boxed()
    }

    fn health(&self) -> BoxFuture<'static, Result<bool>> {
        let client = self.client.clone();
        let url = format!("{}/health", self.base_url);
        async move {
            let response = client.get(&url).send().await?;
            if !response.status().is_success() {
                return Ok(false);
            }
            let body: HealthBody = response.json().await?;
            Ok(body.status.eq_ignore_ascii_case("ok"))
        }
        .boxed()
    }
}
