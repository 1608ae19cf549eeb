//! Stages of a load and the outcome handed back to callers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::bundle::TranslationBundle;
use crate::cache::Priority;

/// One step of the loader state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Not started.
    Idle,
    /// Looking for a fresh cached copy.
    CacheCheck,
    /// Network attempt `attempt` (1-based).
    Fetching {
        /// Attempt number.
        attempt: u32,
    },
    /// Waiting before the next attempt.
    Retrying {
        /// Attempt that just failed.
        attempt: u32,
        /// Backoff before the next one.
        delay: Duration,
    },
    /// Serving a stale copy of the requested locale.
    StaleCopy,
    /// Trying the fallback locale (cache, then one fetch).
    FallbackLocale,
    /// Serving the built-in bundle.
    FallbackBuiltin,
    /// Finished.
    Done,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::CacheCheck => f.write_str("cache-check"),
            Self::Fetching { attempt } => write!(f, "fetching#{attempt}"),
            Self::Retrying { attempt, delay } => {
                write!(f, "retrying#{attempt}({}ms)", delay.as_millis())
            }
            Self::StaleCopy => f.write_str("stale-copy"),
            Self::FallbackLocale => f.write_str("fallback-locale"),
            Self::FallbackBuiltin => f.write_str("fallback-builtin"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Result of a load. A load always produces a usable bundle.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Bundle to use; its `locale` names where it actually came from.
    pub bundle: Arc<TranslationBundle>,
    /// True when anything other than the requested locale's fresh data was served.
    pub used_fallback: bool,
    /// True when no new body was downloaded for the served bundle.
    pub from_cache: bool,
    /// Stages visited, in order.
    pub stages: Vec<LoadStage>,
}

impl LoadOutcome {
    /// True when the outcome visited `stage`.
    #[must_use]
    pub fn visited(&self, stage: LoadStage) -> bool {
        self.stages.contains(&stage)
    }

    /// Number of network attempts made for the requested locale.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, LoadStage::Fetching { .. }))
            .count()
    }

    /// Stage path rendered as `idle -> cache-check -> done`.
    #[must_use]
    pub fn path(&self) -> String {
        self.stages
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Parameters of one load call.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Locale to load.
    pub locale: String,
    /// Locale tried when the requested one cannot be acquired.
    pub fallback_locale: Option<String>,
    /// Skip the cache check and go straight to the network.
    pub force_refresh: bool,
    /// Per-attempt timeout; loader default when `None`.
    pub timeout: Option<Duration>,
    /// Retries after the first attempt; loader default when `None`.
    pub retry_count: Option<u32>,
    /// Memory-cache priority for the fetched bundle.
    pub priority: Priority,
}

impl LoadRequest {
    /// Request for `locale` with loader defaults and `Priority::High`.
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            fallback_locale: None,
            force_refresh: false,
            timeout: None,
            retry_count: None,
            priority: Priority::High,
        }
    }

    /// Set the fallback locale.
    #[must_use]
    pub fn fallback(mut self, locale: impl Into<String>) -> Self {
        self.fallback_locale = Some(locale.into());
        self
    }

    /// Bypass the cache check.
    #[must_use]
    pub const fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry count.
    #[must_use]
    pub const fn retry_count(mut self, retries: u32) -> Self {
        self.retry_count = Some(retries);
        self
    }

    /// Override the cache priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_path_rendering() {
        let outcome = LoadOutcome {
            bundle: crate::loader::builtin::builtin_bundle("en"),
            used_fallback: true,
            from_cache: false,
            stages: vec![
                LoadStage::Idle,
                LoadStage::CacheCheck,
                LoadStage::Fetching { attempt: 1 },
                LoadStage::Retrying {
                    attempt: 1,
                    delay: Duration::from_millis(100),
                },
                LoadStage::Fetching { attempt: 2 },
                LoadStage::FallbackBuiltin,
                LoadStage::Done,
            ],
        };
        assert_eq!(
            outcome.path(),
            "idle -> cache-check -> fetching#1 -> retrying#1(100ms) -> fetching#2 -> fallback-builtin -> done"
        );
        assert_eq!(outcome.attempts(), 2);
        assert!(outcome.visited(LoadStage::FallbackBuiltin));
        assert!(!outcome.visited(LoadStage::StaleCopy));
    }

    #[test]
    fn request_builder_sets_fields() {
        let req = LoadRequest::new("fr")
            .fallback("en")
            .force_refresh(true)
            .timeout(Duration::from_secs(2))
            .retry_count(0)
            .priority(Priority::Normal);
        assert_eq!(req.locale, "fr");
        assert_eq!(req.fallback_locale.as_deref(), Some("en"));
        assert!(req.force_refresh);
        assert_eq!(req.timeout, Some(Duration::from_secs(2)));
        assert_eq!(req.retry_count, Some(0));
        assert_eq!(req.priority, Priority::Normal);
    }
}
