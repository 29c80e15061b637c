//! Decorator configuration and per-call overrides.
//!
//! Instance options are fixed when the [`Client`](crate::Client) is built.
//! Every call may carry [`CallOverrides`]; [`resolve`] layers them over the
//! instance options one field at a time. A per-call value always replaces
//! the instance value, lists included: a per-call `retryOn` is the whole
//! retry set for that call, not an addition to the default one.
//!
//! The option structs deserialize from the camelCase surface:
//!
//! ```
//! use fetch_harbor::config::Options;
//!
//! let options: Options = serde_json::from_str(r#"{
//!     "httpCache": { "enabled": true, "namespace": "api", "bypass": { "ttl": 120 } },
//!     "retrying": { "enabled": true, "retryOn": [429, 503] }
//! }"#).unwrap();
//!
//! let cache = options.http_cache.as_ref().unwrap();
//! assert_eq!(cache.bypass.as_ref().unwrap().ttl, 120);
//! assert_eq!(options.retrying.retry_on, vec![429, 503]);
//! assert_eq!(options.retrying.max_attempts, 5);
//! ```

use serde::Deserialize;

use crate::cache::StoreSpec;
use crate::policy::CacheOptions;
use crate::retry::{Backoff, RetryConfig};

/// Forced retention, in seconds, regardless of cache directives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct BypassOptions {
    pub ttl: u64,
}

/// HTTP caching settings. Presence of this section creates the cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpCacheOptions {
    /// `false` stops stored entries from being served. Misses are still
    /// written.
    pub enabled: bool,
    /// Evaluator options.
    pub options: CacheOptions,
    /// Backend, `"memory"` unless given.
    pub store: StoreSpec,
    /// Store namespace and default key prefix.
    pub namespace: Option<String>,
    pub bypass: Option<BypassOptions>,
}

impl Default for HttpCacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            options: CacheOptions::default(),
            store: StoreSpec::default(),
            namespace: None,
            bypass: None,
        }
    }
}

impl HttpCacheOptions {
    /// Caching with defaults everywhere.
    pub fn on() -> Self {
        Self::default()
    }

    /// Sets whether stored entries are served.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the backend.
    #[must_use]
    pub fn store(mut self, store: impl Into<StoreSpec>) -> Self {
        self.store = store.into();
        self
    }

    /// Sets the evaluator options.
    #[must_use]
    pub fn cache_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the store namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the bypass window in seconds.
    #[must_use]
    pub fn bypass_ttl(mut self, seconds: u64) -> Self {
        self.bypass = Some(BypassOptions { ttl: seconds });
        self
    }
}

/// Instance-level options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// `None` builds no cache at all.
    pub http_cache: Option<HttpCacheOptions>,
    pub retrying: RetryConfig,
}

impl Options {
    /// Turns caching on with `http_cache`.
    #[must_use]
    pub fn with_http_cache(mut self, http_cache: HttpCacheOptions) -> Self {
        self.http_cache = Some(http_cache);
        self
    }

    /// Replaces the retry settings.
    #[must_use]
    pub fn with_retrying(mut self, retrying: RetryConfig) -> Self {
        self.retrying = retrying;
        self
    }
}

/// Per-call caching overrides. The store cannot be changed per call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpCacheOverrides {
    /// `Some(false)` skips stored entries for this call only.
    pub enabled: Option<bool>,
    pub options: Option<CacheOptions>,
    /// Key prefix for this call; the store namespace is unchanged.
    pub namespace: Option<String>,
    pub bypass: Option<BypassOptions>,
}

/// Per-call retry overrides.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryOverrides {
    pub enabled: Option<bool>,
    pub max_attempts: Option<u32>,
    /// Replaces the retryable status set, never extends it.
    pub retry_on: Option<Vec<u16>>,
    pub backoff: Option<Backoff>,
}

/// Everything a single call may override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallOverrides {
    /// Caching overrides.
    pub http_cache: Option<HttpCacheOverrides>,
    /// Retry overrides.
    pub retrying: Option<RetryOverrides>,
}

/// Options in force for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
    /// Whether a found entry may be served.
    pub cache_enabled: bool,
    pub cache_options: CacheOptions,
    /// Cache-key prefix.
    pub namespace: Option<String>,
    /// Bypass window in milliseconds; zero when not configured.
    pub bypass_ttl_ms: u64,
    /// Retry settings after overrides.
    pub retry: RetryConfig,
}

/// Layers `overrides` over `instance`, field by field.
pub fn resolve(instance: &Options, overrides: &CallOverrides) -> EffectiveOptions {
    let base = instance.http_cache.as_ref();
    let call = overrides.http_cache.as_ref();

    let cache_enabled = call
        .and_then(|c| c.enabled)
        .or(base.map(|b| b.enabled))
        .unwrap_or(true);

    let cache_options = call
        .and_then(|c| c.options.clone())
        .or_else(|| base.map(|b| b.options.clone()))
        .unwrap_or_default();

    let namespace = call
        .and_then(|c| c.namespace.clone())
        .or_else(|| base.and_then(|b| b.namespace.clone()));

    let bypass_ttl_ms = call
        .and_then(|c| c.bypass)
        .or_else(|| base.and_then(|b| b.bypass))
        .map_or(0, |b| b.ttl.saturating_mul(1000));

    let mut retry = instance.retrying.clone();
    if let Some(r) = &overrides.retrying {
        if let Some(enabled) = r.enabled {
            retry.enabled = enabled;
        }
        if let Some(max_attempts) = r.max_attempts {
            retry.max_attempts = max_attempts;
        }
        if let Some(retry_on) = &r.retry_on {
            retry.retry_on = retry_on.clone();
        }
        if let Some(backoff) = &r.backoff {
            retry.backoff = backoff.clone();
        }
    }

    EffectiveOptions {
        cache_enabled,
        cache_options,
        namespace,
        bypass_ttl_ms,
        retry,
    }
}
