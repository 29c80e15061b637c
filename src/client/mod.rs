//! The caching and retrying decorator.
//!
//! [`Client`] wraps an origin [`Fetch`] and decides, per call, whether to
//! serve a stored response, revalidate it, or go to the origin:
//!
//! ```text
//! START ─┬─ no cache configured ──────────────────────────── PASSTHROUGH (MISS)
//!        └─ LOOKUP ─┬─ no entry ───────────────────────────── MISS
//!                   └─ entry ─┬─ bypass window open ───────── BYPASS_HIT (HIT)
//!                             ├─ caching disabled for call ── DISABLED_WITH_ENTRY (MISS)
//!                             ├─ policy fresh ─────────────── FRESH_HIT (HIT)
//!                             └─ otherwise ───────────────── STALE_REVALIDATE
//! ```
//!
//! Every origin call goes through [`retry::attempt`](crate::retry::attempt),
//! and every response carries [`CACHE_STATUS_HEADER`].

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::cache::{
    BypassDescriptor, CacheEntry, CacheStore, NamespacedStore, ResponseSnapshot, StoreError,
};
use crate::clock::Clock;
use crate::config::{self, EffectiveOptions, Options};
use crate::http::{Request, Response};
use crate::normalize::{
    self, InvalidInputError, NormalizedRequest, RequestInit, RequestInput,
};
use crate::origin::{Fetch, TransportError};
use crate::policy::CachePolicy;
use crate::retry;

/// Response header reporting whether the body came from the store.
pub const CACHE_STATUS_HEADER: &str = "x-fh-cache-status";

/// Where a returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the store, possibly after a 304.
    Hit,
    /// Fetched from the origin.
    Miss,
}

impl CacheStatus {
    /// Value of [`CACHE_STATUS_HEADER`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// Errors surfaced by [`Client::fetch`].
#[derive(Debug, Error)]
pub enum Error {
    /// No absolute URL could be derived from the call.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// The origin failed on every attempt.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The store could not be opened, read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The decorator. Owns its origin, its store handle and its options; two
/// clients never share state unless handed the same store.
pub struct Client<F> {
    origin: F,
    options: Options,
    cache: Option<NamespacedStore>,
    clock: Clock,
}

impl<F: Fetch> Client<F> {
    /// Builds a client reading the current wall clock.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] when the configured store cannot be opened.
    pub fn new(origin: F, options: Options) -> Result<Self, Error> {
        Self::with_clock(origin, options, Clock::new())
    }

    /// Builds a client on an explicit clock, shared with any store it opens.
    pub fn with_clock(origin: F, options: Options, clock: Clock) -> Result<Self, Error> {
        let cache = match &options.http_cache {
            Some(http_cache) => {
                let store = http_cache.store.open(clock)?;
                Some(NamespacedStore::new(store, http_cache.namespace.as_deref()))
            }
            None => None,
        };
        if let Some(cache) = &cache {
            debug!(namespace = cache.namespace(), "http cache configured");
        }

        Ok(Self {
            origin,
            options,
            cache,
            clock,
        })
    }

    /// Instance options the client was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Fetches `input` with no per-call options.
    pub async fn fetch(&self, input: impl Into<RequestInput>) -> Result<Response, Error> {
        self.fetch_with(input, RequestInit::default()).await
    }

    /// Fetches `input`, letting `init` override method, headers, body and
    /// the client's own options for this call.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] when no absolute URL can be derived.
    /// - [`Error::Transport`] when the origin fails on every attempt.
    /// - [`Error::Store`] when the store cannot be read or written.
    pub async fn fetch_with(
        &self,
        input: impl Into<RequestInput>,
        init: RequestInit,
    ) -> Result<Response, Error> {
        let input = input.into();
        let effective = config::resolve(&self.options, &init.fh);
        let outbound = normalize::outbound_request(&input, &init)?;

        let Some(cache) = &self.cache else {
            trace!(url = outbound.url(), "no cache configured, passing through");
            let response = self.call_origin(&effective, &outbound).await?;
            return Ok(tag(response, CacheStatus::Miss));
        };

        let normalized = normalize::normalize(&input, &init)?;
        let key = normalize::cache_key(effective.namespace.as_deref(), &normalized);

        let (response, status) = match cache.get(&key).await? {
            Some(entry) => {
                self.on_entry(cache, &key, entry, &effective, &normalized, outbound)
                    .await?
            }
            None => {
                self.on_miss(cache, &key, &effective, &normalized, outbound)
                    .await?
            }
        };
        Ok(tag(response, status))
    }

    async fn on_entry(
        &self,
        cache: &NamespacedStore,
        key: &str,
        entry: CacheEntry,
        effective: &EffectiveOptions,
        normalized: &NormalizedRequest,
        outbound: Request,
    ) -> Result<(Response, CacheStatus), Error> {
        let now = self.clock.now();
        let now_ms = self.clock.now_ms();
        let policy = CachePolicy::from_object(entry.policy.clone()).map_err(|source| {
            StoreError::Corrupt {
                key: key.to_owned(),
                source,
            }
        })?;

        if normalized.is_cacheable()
            && entry.bypass.is_some_and(|bypass| bypass.is_active(now_ms))
        {
            debug!(key, "bypass window open, serving stored response");
            let served = entry.response.rehydrate(policy.response_headers(now));
            return Ok((served, CacheStatus::Hit));
        }

        if !effective.cache_enabled {
            debug!(key, "caching disabled for this call, leaving entry untouched");
            let response = self.call_origin(effective, &outbound).await?;
            return Ok((response, CacheStatus::Miss));
        }

        if policy.satisfies_without_revalidation(normalized, now) {
            debug!(key, "fresh hit");
            let served = entry.response.rehydrate(policy.response_headers(now));
            return Ok((served, CacheStatus::Hit));
        }

        debug!(key, "stale entry, revalidating");
        let conditional = outbound.with_headers(policy.revalidation_headers(normalized));
        let fetched = self.call_origin(effective, &conditional).await?;

        let now = self.clock.now();
        let revalidated = policy.revalidated_policy(normalized, &fetched, now);
        let (snapshot, served, status) = if revalidated.modified {
            debug!(key, status = fetched.status().as_u16(), "origin sent a new representation");
            (ResponseSnapshot::capture(&fetched), fetched, CacheStatus::Miss)
        } else {
            debug!(key, "origin confirmed stored representation");
            let served = entry
                .response
                .rehydrate(revalidated.policy.response_headers(now));
            (entry.response, served, CacheStatus::Hit)
        };

        // Revalidation always replaces the entry, storable or not.
        self.write(cache, key, &revalidated.policy, snapshot, effective, normalized)
            .await?;
        Ok((served, status))
    }

    async fn on_miss(
        &self,
        cache: &NamespacedStore,
        key: &str,
        effective: &EffectiveOptions,
        normalized: &NormalizedRequest,
        outbound: Request,
    ) -> Result<(Response, CacheStatus), Error> {
        let response = self.call_origin(effective, &outbound).await?;

        let policy = CachePolicy::new(
            normalized,
            &response,
            &effective.cache_options,
            self.clock.now(),
        );
        let forced = normalized.is_cacheable() && effective.bypass_ttl_ms > 0;
        if !policy.storable() && !forced {
            trace!(key, status = response.status().as_u16(), "response not storable");
            return Ok((response, CacheStatus::Miss));
        }

        let snapshot = ResponseSnapshot::capture(&response);
        self.write(cache, key, &policy, snapshot, effective, normalized)
            .await?;
        Ok((response, CacheStatus::Miss))
    }

    /// Persists `snapshot` under `key` for `max(policy ttl, bypass ttl)`.
    async fn write(
        &self,
        cache: &NamespacedStore,
        key: &str,
        policy: &CachePolicy,
        snapshot: ResponseSnapshot,
        effective: &EffectiveOptions,
        normalized: &NormalizedRequest,
    ) -> Result<(), Error> {
        let now_ms = self.clock.now_ms();
        let bypass = (normalized.is_cacheable() && effective.bypass_ttl_ms > 0).then(|| {
            BypassDescriptor {
                ttl_ms: effective.bypass_ttl_ms,
                stored_at_ms: now_ms,
            }
        });
        let ttl_ms = policy
            .time_to_live(self.clock.now())
            .max(bypass.map_or(0, |b| b.ttl_ms));

        let entry = CacheEntry {
            policy: policy.to_object().map_err(StoreError::Serialize)?,
            response: snapshot,
            bypass,
        };
        cache
            .set(key, &entry, Duration::from_millis(ttl_ms))
            .await?;
        debug!(key, ttl_ms, bypass = bypass.is_some(), "stored response");
        Ok(())
    }

    async fn call_origin(
        &self,
        effective: &EffectiveOptions,
        request: &Request,
    ) -> Result<Response, TransportError> {
        retry::attempt(&effective.retry, || self.origin.fetch(request.clone())).await
    }
}

impl<F> std::fmt::Debug for Client<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn tag(mut response: Response, status: CacheStatus) -> Response {
    response
        .headers_mut()
        .set(CACHE_STATUS_HEADER, status.as_str());
    response
}
