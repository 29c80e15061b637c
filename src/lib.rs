//! # fetch-harbor
//!
//! A decorator for outbound HTTP calls that adds RFC 7234 / RFC 5861
//! response caching, a forced-retention "bypass" window, and bounded retry
//! of transient failures.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetch_harbor::config::HttpCacheOptions;
//! use fetch_harbor::{Client, Options, Request, Response, RetryConfig, TransportError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fetch_harbor::Error> {
//!     let origin = |request: Request| async move {
//!         Ok::<_, TransportError>(
//!             Response::new(200u16)
//!                 .url(request.url())
//!                 .header("cache-control", "public, max-age=60")
//!                 .body("Hello, World!"),
//!         )
//!     };
//!
//!     let client = Client::new(
//!         origin,
//!         Options::default()
//!             .with_http_cache(HttpCacheOptions::on().bypass_ttl(300))
//!             .with_retrying(RetryConfig::enabled()),
//!     )?;
//!
//!     let response = client.fetch("https://example.com/greeting").await?;
//!     println!("{} {:?}", response.status(), response.headers().get("x-fh-cache-status"));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod http;
pub mod normalize;
pub mod origin;
pub mod policy;
pub mod retry;

pub use cache::{CacheEntry, CacheStore, FileStore, MemoryStore, StoreError, StoreSpec};
pub use client::{CACHE_STATUS_HEADER, CacheStatus, Client, Error};
pub use clock::Clock;
pub use config::{CallOverrides, HttpCacheOptions, Options};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use normalize::{InvalidInputError, RequestInit, RequestInput};
pub use origin::{Fetch, TransportError};
pub use policy::{CacheOptions, CachePolicy};
pub use retry::{Backoff, RetryConfig};
