//! Cache entries and the stores that persist them.
//!
//! A [`CacheEntry`] bundles the serialized policy, the response snapshot and
//! an optional bypass descriptor. Stores are keyed, TTL-expiring and
//! selected through [`StoreSpec`]:
//!
//! - [`MemoryStore`]: in-process map, the default.
//! - [`FileStore`]: `file://<dir>` connection strings.
//!
//! Every store the decorator uses is wrapped in a [`NamespacedStore`] so
//! several decorators can share one backend without colliding.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::clock::Clock;

pub mod file;
pub mod memory;
pub mod snapshot;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use snapshot::ResponseSnapshot;

/// Prefix of every store namespace.
pub const NAMESPACE_PREFIX: &str = "fetch-harbor";

/// Errors raised by a cache store. Always propagated to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("corrupt cache entry for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid store connection string {uri:?}: {reason}")]
    InvalidConnectionString { uri: String, reason: String },

    #[error("unsupported store scheme {0:?}")]
    UnsupportedScheme(String),
}

/// Non-standard forced-retention window attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BypassDescriptor {
    pub ttl_ms: u64,
    pub stored_at_ms: u64,
}

impl BypassDescriptor {
    /// Whether the window is still open at `now_ms`.
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms < self.stored_at_ms.saturating_add(self.ttl_ms)
    }
}

/// One stored response with everything needed to judge it later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Opaque policy state, see [`CachePolicy::to_object`](crate::policy::CachePolicy::to_object).
    pub policy: Value,
    pub response: ResponseSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<BypassDescriptor>,
}

/// Keyed persistence with TTL-based expiry.
///
/// A zero `ttl` means the entry never expires.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError>;

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), StoreError>;
}

/// Absolute expiry for an entry written at `now_ms`.
pub(crate) fn expiry(now_ms: u64, ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        None
    } else {
        Some(now_ms.saturating_add(ttl.as_millis() as u64))
    }
}

/// Which backend to use.
#[derive(Debug, Clone)]
pub enum StoreSpec {
    /// An in-process map. Pass a handle you keep to observe the store.
    InMemory(MemoryStore),
    /// `memory://` or `file://<absolute dir>`.
    ConnectionString(String),
}

impl Default for StoreSpec {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl From<MemoryStore> for StoreSpec {
    fn from(store: MemoryStore) -> Self {
        Self::InMemory(store)
    }
}

impl From<String> for StoreSpec {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("memory") {
            Self::default()
        } else {
            Self::ConnectionString(value)
        }
    }
}

impl<'de> Deserialize<'de> for StoreSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl StoreSpec {
    /// Opens the store this value names.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidConnectionString`] for unparsable strings and
    /// [`StoreError::UnsupportedScheme`] for schemes without a backend.
    pub fn open(&self, clock: Clock) -> Result<Arc<dyn CacheStore>, StoreError> {
        let uri = match self {
            Self::InMemory(store) => return Ok(Arc::new(store.clone())),
            Self::ConnectionString(uri) => uri,
        };

        let invalid = |reason: String| StoreError::InvalidConnectionString {
            uri: uri.clone(),
            reason,
        };
        let parsed = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;

        match parsed.scheme() {
            "memory" => Ok(Arc::new(MemoryStore::with_clock(clock))),
            "file" => {
                let dir = parsed
                    .to_file_path()
                    .map_err(|()| invalid("not an absolute file path".to_owned()))?;
                Ok(Arc::new(FileStore::new(dir, clock)))
            }
            other => Err(StoreError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Prefixes every key with `fetch-harbor.<namespace>:`.
#[derive(Clone)]
pub struct NamespacedStore {
    namespace: String,
    inner: Arc<dyn CacheStore>,
}

impl NamespacedStore {
    pub fn new(inner: Arc<dyn CacheStore>, namespace: Option<&str>) -> Self {
        Self {
            namespace: format!("{NAMESPACE_PREFIX}.{}", namespace.unwrap_or("default")),
            inner,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }
}

impl std::fmt::Debug for NamespacedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheStore for NamespacedStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), StoreError> {
        self.inner.set(&self.scoped(key), entry, ttl).await
    }
}
