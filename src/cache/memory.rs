//! In-process store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use super::{CacheEntry, CacheStore, StoreError};
use crate::clock::Clock;

#[derive(Debug)]
struct Slot {
    payload: String,
    expires_at_ms: Option<u64>,
}

/// A shared in-memory map of serialized entries.
///
/// Cloning yields another handle to the same map, so a caller can keep one
/// handle to inspect what the decorator stored.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    clock: Clock,
}

impl MemoryStore {
    /// An empty store on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// An empty store that reads time from `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Number of stored entries. Expired ones count until the next read of
    /// their key or the next write.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stored keys, in no particular order.
    pub async fn keys(&self) -> Vec<String> {
        self.slots.read().await.keys().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let now = self.clock.now_ms();
        {
            let slots = self.slots.read().await;
            match slots.get(key) {
                None => return Ok(None),
                Some(slot) if slot.expires_at_ms.is_none_or(|at| now < at) => {
                    let entry = serde_json::from_str(&slot.payload).map_err(|source| {
                        StoreError::Corrupt {
                            key: key.to_owned(),
                            source,
                        }
                    })?;
                    return Ok(Some(entry));
                }
                Some(_) => {}
            }
        }

        trace!(key, "evicting expired entry");
        self.slots.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), StoreError> {
        let payload = serde_json::to_string(entry).map_err(StoreError::Serialize)?;
        let now = self.clock.now_ms();
        let expires_at_ms = super::expiry(now, ttl);

        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, slot| slot.expires_at_ms.is_none_or(|at| now < at));
        if slots.len() < before {
            trace!(pruned = before - slots.len(), "pruned expired entries");
        }
        slots.insert(
            key.to_owned(),
            Slot {
                payload,
                expires_at_ms,
            },
        );
        Ok(())
    }
}
