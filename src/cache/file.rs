//! Directory-backed store addressed by a `file://` connection string.
//!
//! One JSON document per key. Writes go to a temporary file first and are
//! renamed into place, so readers never observe a half-written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

use super::{CacheEntry, CacheStore, StoreError};
use crate::clock::Clock;

#[derive(Serialize, Deserialize)]
struct Document {
    key: String,
    expires_at_ms: Option<u64>,
    entry: CacheEntry,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    clock: Clock,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, StoreError> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, e)),
        };

        let document: Document =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt {
                key: key.to_owned(),
                source,
            })?;

        if document
            .expires_at_ms
            .is_some_and(|at| self.clock.now_ms() >= at)
        {
            trace!(key, path = %path.display(), "removing expired entry");
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path, e)),
            }
            return Ok(None);
        }

        Ok(Some(document.entry))
    }

    async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir, e))?;

        let document = Document {
            key: key.to_owned(),
            expires_at_ms: super::expiry(self.clock.now_ms(), ttl),
            entry: entry.clone(),
        };
        let payload = serde_json::to_vec(&document).map_err(StoreError::Serialize)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error(&path, e))?;
        Ok(())
    }
}
