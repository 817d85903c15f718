//! TTL-aware cache store over a blob backend.
//!
//! Entries carry their creation time in backend metadata. Freshness is
//! decided at read time against the TTL the caller passes in, so the same
//! entry can be fresh for one reader and stale for another. Expired entries
//! are reported but never deleted here.

use bucketcache_core::{
    BlobBody, BlobMetadata, BlobStore, CacheConfig, CacheDecision, Clock, Error, Lookup, Result,
    SetOutcome, StoredBlob, SystemClock, Ttl,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::logged::LoggedStore;

pub struct ExpiringStore {
    backend: Arc<dyn BlobStore>,
    replace: bool,
    clock: Arc<dyn Clock>,
}

impl ExpiringStore {
    pub fn new(backend: Arc<dyn BlobStore>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            replace: config.replace,
            clock,
        }
    }

    /// Store using the wall clock.
    pub fn with_system_clock(backend: Arc<dyn BlobStore>, config: &CacheConfig) -> Self {
        Self::new(backend, config, Arc::new(SystemClock))
    }

    pub fn backend(&self) -> &dyn BlobStore {
        self.backend.as_ref()
    }

    /// Best-effort view that logs and absorbs transient failures.
    pub fn logged(&self) -> LoggedStore<'_> {
        LoggedStore::new(self)
    }

    /// Fetch the raw entry and check it against `ttl`.
    pub async fn get_raw(&self, key: &str, ttl: Ttl) -> Result<Lookup<StoredBlob>> {
        let Some(blob) = self.backend.get(key).await? else {
            debug!(key = %key, "cache miss");
            return Ok(Lookup::Miss);
        };

        if let Ttl::After(_) = ttl {
            let age = self.clock.now() - blob.metadata.created_at;
            if !ttl.is_fresh(age) {
                debug!(key = %key, age_secs = age.num_seconds(), "cache entry expired");
                return Ok(Lookup::Expired { age });
            }
        }

        debug!(key = %key, "cache hit");
        Ok(Lookup::Hit(blob))
    }

    /// Fetch an entry and decode it from JSON. A record that does not decode
    /// is an error, not a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, ttl: Ttl) -> Result<Lookup<T>> {
        match self.get_raw(key, ttl).await? {
            Lookup::Hit(blob) => serde_json::from_slice(&blob.data)
                .map(Lookup::Hit)
                .map_err(|e| Error::Malformed(format!("{}: {}", key, e))),
            Lookup::Miss => Ok(Lookup::Miss),
            Lookup::Expired { age } => Ok(Lookup::Expired { age }),
        }
    }

    /// Write a raw body, stamped with the current time.
    pub async fn set_raw(
        &self,
        key: &str,
        body: BlobBody,
        decision: CacheDecision,
    ) -> Result<SetOutcome> {
        if decision == CacheDecision::DoNotCache {
            return Ok(SetOutcome::Skipped);
        }

        if !self.replace && self.backend.head(key).await?.is_some() {
            warn!(key = %key, "entry exists and replace is off, keeping first write");
            return Ok(SetOutcome::Preserved);
        }

        let metadata = BlobMetadata::new(self.clock.now());
        self.backend.put(key, body, &metadata).await?;
        debug!(key = %key, backend = self.backend.name(), "cache entry written");
        Ok(SetOutcome::Written)
    }

    /// Encode a value as JSON text and write it.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        decision: CacheDecision,
    ) -> Result<SetOutcome> {
        if decision == CacheDecision::DoNotCache {
            return Ok(SetOutcome::Skipped);
        }
        let text = serde_json::to_string(value)?;
        self.set_raw(key, BlobBody::Text(text), decision).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }
}
