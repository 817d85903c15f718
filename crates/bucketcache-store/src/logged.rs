//! Best-effort wrapper around [`ExpiringStore`].
//!
//! Transient backend failures are logged and absorbed: reads degrade to a
//! miss, deletes and writes become no-ops. Corrupt records, unsupported
//! operations and configuration errors still propagate.

use bucketcache_core::{BlobBody, CacheDecision, Error, Lookup, Result, SetOutcome, Ttl};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::error;

use crate::expiring::ExpiringStore;

pub struct LoggedStore<'a> {
    inner: &'a ExpiringStore,
}

impl<'a> LoggedStore<'a> {
    pub fn new(inner: &'a ExpiringStore) -> Self {
        Self { inner }
    }

    fn absorb<T>(&self, operation: &str, key: &str, err: Error, fallback: T) -> Result<T> {
        if err.is_transient() || err.is_not_found() {
            error!(
                backend = self.inner.backend().name(),
                key = %key,
                error = %err,
                "cache {} failed",
                operation
            );
            Ok(fallback)
        } else {
            Err(err)
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str, ttl: Ttl) -> Result<Lookup<T>> {
        match self.inner.get(key, ttl).await {
            Ok(lookup) => Ok(lookup),
            Err(err) => self.absorb("get", key, err, Lookup::Miss),
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        decision: CacheDecision,
    ) -> Result<SetOutcome> {
        match self.inner.set(key, value, decision).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.absorb("set", key, err, SetOutcome::Skipped),
        }
    }

    pub async fn set_raw(
        &self,
        key: &str,
        body: BlobBody,
        decision: CacheDecision,
    ) -> Result<SetOutcome> {
        match self.inner.set_raw(key, body, decision).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.absorb("set", key, err, SetOutcome::Skipped),
        }
    }

    /// Delete an entry. A missing entry is logged, not raised.
    pub async fn delete(&self, key: &str) -> Result<()> {
        match self.inner.delete(key).await {
            Ok(()) => Ok(()),
            Err(err) => self.absorb("delete", key, err, ()),
        }
    }
}
