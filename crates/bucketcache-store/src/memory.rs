//! In-process blob store.

use async_trait::async_trait;
use bucketcache_core::{
    BlobBody, BlobMetadata, BlobStore, BlobStoreFactory, CacheConfig, Error, Result, StoredBlob,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Operation counters for a memory store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: u64,
    pub puts: u64,
    pub deletes: u64,
}

#[derive(Default)]
struct Counters {
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
}

/// Blob store kept in memory. Clones share the same entries.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<RwLock<HashMap<String, StoredBlob>>>,
    counters: Arc<Counters>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Insert an entry directly, bypassing the counters.
    pub async fn insert(&self, key: impl Into<String>, blob: StoredBlob) {
        self.entries.write().await.insert(key.into(), blob);
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.counters.gets.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, body: BlobBody, metadata: &BlobMetadata) -> Result<()> {
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        let metadata = BlobMetadata {
            content_type: Some(
                metadata
                    .content_type
                    .clone()
                    .unwrap_or_else(|| body.content_type().to_string()),
            ),
            ..metadata.clone()
        };
        let blob = StoredBlob {
            data: body.into_bytes(),
            metadata,
        };
        self.entries.write().await.insert(key.to_string(), blob);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        match self.entries.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hands every context a handle onto the same in-memory entries.
#[derive(Clone, Default)]
pub struct MemoryStoreFactory {
    store: MemoryBlobStore,
}

impl MemoryStoreFactory {
    pub fn new(store: MemoryBlobStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryBlobStore {
        &self.store
    }
}

#[async_trait]
impl BlobStoreFactory for MemoryStoreFactory {
    async fn connect(&self, _config: &CacheConfig) -> Result<Arc<dyn BlobStore>> {
        Ok(Arc::new(self.store.clone()))
    }
}
