//! Fault injection for blob stores.

use async_trait::async_trait;
use bucketcache_core::{
    BlobBody, BlobMetadata, BlobStore, BlobStoreFactory, CacheConfig, Error, Result, StoredBlob,
};
use bucketcache_store::MemoryBlobStore;
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Which operations fail, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// Every `get` and `head` fails with a network error.
    Reads,
    /// Every `put` fails with a backend error.
    Writes,
    /// Every `delete` fails with a backend error.
    Deletes,
    /// Everything fails.
    All,
}

/// Wraps a memory store and fails the operations selected by [`Fault`].
#[derive(Clone, Default)]
pub struct FailingBlobStore {
    inner: MemoryBlobStore,
    fault: Arc<Mutex<Fault>>,
}

impl FailingBlobStore {
    pub fn new(inner: MemoryBlobStore) -> Self {
        Self {
            inner,
            fault: Arc::new(Mutex::new(Fault::None)),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    pub fn inner(&self) -> &MemoryBlobStore {
        &self.inner
    }

    fn fault(&self) -> Fault {
        *self.fault.lock().unwrap()
    }

    fn reads_fail(&self) -> bool {
        matches!(self.fault(), Fault::Reads | Fault::All)
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        if self.reads_fail() {
            return Err(Error::Network(format!("connection reset reading {}", key)));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, body: BlobBody, metadata: &BlobMetadata) -> Result<()> {
        if matches!(self.fault(), Fault::Writes | Fault::All) {
            return Err(Error::Backend(format!("503 Slow Down writing {}", key)));
        }
        self.inner.put(key, body, metadata).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if matches!(self.fault(), Fault::Deletes | Fault::All) {
            return Err(Error::Backend(format!("500 deleting {}", key)));
        }
        self.inner.delete(key).await
    }

    async fn head(&self, key: &str) -> Result<Option<BlobMetadata>> {
        if self.reads_fail() {
            return Err(Error::Network(format!("connection reset probing {}", key)));
        }
        self.inner.head(key).await
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hands out clones of one [`FailingBlobStore`].
#[derive(Clone, Default)]
pub struct FailingStoreFactory {
    store: FailingBlobStore,
}

impl FailingStoreFactory {
    pub fn new(store: FailingBlobStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &FailingBlobStore {
        &self.store
    }
}

#[async_trait]
impl BlobStoreFactory for FailingStoreFactory {
    async fn connect(&self, _config: &CacheConfig) -> Result<Arc<dyn BlobStore>> {
        Ok(Arc::new(self.store.clone()))
    }
}
