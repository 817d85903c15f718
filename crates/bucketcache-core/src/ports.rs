//! Port traits.
//!
//! These traits define the interfaces between the cache and its storage
//! backends.

use crate::blob::{BlobBody, BlobMetadata, StoredBlob};
use crate::config::CacheConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;

/// Key-value blob storage with out-of-band metadata.
///
/// Every method may fail with a transient error. Implementations do not
/// retry on their own beyond what the backend client is configured to do.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download a blob and its metadata. Absence is `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>>;

    /// Upload a blob, replacing anything stored under the key.
    async fn put(&self, key: &str, body: BlobBody, metadata: &BlobMetadata) -> Result<()>;

    /// Delete a blob. Absence is `Error::NotFound`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Read only the metadata of a blob.
    async fn head(&self, key: &str) -> Result<Option<BlobMetadata>> {
        Ok(self.get(key).await?.map(|blob| blob.metadata))
    }

    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Access to the concrete backend for operations outside this trait.
    fn as_any(&self) -> &dyn Any;
}

/// Borrow a store as its concrete backend type.
pub fn downcast_store<T: BlobStore + 'static>(store: &dyn BlobStore) -> Result<&T> {
    store.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::Unsupported(format!(
            "backend '{}' is not a {}",
            store.name(),
            std::any::type_name::<T>()
        ))
    })
}

/// Builds one backend handle for one execution context.
#[async_trait]
pub trait BlobStoreFactory: Send + Sync {
    async fn connect(&self, config: &CacheConfig) -> Result<Arc<dyn BlobStore>>;
}

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
