//! Filesystem blob store for local development.

use async_trait::async_trait;
use bucketcache_core::{
    BlobBody, BlobMetadata, BlobStore, BlobStoreFactory, CacheConfig, Error, Result, StoredBlob,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::any::Any;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Sidecar written next to each blob.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    key: String,
    #[serde(flatten)]
    metadata: BlobMetadata,
}

/// Stores each blob as a file named after the hash of its key, with its
/// metadata in a `.meta.json` sidecar.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root_dir: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    pub fn root_dir(&self) -> &std::path::Path {
        &self.root_dir
    }

    fn file_stem(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root_dir.join(format!("{}.blob", Self::file_stem(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root_dir
            .join(format!("{}.meta.json", Self::file_stem(key)))
    }

    async fn read_sidecar(&self, key: &str) -> Result<Option<BlobMetadata>> {
        match tokio::fs::read(self.meta_path(key)).await {
            Ok(raw) => {
                let sidecar: Sidecar = serde_json::from_slice(&raw)?;
                Ok(Some(sidecar.metadata))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        let Some(metadata) = self.read_sidecar(key).await? else {
            return Ok(None);
        };
        match tokio::fs::read(self.blob_path(key)).await {
            Ok(data) => Ok(Some(StoredBlob { data, metadata })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, body: BlobBody, metadata: &BlobMetadata) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let sidecar = Sidecar {
            key: key.to_string(),
            metadata: BlobMetadata {
                content_type: Some(
                    metadata
                        .content_type
                        .clone()
                        .unwrap_or_else(|| body.content_type().to_string()),
                ),
                ..metadata.clone()
            },
        };

        // Blob first so a reader never sees metadata without data.
        tokio::fs::write(self.blob_path(key), body.as_bytes()).await?;
        tokio::fs::write(self.meta_path(key), serde_json::to_vec(&sidecar)?).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.meta_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
        match tokio::fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<BlobMetadata>> {
        self.read_sidecar(key).await
    }

    fn name(&self) -> &str {
        "filesystem"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Opens a filesystem store rooted at `root_dir/bucket_name`.
#[derive(Debug, Clone)]
pub struct FilesystemStoreFactory {
    root_dir: PathBuf,
}

impl FilesystemStoreFactory {
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }
}

impl Default for FilesystemStoreFactory {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("bucketcache"))
    }
}

#[async_trait]
impl BlobStoreFactory for FilesystemStoreFactory {
    async fn connect(&self, config: &CacheConfig) -> Result<Arc<dyn BlobStore>> {
        let root = if config.bucket_name.is_empty() {
            self.root_dir.clone()
        } else {
            self.root_dir.join(&config.bucket_name)
        };
        Ok(Arc::new(FilesystemBlobStore::new(root)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn meta() -> BlobMetadata {
        BlobMetadata::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_roundtrip_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path().to_path_buf());

        store
            .put("abc/api/v1/test?p=1", "{\"a\":1}".into(), &meta())
            .await
            .unwrap();

        let blob = store.get("abc/api/v1/test?p=1").await.unwrap().unwrap();
        assert_eq!(blob.data, b"{\"a\":1}");
        assert_eq!(blob.metadata.created_at, meta().created_at);
        assert_eq!(
            blob.metadata.content_type.as_deref(),
            Some("application/json; charset=utf-8")
        );
        assert_eq!(
            store.head("abc/api/v1/test?p=1").await.unwrap(),
            Some(blob.metadata)
        );
    }

    #[tokio::test]
    async fn test_text_and_bytes_download_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path().to_path_buf());

        store.put("text", "payload".into(), &meta()).await.unwrap();
        store
            .put("bytes", b"payload".to_vec().into(), &meta())
            .await
            .unwrap();

        let text = store.get("text").await.unwrap().unwrap();
        let bytes = store.get("bytes").await.unwrap().unwrap();
        assert_eq!(text.data, bytes.data);
    }

    #[tokio::test]
    async fn test_keys_do_not_collide_after_sanitising() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path().to_path_buf());

        store.put("a/b", "slash".into(), &meta()).await.unwrap();
        store.put("a_b", "underscore".into(), &meta()).await.unwrap();

        assert_eq!(store.get("a/b").await.unwrap().unwrap().data, b"slash");
        assert_eq!(store.get("a_b").await.unwrap().unwrap().data, b"underscore");
    }

    #[tokio::test]
    async fn test_missing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path().join("never-created"));

        assert!(store.get("missing").await.unwrap().is_none());
        assert!(store.head("missing").await.unwrap().is_none());
        assert!(matches!(
            store.delete("missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_factory_uses_bucket_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FilesystemStoreFactory::new(dir.path().to_path_buf());
        let store = factory
            .connect(&CacheConfig::new("responses"))
            .await
            .unwrap();

        store.put("k", "v".into(), &meta()).await.unwrap();
        let fs = bucketcache_core::downcast_store::<FilesystemBlobStore>(store.as_ref()).unwrap();
        assert_eq!(fs.root_dir(), dir.path().join("responses"));
    }
}
