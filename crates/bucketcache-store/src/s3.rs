//! S3-compatible blob store (AWS S3, Cloudflare R2, MinIO).

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use bucketcache_core::{
    BlobBody, BlobMetadata, BlobStore, BlobStoreFactory, CacheConfig, Error, Result, StoredBlob,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Blob store over one S3 bucket. The creation timestamp is kept in the
/// object's user metadata (`x-amz-meta-created-at`).
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// The underlying SDK client, for operations this crate does not wrap.
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn map_sdk_error<E, R>(operation: &str, key: &str, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = format!("s3 {} {}: {}", operation, key, DisplayErrorContext(&err));
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => Error::Network(message),
        _ => Error::Backend(message),
    }
}

fn metadata_from(
    user_metadata: Option<&HashMap<String, String>>,
    content_type: Option<&str>,
) -> Result<BlobMetadata> {
    let empty = HashMap::new();
    BlobMetadata::from_map(
        user_metadata.unwrap_or(&empty),
        content_type.map(str::to_string),
    )
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => return Ok(None),
            Err(err) => return Err(map_sdk_error("get", key, err)),
        };

        let metadata = metadata_from(output.metadata(), output.content_type())?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(format!("s3 get {}: {}", key, e)))?
            .into_bytes()
            .to_vec();

        Ok(Some(StoredBlob { data, metadata }))
    }

    async fn put(&self, key: &str, body: BlobBody, metadata: &BlobMetadata) -> Result<()> {
        let content_type = metadata
            .content_type
            .clone()
            .unwrap_or_else(|| body.content_type().to_string());

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type);
        for (name, value) in metadata.to_map() {
            request = request.metadata(name, value);
        }

        let stream = match body {
            BlobBody::Text(text) => ByteStream::from(text.into_bytes()),
            BlobBody::Bytes(bytes) => ByteStream::from(bytes),
        };

        request
            .body(stream)
            .send()
            .await
            .map_err(|e| map_sdk_error("put", key, e))?;
        debug!(bucket = %self.bucket, key = %key, "s3 object written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // DeleteObject succeeds for absent keys, so check existence first.
        // Metadata is not parsed here so entries with a bad timestamp stay removable.
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => {}
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(err) => return Err(map_sdk_error("delete", key, err)),
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error("delete", key, e))?;
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<Option<BlobMetadata>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => Ok(Some(metadata_from(
                output.metadata(),
                output.content_type(),
            )?)),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(None),
            Err(err) => Err(map_sdk_error("head", key, err)),
        }
    }

    fn name(&self) -> &str {
        "s3"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds an S3 client per context, applying the configured timeout and
/// retry count to the SDK's own retry machinery.
#[derive(Clone)]
pub struct S3StoreFactory {
    base: aws_sdk_s3::config::Builder,
}

impl S3StoreFactory {
    /// Start from a shared AWS configuration.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            base: aws_sdk_s3::config::Builder::from(sdk_config),
        }
    }

    /// Load credentials and region from the standard AWS provider chain.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(&sdk_config)
    }

    /// Static credentials against a custom endpoint, e.g. MinIO.
    pub fn with_static_credentials(
        endpoint_url: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(
            access_key.into(),
            secret_key.into(),
            None,
            None,
            "bucketcache-static",
        );
        let base = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            .endpoint_url(endpoint_url)
            .force_path_style(true);
        Self { base }
    }

    pub fn with_endpoint(mut self, endpoint_url: impl Into<String>) -> Self {
        self.base = self.base.endpoint_url(endpoint_url);
        self
    }

    pub fn with_path_style(mut self, enabled: bool) -> Self {
        self.base = self.base.force_path_style(enabled);
        self
    }

    pub fn client_config(&self, config: &CacheConfig) -> aws_sdk_s3::Config {
        self.base
            .clone()
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_attempt_timeout(config.timeout())
                    .build(),
            )
            .retry_config(RetryConfig::standard().with_max_attempts(config.num_retries + 1))
            .build()
    }
}

#[async_trait]
impl BlobStoreFactory for S3StoreFactory {
    async fn connect(&self, config: &CacheConfig) -> Result<Arc<dyn BlobStore>> {
        config.validate()?;
        let client = Client::from_conf(self.client_config(config));
        debug!(bucket = %config.bucket_name, "s3 client built");
        Ok(Arc::new(S3BlobStore::new(client, &config.bucket_name)))
    }
}
