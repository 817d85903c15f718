//! Testcontainer configuration for S3 integration tests.

use aws_sdk_s3::Client;
use bucketcache_core::CacheConfig;
use bucketcache_store::S3StoreFactory;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::minio::MinIO;

/// MinIO container standing in for a remote bucket.
pub struct MinioContainer {
    #[allow(dead_code)] // Kept to maintain container lifetime
    container: ContainerAsync<MinIO>,
    endpoint: String,
    access_key: String,
    secret_key: String,
}

impl MinioContainer {
    pub async fn start() -> anyhow::Result<Self> {
        let container = MinIO::default().with_tag("latest").start().await?;

        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(9000).await?;

        Ok(Self {
            container,
            endpoint: format!("http://{}:{}", host, port),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// A store factory pointed at this container.
    pub fn factory(&self) -> S3StoreFactory {
        S3StoreFactory::with_static_credentials(
            &self.endpoint,
            &self.access_key,
            &self.secret_key,
            "us-east-1",
        )
    }

    /// Create a bucket and return a config that uses it.
    pub async fn create_bucket(&self, name: &str) -> anyhow::Result<CacheConfig> {
        let config = CacheConfig::new(name);
        let client = Client::from_conf(self.factory().client_config(&config));
        client.create_bucket().bucket(name).send().await?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_minio_container_starts() {
        let minio = MinioContainer::start().await.unwrap();
        assert!(minio.endpoint().contains("http://"));
    }
}
