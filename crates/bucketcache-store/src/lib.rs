//! Storage for bucketcache: blob store adapters (memory, filesystem, S3)
//! and the TTL-aware cache store built on top of them.

pub mod expiring;
pub mod filesystem;
pub mod logged;
pub mod memory;
pub mod s3;

pub use expiring::ExpiringStore;
pub use filesystem::{FilesystemBlobStore, FilesystemStoreFactory};
pub use logged::LoggedStore;
pub use memory::{MemoryBlobStore, MemoryStoreFactory, StoreStats};
pub use s3::{S3BlobStore, S3StoreFactory};
