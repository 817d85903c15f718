//! bucketcache core
//!
//! Error handling, configuration, blob and TTL types, and the port traits
//! that the storage adapters and the response cache are built on.

pub mod blob;
pub mod clock;
pub mod config;
pub mod error;
pub mod ports;
pub mod ttl;

pub use blob::{BlobBody, BlobMetadata, StoredBlob};
pub use clock::{ManualClock, SystemClock};
pub use config::{CacheConfig, KeyStrategy};
pub use error::{Error, Result};
pub use ports::{BlobStore, BlobStoreFactory, Clock, downcast_store};
pub use ttl::{CacheDecision, Lookup, SetOutcome, Ttl};
