//! Integration test infrastructure for bucketcache.
//!
//! Provides fixtures, a fault-injecting blob store and a MinIO
//! testcontainer for exercising the S3 backend.
//!
//! # Usage
//!
//! ```ignore
//! use bucketcache_tests::{init_test_logging, memory_cache};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     init_test_logging();
//!     let (cache, backend, clock) = memory_cache(60);
//!     // ...
//! }
//! ```

pub mod containers;
pub mod faults;
pub mod fixtures;

pub use faults::{FailingBlobStore, FailingStoreFactory, Fault};
pub use fixtures::*;

/// Log directives used when `RUST_LOG` is unset.
pub const DEFAULT_TEST_FILTER: &str = "warn,bucketcache_store=debug,bucketcache_http=debug";

/// Initialize test logging with [`DEFAULT_TEST_FILTER`]. Safe to call from
/// every test; only the first call installs a subscriber.
pub fn init_test_logging() {
    init_test_logging_with(DEFAULT_TEST_FILTER);
}

/// Initialize test logging with explicit directives, still overridable by
/// `RUST_LOG`. Returns whether this call installed the subscriber.
pub fn init_test_logging_with(directives: &str) -> bool {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init()
        .is_ok()
}
