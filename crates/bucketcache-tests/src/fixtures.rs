//! Shared test fixtures.

use bucketcache_core::{CacheConfig, CacheDecision, ManualClock};
use bucketcache_http::{CachedResponse, DefaultPolicy, ResponseCache};
use bucketcache_store::{MemoryBlobStore, MemoryStoreFactory};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

pub const TEST_BUCKET: &str = "bucketcache-test";

/// A clock pinned to a fixed instant.
pub fn test_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap())
}

/// A cache over an in-memory backend with a constant TTL policy.
pub fn memory_cache(ttl_secs: u64) -> (ResponseCache, MemoryBlobStore, ManualClock) {
    let backend = MemoryBlobStore::new();
    let clock = test_clock();
    let cache = ResponseCache::builder(
        CacheConfig::new(TEST_BUCKET).with_default_ttl(ttl_secs),
        Arc::new(MemoryStoreFactory::new(backend.clone())),
    )
    .policy(DefaultPolicy::new(CacheDecision::seconds(ttl_secs)))
    .clock(clock.clone())
    .build();
    (cache, backend, clock)
}

/// A JSON response like the ones web service clients cache.
pub fn json_response() -> CachedResponse {
    CachedResponse::new(200, r#"{"key1": "value1", "key2": "value2"}"#)
        .with_header("Content-Type", "application/json")
        .with_header("Content-Disposition", "attachment; filename='fname.ext'")
}

/// A response with a body that is not valid UTF-8.
pub fn binary_response() -> CachedResponse {
    CachedResponse::new(200, vec![0x1f, 0x8b, 0x08, 0x00, 0xff, 0xfe, 0x00, 0x7f])
        .with_header("Content-Type", "application/gzip")
}
