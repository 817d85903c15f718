//! HTTP response caching over an object-storage bucket.
//!
//! A [`ResponseCache`] is built once from a [`CacheConfig`], a backend
//! factory and a [`CachePolicy`]. Each request or worker task takes its own
//! [`CacheContext`], which connects to the backend on first use.
//!
//! ```ignore
//! let cache = ResponseCache::new(config, Arc::new(S3StoreFactory::from_env().await));
//! let ctx = cache.context();
//! if let Some(hit) = ctx.lookup("sws", "/student/v5/term/current.json").await? {
//!     return Ok(hit);
//! }
//! let response = fetch().await?;
//! ctx.store("sws", "/student/v5/term/current.json", &response).await;
//! ```

pub mod cache;
pub mod keys;
pub mod policy;
pub mod record;
pub mod response;

pub use bucketcache_core::{CacheConfig, CacheDecision, Error, KeyStrategy, Result, Ttl};
pub use cache::{CacheContext, ResponseCache, ResponseCacheBuilder};
pub use keys::{KeyDeriver, derive_hashed_key, derive_key};
pub use policy::{CachePolicy, DefaultPolicy, RulePolicy};
pub use record::{BodyEncoding, CachedRecord};
pub use response::{CachedResponse, HttpResponse};
