//! The response cache facade.

use bucketcache_core::{
    BlobStoreFactory, CacheConfig, CacheDecision, Clock, Error, Lookup, Result, SetOutcome,
    SystemClock,
};
use bucketcache_store::ExpiringStore;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::keys::KeyDeriver;
use crate::policy::{CachePolicy, DefaultPolicy};
use crate::record::CachedRecord;
use crate::response::{CachedResponse, HttpResponse};

struct Shared {
    config: CacheConfig,
    keys: KeyDeriver,
    policy: Arc<dyn CachePolicy>,
    factory: Arc<dyn BlobStoreFactory>,
    clock: Arc<dyn Clock>,
}

/// Shared cache handle. Cheap to clone; hand one to every worker and take a
/// [`CacheContext`] per request.
#[derive(Clone)]
pub struct ResponseCache {
    shared: Arc<Shared>,
}

impl ResponseCache {
    /// Cache with the constant-TTL default policy and the wall clock.
    pub fn new(config: CacheConfig, factory: Arc<dyn BlobStoreFactory>) -> Self {
        Self::builder(config, factory).build()
    }

    pub fn builder(config: CacheConfig, factory: Arc<dyn BlobStoreFactory>) -> ResponseCacheBuilder {
        ResponseCacheBuilder {
            config,
            factory,
            policy: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    /// Storage key for a request under the configured strategy.
    pub fn cache_key(&self, service: &str, url: &str) -> Result<String> {
        self.shared.keys.derive(service, url)
    }

    /// A fresh context owning its own backend handle.
    pub fn context(&self) -> CacheContext {
        CacheContext {
            shared: Arc::clone(&self.shared),
            store: OnceCell::new(),
        }
    }
}

pub struct ResponseCacheBuilder {
    config: CacheConfig,
    factory: Arc<dyn BlobStoreFactory>,
    policy: Option<Arc<dyn CachePolicy>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ResponseCacheBuilder {
    pub fn policy(mut self, policy: impl CachePolicy + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> ResponseCache {
        let policy = self
            .policy
            .unwrap_or_else(|| Arc::new(DefaultPolicy::from_config(&self.config)));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        ResponseCache {
            shared: Arc::new(Shared {
                keys: KeyDeriver::from_config(&self.config),
                config: self.config,
                policy,
                factory: self.factory,
                clock,
            }),
        }
    }
}

/// Per-request (or per-task) cache access. The backend handle is created on
/// first use and dropped with the context.
pub struct CacheContext {
    shared: Arc<Shared>,
    store: OnceCell<ExpiringStore>,
}

impl CacheContext {
    async fn expiring_store(&self) -> Result<&ExpiringStore> {
        self.store
            .get_or_try_init(|| async {
                let backend = self.shared.factory.connect(&self.shared.config).await?;
                debug!(backend = backend.name(), "cache backend connected");
                Ok::<_, Error>(ExpiringStore::new(
                    backend,
                    &self.shared.config,
                    Arc::clone(&self.shared.clock),
                ))
            })
            .await
    }

    /// Whether this context has built its backend handle yet.
    pub fn is_connected(&self) -> bool {
        self.store.initialized()
    }

    /// Look up a cached response. Misses, expired entries and transient
    /// backend failures all return `Ok(None)`; a corrupt record or an
    /// invalid URL is an error.
    pub async fn lookup(&self, service: &str, url: &str) -> Result<Option<CachedResponse>> {
        let Some(ttl) = self.shared.policy.expiration(service, url, None).ttl() else {
            debug!(service, url, "caching disabled by policy");
            return Ok(None);
        };

        let key = self.shared.keys.derive(service, url)?;
        let store = match self.expiring_store().await {
            Ok(store) => store,
            Err(err) if err.is_transient() => {
                error!(service, url, error = %err, "cache backend unavailable");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match store.logged().get::<CachedRecord>(&key, ttl).await? {
            Lookup::Hit(record) => record.into_response().map(Some),
            Lookup::Miss | Lookup::Expired { .. } => Ok(None),
        }
    }

    /// Write a response through to the cache. Never fails the caller:
    /// storage errors are logged with the request URL.
    pub async fn store<R: HttpResponse + ?Sized>(
        &self,
        service: &str,
        url: &str,
        response: &R,
    ) -> SetOutcome {
        let decision = self
            .shared
            .policy
            .expiration(service, url, Some(response.status()));
        if decision == CacheDecision::DoNotCache {
            debug!(service, url, status = response.status(), "response not cacheable");
            return SetOutcome::Skipped;
        }

        match self.try_store(service, url, response, decision).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(service, url, error = %err, "cache set failed");
                SetOutcome::Skipped
            }
        }
    }

    /// Alias of [`CacheContext::store`] for response-processing hooks.
    pub async fn process_response<R: HttpResponse + ?Sized>(
        &self,
        service: &str,
        url: &str,
        response: &R,
    ) -> SetOutcome {
        self.store(service, url, response).await
    }

    async fn try_store<R: HttpResponse + ?Sized>(
        &self,
        service: &str,
        url: &str,
        response: &R,
        decision: CacheDecision,
    ) -> Result<SetOutcome> {
        let key = self.shared.keys.derive(service, url)?;
        let record = CachedRecord::from_response(response);
        // Bypasses the logged store so failures are reported with the URL.
        self.expiring_store()
            .await?
            .set(&key, &record, decision)
            .await
    }

    /// Remove a cached response. Missing entries and transient failures are
    /// logged, not raised.
    pub async fn invalidate(&self, service: &str, url: &str) -> Result<()> {
        let key = self.shared.keys.derive(service, url)?;
        let store = match self.expiring_store().await {
            Ok(store) => store,
            Err(err) if err.is_transient() => {
                error!(service, url, error = %err, "cache backend unavailable");
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        store.logged().delete(&key).await
    }
}

impl std::fmt::Debug for CacheContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("bucket", &self.shared.config.bucket_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bucketcache_core::{BlobStore, ManualClock, Ttl};
    use bucketcache_store::{MemoryBlobStore, MemoryStoreFactory};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        inner: MemoryStoreFactory,
        connects: AtomicUsize,
    }

    #[async_trait]
    impl BlobStoreFactory for CountingFactory {
        async fn connect(&self, config: &CacheConfig) -> Result<Arc<dyn BlobStore>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.inner.connect(config).await
        }
    }

    struct Unreachable;

    #[async_trait]
    impl BlobStoreFactory for Unreachable {
        async fn connect(&self, _config: &CacheConfig) -> Result<Arc<dyn BlobStore>> {
            Err(Error::Network("dns lookup failed".into()))
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn cache_with(backend: &MemoryBlobStore, clock: &ManualClock) -> ResponseCache {
        ResponseCache::builder(
            CacheConfig::new("responses"),
            Arc::new(MemoryStoreFactory::new(backend.clone())),
        )
        .policy(DefaultPolicy::new(CacheDecision::seconds(60)))
        .clock(clock.clone())
        .build()
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let backend = MemoryBlobStore::new();
        let clock = clock();
        let ctx = cache_with(&backend, &clock).context();

        let response = CachedResponse::new(200, "x");
        assert_eq!(
            ctx.store("abc", "/api/v1/test", &response).await,
            SetOutcome::Written
        );

        let hit = ctx.lookup("abc", "/api/v1/test").await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.read(), b"x");

        clock.advance(Duration::seconds(61));
        assert!(ctx.lookup("abc", "/api/v1/test").await.unwrap().is_none());
        assert!(backend.contains("abc/api/v1/test").await);
    }

    #[tokio::test]
    async fn test_context_connects_lazily_once() {
        let factory = Arc::new(CountingFactory {
            inner: MemoryStoreFactory::default(),
            connects: AtomicUsize::new(0),
        });
        let cache = ResponseCache::new(CacheConfig::new("responses"), factory.clone());

        let ctx = cache.context();
        assert!(!ctx.is_connected());
        ctx.lookup("abc", "/a").await.unwrap();
        ctx.store("abc", "/a", &CachedResponse::new(200, "a")).await;
        ctx.invalidate("abc", "/a").await.unwrap();
        assert!(ctx.is_connected());
        assert_eq!(factory.connects.load(Ordering::SeqCst), 1);

        let other = cache.context();
        other.lookup("abc", "/a").await.unwrap();
        assert_eq!(factory.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_do_not_cache_never_connects() {
        let factory = Arc::new(CountingFactory {
            inner: MemoryStoreFactory::default(),
            connects: AtomicUsize::new(0),
        });
        let cache = ResponseCache::builder(CacheConfig::new("responses"), factory.clone())
            .policy(DefaultPolicy::new(CacheDecision::DoNotCache))
            .build();
        let ctx = cache.context();

        let outcome = ctx.store("abc", "/a", &CachedResponse::new(200, "a")).await;
        assert_eq!(outcome, SetOutcome::Skipped);
        assert!(ctx.lookup("abc", "/a").await.unwrap().is_none());
        assert_eq!(factory.connects.load(Ordering::SeqCst), 0);
        assert!(factory.inner.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades() {
        let cache = ResponseCache::new(CacheConfig::new("responses"), Arc::new(Unreachable));
        let ctx = cache.context();

        assert!(ctx.lookup("abc", "/a").await.unwrap().is_none());
        assert_eq!(
            ctx.store("abc", "/a", &CachedResponse::new(200, "a")).await,
            SetOutcome::Skipped
        );
        ctx.invalidate("abc", "/a").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_missing_is_ok() {
        let backend = MemoryBlobStore::new();
        let ctx = cache_with(&backend, &clock()).context();
        ctx.invalidate("abc", "/never/stored").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let backend = MemoryBlobStore::new();
        let ctx = cache_with(&backend, &clock()).context();

        ctx.store("abc", "/a?b=1", &CachedResponse::new(200, "a")).await;
        ctx.invalidate("abc", "/a?b=1").await.unwrap();
        assert!(ctx.lookup("abc", "/a?b=1").await.unwrap().is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_record_propagates() {
        let backend = MemoryBlobStore::new();
        let clock = clock();
        let cache = cache_with(&backend, &clock);
        let key = cache.cache_key("abc", "/a").unwrap();

        let store = ExpiringStore::new(
            Arc::new(backend.clone()),
            cache.config(),
            Arc::new(clock.clone()),
        );
        store
            .set_raw(&key, "[1, 2".into(), CacheDecision::forever())
            .await
            .unwrap();

        let err = cache.context().lookup("abc", "/a").await.unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let backend = MemoryBlobStore::new();
        let ctx = cache_with(&backend, &clock()).context();
        assert!(matches!(
            ctx.lookup("abc", "http://[::1").await,
            Err(Error::InvalidUrl(_))
        ));
        assert_eq!(
            ctx.store("abc", "http://[::1", &CachedResponse::new(200, "a")).await,
            SetOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_status_policy_applies_on_write() {
        let backend = MemoryBlobStore::new();
        let cache = ResponseCache::builder(
            CacheConfig::new("responses"),
            Arc::new(MemoryStoreFactory::new(backend.clone())),
        )
        .policy(crate::RulePolicy::new(CacheDecision::forever()).skip_status("abc", 404))
        .build();
        let ctx = cache.context();

        ctx.store("abc", "/missing", &CachedResponse::new(404, "")).await;
        ctx.store("xyz", "/missing", &CachedResponse::new(404, "")).await;

        assert!(ctx.lookup("abc", "/missing").await.unwrap().is_none());
        assert_eq!(
            ctx.lookup("xyz", "/missing").await.unwrap().unwrap().status,
            404
        );
        assert_eq!(backend.stats().puts, 1);
    }

    #[tokio::test]
    async fn test_lookup_ttl_comes_from_policy() {
        let backend = MemoryBlobStore::new();
        let clock = clock();
        let ctx = cache_with(&backend, &clock).context();
        ctx.store("abc", "/a", &CachedResponse::new(200, "a")).await;

        clock.advance(Duration::seconds(60));
        assert!(ctx.lookup("abc", "/a").await.unwrap().is_some());

        let forever = ResponseCache::builder(
            CacheConfig::new("responses"),
            Arc::new(MemoryStoreFactory::new(backend.clone())),
        )
        .policy(DefaultPolicy::new(CacheDecision::Cache(Ttl::Forever)))
        .clock(clock.clone())
        .build();
        clock.advance(Duration::days(30));
        assert!(forever.context().lookup("abc", "/a").await.unwrap().is_some());
    }
}
