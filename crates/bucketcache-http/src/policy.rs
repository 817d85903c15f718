//! Cache policies decide, per service, URL and response status, whether
//! and for how long a response is cached. Lookups consult the policy with
//! no status before touching storage.

use bucketcache_core::{CacheConfig, CacheDecision};
use std::collections::{HashMap, HashSet};

pub trait CachePolicy: Send + Sync {
    fn expiration(&self, service: &str, url: &str, status: Option<u16>) -> CacheDecision;
}

impl<F> CachePolicy for F
where
    F: Fn(&str, &str, Option<u16>) -> CacheDecision + Send + Sync,
{
    fn expiration(&self, service: &str, url: &str, status: Option<u16>) -> CacheDecision {
        self(service, url, status)
    }
}

/// The same decision for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPolicy {
    decision: CacheDecision,
}

impl DefaultPolicy {
    pub fn new(decision: CacheDecision) -> Self {
        Self { decision }
    }

    /// Cache everything for `default_ttl_secs` (zero caches forever).
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(CacheDecision::seconds(config.default_ttl_secs))
    }
}

impl CachePolicy for DefaultPolicy {
    fn expiration(&self, _service: &str, _url: &str, _status: Option<u16>) -> CacheDecision {
        self.decision
    }
}

/// Per-service decisions with per-status exclusions.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    fallback: CacheDecision,
    services: HashMap<String, CacheDecision>,
    skipped_statuses: HashMap<String, HashSet<u16>>,
}

impl RulePolicy {
    pub fn new(fallback: CacheDecision) -> Self {
        Self {
            fallback,
            services: HashMap::new(),
            skipped_statuses: HashMap::new(),
        }
    }

    pub fn service(mut self, service: impl Into<String>, decision: CacheDecision) -> Self {
        self.services.insert(service.into(), decision);
        self
    }

    /// Never cache responses with `status` for `service`.
    pub fn skip_status(mut self, service: impl Into<String>, status: u16) -> Self {
        self.skipped_statuses
            .entry(service.into())
            .or_default()
            .insert(status);
        self
    }
}

impl CachePolicy for RulePolicy {
    fn expiration(&self, service: &str, _url: &str, status: Option<u16>) -> CacheDecision {
        if let Some(status) = status {
            if self
                .skipped_statuses
                .get(service)
                .is_some_and(|statuses| statuses.contains(&status))
            {
                return CacheDecision::DoNotCache;
            }
        }
        self.services
            .get(service)
            .copied()
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_uses_configured_ttl() {
        let policy = DefaultPolicy::from_config(&CacheConfig::default().with_default_ttl(3600));
        assert_eq!(
            policy.expiration("abc", "/api/v1/test", Some(200)),
            CacheDecision::seconds(3600)
        );

        let forever = DefaultPolicy::from_config(&CacheConfig::default());
        assert_eq!(forever.expiration("abc", "/", None), CacheDecision::forever());
    }

    #[test]
    fn test_rule_policy() {
        let policy = RulePolicy::new(CacheDecision::forever())
            .service("abc", CacheDecision::seconds(60))
            .skip_status("abc", 404);

        assert_eq!(
            policy.expiration("xyz", "/api/v1/test", None),
            CacheDecision::forever()
        );
        assert_eq!(
            policy.expiration("abc", "/api/v1/test", Some(200)),
            CacheDecision::seconds(60)
        );
        assert_eq!(
            policy.expiration("abc", "/api/v1/test", None),
            CacheDecision::seconds(60)
        );
        assert_eq!(
            policy.expiration("abc", "/api/v1/test", Some(404)),
            CacheDecision::DoNotCache
        );
        assert_eq!(
            policy.expiration("xyz", "/api/v1/test", Some(404)),
            CacheDecision::forever()
        );
    }

    #[test]
    fn test_closure_policy() {
        let policy = |_: &str, url: &str, _: Option<u16>| {
            if url.starts_with("/private") {
                CacheDecision::DoNotCache
            } else {
                CacheDecision::seconds(5)
            }
        };
        assert_eq!(
            policy.expiration("abc", "/private/x", None),
            CacheDecision::DoNotCache
        );
        assert_eq!(policy.expiration("abc", "/x", None), CacheDecision::seconds(5));
    }
}
