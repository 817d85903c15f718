//! Expiration types.

use chrono::Duration as ChronoDuration;
use std::time::Duration;

/// How long a stored entry stays fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Never expires.
    Forever,
    /// Fresh while its age is at most this duration.
    After(Duration),
}

impl Ttl {
    /// Zero means no expiry.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Ttl::Forever
        } else {
            Ttl::After(Duration::from_secs(secs))
        }
    }

    /// Fractional seconds. Zero, negative, non-finite and out of range
    /// values mean no expiry.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs > 0.0 {
            Duration::try_from_secs_f64(secs)
                .map(Ttl::After)
                .unwrap_or(Ttl::Forever)
        } else {
            Ttl::Forever
        }
    }

    /// Whether an entry of the given age is still fresh. Negative ages
    /// (clock skew) count as zero.
    pub fn is_fresh(&self, age: ChronoDuration) -> bool {
        match self {
            Ttl::Forever => true,
            Ttl::After(ttl) => {
                let age = age.to_std().unwrap_or(Duration::ZERO);
                age <= *ttl
            }
        }
    }
}

/// Result of consulting a cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Cache(Ttl),
    DoNotCache,
}

impl CacheDecision {
    pub fn seconds(secs: u64) -> Self {
        CacheDecision::Cache(Ttl::from_secs(secs))
    }

    pub fn forever() -> Self {
        CacheDecision::Cache(Ttl::Forever)
    }

    pub fn ttl(&self) -> Option<Ttl> {
        match self {
            CacheDecision::Cache(ttl) => Some(*ttl),
            CacheDecision::DoNotCache => None,
        }
    }
}

/// Outcome of a read against the expiring store.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Hit(T),
    Miss,
    /// Present but older than the requested TTL. The entry is left in place.
    Expired { age: ChronoDuration },
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn into_hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Hit(value) => Lookup::Hit(f(value)),
            Lookup::Miss => Lookup::Miss,
            Lookup::Expired { age } => Lookup::Expired { age },
        }
    }
}

/// Outcome of a write against the expiring store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Written,
    /// An entry already existed and the store keeps the first write.
    Preserved,
    /// The policy said not to cache.
    Skipped,
}
