//! Cache configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix used by [`CacheConfig::from_env`].
pub const ENV_PREFIX: &str = "BUCKETCACHE";

/// How storage keys are derived from a (service, url) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// `service/path?query`, readable and prefix-listable.
    #[default]
    Path,
    /// `service-<sha256>`, fixed length.
    Hashed,
}

/// Configuration for the cache and its backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Bucket holding cache entries.
    #[serde(default)]
    pub bucket_name: String,
    /// Overwrite existing entries on write. When false the first write wins.
    #[serde(default = "default_replace")]
    pub replace: bool,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Retries handed to the backend client.
    #[serde(default = "default_num_retries")]
    pub num_retries: u32,
    /// TTL used by the default policy. Zero caches forever.
    #[serde(default)]
    pub default_ttl_secs: u64,
    /// Prefix prepended to every key.
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub key_strategy: KeyStrategy,
}

fn default_replace() -> bool {
    true
}

fn default_timeout() -> u64 {
    5
}

fn default_num_retries() -> u32 {
    3
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            replace: default_replace(),
            timeout_secs: default_timeout(),
            num_retries: default_num_retries(),
            default_ttl_secs: 0,
            base_path: String::new(),
            key_strategy: KeyStrategy::default(),
        }
    }
}

impl CacheConfig {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from `BUCKETCACHE_*` environment variables.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup("BUCKET_NAME") {
            config.bucket_name = v;
        }
        if let Some(v) = lookup("REPLACE") {
            config.replace = parse_bool("REPLACE", &v)?;
        }
        if let Some(v) = lookup("TIMEOUT") {
            config.timeout_secs = parse_number("TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("NUM_RETRIES") {
            config.num_retries = parse_number("NUM_RETRIES", &v)?;
        }
        if let Some(v) = lookup("DEFAULT_EXPIRY") {
            config.default_ttl_secs = parse_number("DEFAULT_EXPIRY", &v)?;
        }
        if let Some(v) = lookup("BASE_PATH") {
            config.base_path = v;
        }
        if let Some(v) = lookup("KEY_STRATEGY") {
            config.key_strategy = match v.to_ascii_lowercase().as_str() {
                "path" => KeyStrategy::Path,
                "hashed" => KeyStrategy::Hashed,
                _ => {
                    return Err(Error::Config(format!(
                        "{}_KEY_STRATEGY: unknown strategy '{}'",
                        ENV_PREFIX, v
                    )));
                }
            };
        }
        Ok(config)
    }

    /// Check fields required by remote backends.
    pub fn validate(&self) -> Result<()> {
        if self.bucket_name.trim().is_empty() {
            return Err(Error::Config("bucket_name must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_num_retries(mut self, retries: u32) -> Self {
        self.num_retries = retries;
        self
    }

    pub fn with_default_ttl(mut self, secs: u64) -> Self {
        self.default_ttl_secs = secs;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{}_{}: expected a boolean, got '{}'",
            ENV_PREFIX, name, value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!(
            "{}_{}: expected a number, got '{}'",
            ENV_PREFIX, name, value
        ))
    })
}
