//! Cache key derivation.
//!
//! Keys are a compatibility contract between deployments that read and
//! write the same bucket; the composition rules below must not change.
//!
//! Path strategy: `[base/]service/path[?query]`. The URL is parsed relative
//! to a dummy origin, so scheme and host are ignored, the fragment is
//! dropped, dot segments are resolved and unsafe characters are
//! percent-encoded. A parsed path is never empty, so a query-only URL such
//! as `?p=1` yields `service/?p=1`.
//!
//! Service names are used verbatim. A service containing `/` shares the
//! key space of its parent, so `("a/b", "/c")` and `("a", "/b/c")` map to
//! the same key.
//!
//! Hashed strategy: `[base/]service-<sha256(path[?query])>`.

use bucketcache_core::{CacheConfig, Error, KeyStrategy, Result};
use sha2::{Digest, Sha256};
use url::Url;

const DUMMY_ORIGIN: &str = "http://localhost/";

fn split_url(url: &str) -> Result<(String, String)> {
    let base = Url::parse(DUMMY_ORIGIN).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let parsed = base
        .join(url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    Ok((
        parsed.path().to_string(),
        parsed.query().unwrap_or_default().to_string(),
    ))
}

fn key_prefix(service: &str, base_path: &str) -> String {
    let base = base_path.trim_matches('/');
    if base.is_empty() {
        service.to_string()
    } else {
        format!("{}/{}", base, service)
    }
}

/// Derive a readable storage key from a service name and request URL.
pub fn derive_key(service: &str, url: &str, base_path: &str) -> Result<String> {
    let (path, query) = split_url(url)?;
    let mut key = format!(
        "{}/{}",
        key_prefix(service, base_path),
        path.trim_start_matches('/')
    );
    if !path.is_empty() && !query.is_empty() {
        key.push('?');
        key.push_str(&query);
    }
    Ok(key)
}

/// Derive a fixed-length storage key from a service name and request URL.
pub fn derive_hashed_key(service: &str, url: &str, base_path: &str) -> Result<String> {
    let (path, query) = split_url(url)?;
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    if !query.is_empty() {
        hasher.update(b"?");
        hasher.update(query.as_bytes());
    }
    Ok(format!(
        "{}-{}",
        key_prefix(service, base_path),
        hex::encode(hasher.finalize())
    ))
}

/// Key derivation bound to a configured strategy and base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDeriver {
    strategy: KeyStrategy,
    base_path: String,
}

impl KeyDeriver {
    pub fn new(strategy: KeyStrategy, base_path: impl Into<String>) -> Self {
        Self {
            strategy,
            base_path: base_path.into(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.key_strategy, config.base_path.clone())
    }

    pub fn derive(&self, service: &str, url: &str) -> Result<String> {
        match self.strategy {
            KeyStrategy::Path => derive_key(service, url, &self.base_path),
            KeyStrategy::Hashed => derive_hashed_key(service, url, &self.base_path),
        }
    }
}
