//! HTTP response shapes on both sides of the cache.

use std::collections::BTreeMap;

/// A response the cache can store: status, headers and body bytes.
pub trait HttpResponse {
    fn status(&self) -> u16;

    /// Header name/value pairs in arrival order. Names may repeat.
    fn headers(&self) -> Vec<(&str, &str)>;

    fn body(&self) -> &[u8];
}

/// A response rebuilt from a cache hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub data: Vec<u8>,
}

impl CachedResponse {
    pub fn new(status: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data: data.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The response body.
    pub fn read(&self) -> &[u8] {
        &self.data
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup with a fallback value.
    pub fn get_header<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.header(name).unwrap_or(default)
    }
}

impl HttpResponse for CachedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    fn body(&self) -> &[u8] {
        &self.data
    }
}
