//! Persisted form of a cached response.
//!
//! Stored as JSON: `{"status": 200, "headers": {..}, "data": "..."}`.
//! Bodies that are valid UTF-8 are stored as-is; anything else is base64
//! (standard alphabet) and marked with `"encoding": "base64"`, so binary
//! bodies round-trip exactly.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bucketcache_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::response::{CachedResponse, HttpResponse};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    Base64,
}

impl BodyEncoding {
    fn is_utf8(&self) -> bool {
        *self == BodyEncoding::Utf8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "BodyEncoding::is_utf8")]
    pub encoding: BodyEncoding,
}

impl CachedRecord {
    /// Capture a response. Header names that differ only by case are merged
    /// under the first spelling seen, values joined with `", "`.
    pub fn from_response<R: HttpResponse + ?Sized>(response: &R) -> Self {
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Some((_, joined)) = headers
                .iter_mut()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
            {
                joined.push_str(", ");
                joined.push_str(value);
                continue;
            }
            headers.insert(name.to_string(), value.to_string());
        }

        let (data, encoding) = match std::str::from_utf8(response.body()) {
            Ok(text) => (text.to_string(), BodyEncoding::Utf8),
            Err(_) => (STANDARD.encode(response.body()), BodyEncoding::Base64),
        };

        Self {
            status: response.status(),
            headers,
            data,
            encoding,
        }
    }

    pub fn into_response(self) -> Result<CachedResponse> {
        let data = match self.encoding {
            BodyEncoding::Utf8 => self.data.into_bytes(),
            BodyEncoding::Base64 => STANDARD
                .decode(self.data.as_bytes())
                .map_err(|e| Error::Malformed(format!("invalid base64 body: {}", e)))?,
        };
        Ok(CachedResponse {
            status: self.status,
            headers: self.headers,
            data,
        })
    }
}
