//! Blob types exchanged with storage backends.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key holding the creation timestamp.
pub const CREATED_AT_KEY: &str = "created-at";

/// Out-of-band metadata stored next to a blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// MIME type of the stored bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl BlobMetadata {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Flatten into string pairs for backends with user metadata headers.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(CREATED_AT_KEY.to_string(), self.created_at.to_rfc3339());
        map
    }

    /// Rebuild from user metadata. The content type travels separately.
    pub fn from_map(
        map: &HashMap<String, String>,
        content_type: Option<String>,
    ) -> Result<Self> {
        let raw = map
            .get(CREATED_AT_KEY)
            .ok_or_else(|| Error::Malformed(format!("missing {} metadata", CREATED_AT_KEY)))?;
        let created_at = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| Error::Malformed(format!("invalid {}: {}", CREATED_AT_KEY, e)))?
            .with_timezone(&Utc);
        Ok(Self {
            created_at,
            content_type,
        })
    }
}

/// Content handed to a backend for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobBody {
    /// Uploaded through the string path.
    Text(String),
    /// Uploaded through the streaming path.
    Bytes(Vec<u8>),
}

impl BlobBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BlobBody::Text(s) => s.as_bytes(),
            BlobBody::Bytes(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            BlobBody::Text(s) => s.into_bytes(),
            BlobBody::Bytes(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Default content type for the upload path.
    pub fn content_type(&self) -> &'static str {
        match self {
            BlobBody::Text(_) => "application/json; charset=utf-8",
            BlobBody::Bytes(_) => "application/octet-stream",
        }
    }
}

impl From<String> for BlobBody {
    fn from(s: String) -> Self {
        BlobBody::Text(s)
    }
}

impl From<&str> for BlobBody {
    fn from(s: &str) -> Self {
        BlobBody::Text(s.to_string())
    }
}

impl From<Vec<u8>> for BlobBody {
    fn from(b: Vec<u8>) -> Self {
        BlobBody::Bytes(b)
    }
}

/// A blob as downloaded from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub metadata: BlobMetadata,
}
