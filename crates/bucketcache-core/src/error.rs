//! Error types for bucketcache.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Key not found: {0}")]
    NotFound(String),

    // Transient backend errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Corruption and misuse
    #[error("Malformed cache record: {0}")]
    Malformed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors caused by a remote or local backend that a retry later might fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Backend(_) | Error::Io(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Malformed(err.to_string())
    }
}
