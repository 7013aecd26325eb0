//! Error handling for the inventory pipeline
//!
//! Every failure is `Clone` so that a single outcome of a shared in-flight
//! fetch can be handed to every waiter. Sources that are not `Clone`
//! themselves (reqwest, serde_json, io) are held behind an `Arc`.

use std::sync::Arc;

use thiserror::Error;

use crate::index::IndexError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pipeline
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A required upstream value is missing. Fatal to the calling operation.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Missing/expired session or an HTTP 401 from the remote API.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(Arc<serde_json::Error>),

    /// Transport reported success but the response envelope carried an error code.
    #[error("{status} ({code}): {message}")]
    Application {
        code: i32,
        status: String,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

impl Error {
    pub fn precondition(message: impl Into<String>) -> Self {
        Error::Precondition(message.into())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Http(Arc::new(error))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Parse(Arc::new(error))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Storage(error.to_string())
    }
}

/// Fail with [`Error::Precondition`] unless `value` is present.
pub fn require<T>(value: Option<T>, message: &str) -> Result<T> {
    value.ok_or_else(|| Error::precondition(message))
}
