//! Error types for the storage client.

use crate::types::Scope;
use thiserror::Error;

/// Main error type for store and event operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} storage is unavailable in this host")]
    ScopeUnavailable(Scope),

    #[error("key not found: {0}")]
    AbsentKey(String),

    #[error("event field {0} is not present")]
    AbsentField(&'static str),

    #[error("decode error: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("malformed notification: {0}")]
    MalformedNotification(String),
}

/// Result type for store and event operations.
pub type Result<T> = std::result::Result<T, StoreError>;
