//! Error types for the FOIS fetcher
//!
//! This module defines the per-component error types. They are folded into
//! [`crate::error::Error`] at the run level.

use thiserror::Error;

/// Errors raised while exchanging client credentials for an access token
#[derive(Error, Debug)]
pub enum AuthError {
    /// Token service could not be reached
    #[error("Auth service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// Token service answered with a non-success status
    #[error("Credentials rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Token response could not be decoded
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),
}

/// Errors that can occur while fetching one day of one endpoint
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection failure or other transport error
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Provider-side throttling (HTTP 429)
    #[error("Rate limited by provider")]
    RateLimited,

    /// Non-success status code
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body could not be decoded into rows
    #[error("Parse error: {0}")]
    Parse(String),

    /// The run credential has already been revoked
    #[error("Credential already revoked")]
    Revoked,

    /// Endpoint URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Classify a transport error from reqwest
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

/// Errors from the destination table store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Store is temporarily unavailable (locked, busy, server-side failure)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Batch does not fit the destination table
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// Connection lock was poisoned by a panicking holder
    #[error("Store connection poisoned")]
    Poisoned,
}

impl StoreError {
    /// Whether a retry of the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Errors surfaced by the dedup writer
#[derive(Error, Debug)]
pub enum WriteError {
    /// Every attempt failed with a transient error
    #[error("Write to {table} failed after {attempts} attempts: {source}")]
    Exhausted {
        table: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    /// Permanent failure; not retried
    #[error("Write to {table} rejected: {source}")]
    Rejected {
        table: String,
        #[source]
        source: StoreError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::Unavailable("500".into()).is_transient());
        assert!(!StoreError::Schema("missing column".into()).is_transient());
        assert!(!StoreError::Poisoned.is_transient());

        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(StoreError::Sqlite(busy).is_transient());
    }

    #[test]
    fn test_write_error_display() {
        let err = WriteError::Exhausted {
            table: "fois_indent_data".into(),
            attempts: 3,
            source: StoreError::Unavailable("server error".into()),
        };
        assert_eq!(
            err.to_string(),
            "Write to fois_indent_data failed after 3 attempts: Store unavailable: server error"
        );
    }
}
