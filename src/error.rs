//! Unified error handling for the foisync crate
//!
//! Component errors live in [`crate::utils::error`]; this module folds them
//! into a single [`Error`] used at run level and classifies each one for
//! reporting.
//!
//! # Taxonomy
//!
//! - `Validation` - bad CLI input, fatal before any network activity
//! - `Auth` - credential exchange failure, fatal at init
//! - `Fetch` - per-task failure, recovered by skipping the task
//! - `Interrupted` / `Panicked` - run aborted after the credential was revoked
//!
//! Write failures never abort a run; they are recorded per task in the
//! run summary.

use thiserror::Error;

pub use crate::utils::error::{AuthError, FetchError, StoreError, WriteError};

/// Common trait for all foisync error types
pub trait FoisErrorTrait: std::error::Error {
    /// Whether the run can continue past this error
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad input or configuration
    Validation,
    /// Credential exchange
    Auth,
    /// Transport, status or decoding failure on a data request
    Network,
    /// Run aborted from outside (signal, panic)
    Aborted,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Aborted => "aborted",
        }
    }
}

/// Unified error type for the foisync crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid user input (days, endpoint)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credential exchange failure
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Data request failure
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Run interrupted by a signal
    #[error("Run interrupted")]
    Interrupted,

    /// A task panicked; remaining tasks were abandoned
    #[error("Run aborted by panic: {0}")]
    Panicked(String),
}

impl FoisErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::Config(_) => ErrorCategory::Validation,
            Self::Auth(_) => ErrorCategory::Auth,
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Interrupted | Self::Panicked(_) => ErrorCategory::Aborted,
        }
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
