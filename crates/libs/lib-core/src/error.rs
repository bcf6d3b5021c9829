//! # Centralized Error Handling
//!
//! This module defines the application-wide error type [`AppError`]. Library crates keep
//! their own narrower error enums and convert into `AppError` at the application edge.
//!
//! ## Error Categories
//!
//! 1. **Client Errors** - caller/input issues
//!    - [`InvalidInput`](AppError::InvalidInput)
//!    - [`NotFound`](AppError::NotFound)
//!
//! 2. **External Errors** - collaborators that failed
//!    - [`Rpc`](AppError::Rpc) - chain subscription transport
//!    - [`Oracle`](AppError::Oracle) - price oracle
//!    - [`Storage`](AppError::Storage) - durable local store
//!
//! 3. **Internal Errors**
//!    - [`Config`](AppError::Config)
//!    - [`Reconciliation`](AppError::Reconciliation) - derived balances failed an invariant
//!    - [`Internal`](AppError::Internal)
//!
//! ## Usage Example
//!
//! ```rust
//! use lib_core::error::{AppError, Result};
//!
//! fn parse_network(name: &str) -> Result<String> {
//!     if name.is_empty() {
//!         return Err(AppError::InvalidInput("Network name cannot be empty".to_string()));
//!     }
//!     Ok(name.to_lowercase())
//! }
//! ```

use thiserror::Error;

/// Convenience type alias for `Result<T, AppError>`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error during startup or environment loading.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chain subscription transport error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Price oracle request or response error.
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Durable local store read/write error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A derived balance snapshot failed an arithmetic invariant.
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),

    /// Invalid user input validation error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error (unexpected failures).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable variant name, suitable as an error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Config",
            AppError::Rpc(_) => "Rpc",
            AppError::Oracle(_) => "Oracle",
            AppError::Storage(_) => "Storage",
            AppError::Reconciliation(_) => "Reconciliation",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get a user-friendly error message.
    ///
    /// For internal errors, returns a generic message to avoid exposing implementation details.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Rpc(_) | AppError::Oracle(_) => "Service temporarily unavailable".to_string(),
            AppError::Config(_)
            | AppError::Storage(_)
            | AppError::Reconciliation(_)
            | AppError::Internal(_) => "An internal error occurred".to_string(),
        }
    }

    /// Log the full error at a level matching its category.
    pub fn report(&self) {
        match self {
            AppError::InvalidInput(_) | AppError::NotFound(_) => {
                tracing::debug!(code = self.code(), "Client error: {}", self);
            }
            AppError::Rpc(_) | AppError::Oracle(_) => {
                tracing::warn!(code = self.code(), "External service error: {}", self);
            }
            _ => {
                tracing::error!(code = self.code(), "Server error: {}", self);
            }
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Convert `serde_json::Error` to `AppError`.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(format!("JSON error: {}", err))
    }
}

/// Convert `std::io::Error` to `AppError`.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(format!("I/O error: {}", err))
    }
}
