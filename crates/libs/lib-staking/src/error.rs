//! # Staking Errors
//!
//! [`StakingError`] covers everything the reconciliation core can fail on. Most feed-level
//! failures never reach a caller (the feed logs and keeps its previous value); the variants
//! that do surface are invariant violations from the resolver and collaborator errors from
//! explicit one-shot calls.

use lib_core::AppError;
use thiserror::Error;

/// Convenience type alias for `Result<T, StakingError>`.
pub type Result<T> = std::result::Result<T, StakingError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    /// Chain data rejected at ingestion (e.g. a zero-amount unlocking chunk).
    #[error("Invalid chain data: {0}")]
    InvalidChainData(String),

    /// Checked arithmetic overflowed while deriving a snapshot.
    #[error("Arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    /// A derived snapshot did not reconcile with its inputs.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Price oracle request failed or returned an unusable body.
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Fee quote request failed.
    #[error("Fee quote error: {0}")]
    Quote(String),

    /// Durable local store failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unknown network name.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}

impl From<StakingError> for AppError {
    fn from(err: StakingError) -> Self {
        match err {
            StakingError::InvalidChainData(msg) => AppError::Rpc(msg),
            StakingError::Overflow(_) | StakingError::Invariant(_) => {
                AppError::Reconciliation(err.to_string())
            }
            StakingError::Oracle(msg) | StakingError::Quote(msg) => AppError::Oracle(msg),
            StakingError::Storage(msg) => AppError::Storage(msg),
            StakingError::UnknownNetwork(name) => {
                AppError::InvalidInput(format!("Unknown network: {}", name))
            }
        }
    }
}

impl From<serde_json::Error> for StakingError {
    fn from(err: serde_json::Error) -> Self {
        StakingError::Storage(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for StakingError {
    fn from(err: std::io::Error) -> Self {
        StakingError::Storage(format!("I/O error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_app_error() {
        let app: AppError = StakingError::Overflow("nominate.total_unlocking").into();
        assert_eq!(app.code(), "Reconciliation");

        let app: AppError = StakingError::UnknownNetwork("rococo".to_string()).into();
        assert_eq!(app.user_message(), "Unknown network: rococo");
    }
}
