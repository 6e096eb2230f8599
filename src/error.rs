//! Errors raised at the record store boundary.

use thiserror::Error;

/// Failure of a call into the abstract record store.
///
/// Every variant is recoverable: the controller keeps the current window
/// and logs the error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
