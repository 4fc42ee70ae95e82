//! Store error type.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQL backend rejected or failed the statement.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The operation did not finish before its deadline.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Failure reported by a non-SQL backend.
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Run a backend call under a deadline.
pub(crate) async fn with_deadline<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
