/**
 * Responsibility
 * - meaning that repos report to upper layers
 * - deadline wrapper shared by every store call made on a request path
 */
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("migration error")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("store query exceeded {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepoError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Runs a store call under `limit`; an elapsed deadline surfaces as `RepoError::Timeout`.
pub async fn within<T, F>(limit: Duration, fut: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(RepoError::Timeout(limit)),
    }
}
