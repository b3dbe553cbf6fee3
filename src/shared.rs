use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::catalog::repository::{
    CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository,
};
use crate::matches::repository::{
    InMemoryMatchRepository, MatchRepository, PostgresMatchRepository,
};
use crate::player_stats::repository::{
    InMemoryPlayerStatsRepository, PlayerStatsRepository, PostgresPlayerStatsRepository,
};
use crate::player_stats::PlayerStatsService;
use crate::reports::ReportService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository + Send + Sync>,
    pub match_repository: Arc<dyn MatchRepository + Send + Sync>,
    pub player_stats: Arc<PlayerStatsService>,
    pub reports: Arc<ReportService>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
        match_repository: Arc<dyn MatchRepository + Send + Sync>,
        player_stats_repository: Arc<dyn PlayerStatsRepository + Send + Sync>,
        merge_max_retries: u32,
    ) -> Self {
        let player_stats = Arc::new(
            PlayerStatsService::new(player_stats_repository).with_max_retries(merge_max_retries),
        );
        let reports = Arc::new(ReportService::new(
            catalog.clone(),
            match_repository.clone(),
            player_stats.clone(),
        ));

        Self {
            catalog,
            match_repository,
            player_stats,
            reports,
        }
    }

    /// Everything lives in process memory; data is lost on restart
    pub fn in_memory(merge_max_retries: u32) -> Self {
        Self::new(
            Arc::new(InMemoryCatalogRepository::new()),
            Arc::new(InMemoryMatchRepository::new()),
            Arc::new(InMemoryPlayerStatsRepository::new()),
            merge_max_retries,
        )
    }

    /// All repositories share one connection pool; every call is bounded by `timeout`
    pub fn postgres(pool: PgPool, timeout: Duration, merge_max_retries: u32) -> Self {
        Self::new(
            Arc::new(PostgresCatalogRepository::new(pool.clone(), timeout)),
            Arc::new(PostgresMatchRepository::new(pool.clone(), timeout)),
            Arc::new(PostgresPlayerStatsRepository::new(pool, timeout)),
            merge_max_retries,
        )
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Match {0} already exists")]
    DuplicateMatch(Uuid),

    #[error("Invalid match: {0}")]
    InvalidMatch(String),

    #[error("Write conflict on player {player_id} after {attempts} attempts")]
    WriteConflict { player_id: String, attempts: u32 },

    #[error("Invalid aggregate encoding for field {field}: {value:?}")]
    InvalidAggregateEncoding { field: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::StorageUnavailable(err.to_string())
    }
}

/// Runs a storage call with an upper bound on its duration.
///
/// Expiry drops the inner future, so an open transaction is rolled back
/// rather than left half-applied.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation = %operation,
                timeout_ms = limit.as_millis() as u64,
                "Storage call timed out"
            );
            Err(AppError::StorageUnavailable(format!(
                "{} timed out after {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}

/// Round half-up to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}
