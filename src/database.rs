use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use std::time::Duration;
use tracing::{info, instrument};

use crate::shared::{with_timeout, AppError};

const SCHEMA: &str = include_str!("../migrations/0001_match_stats.sql");

const MAX_CONNECTIONS: u32 = 10;

/// Opens a connection pool; acquiring a connection is bounded by `timeout`
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str, timeout: Duration) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(timeout)
        .connect(database_url)
        .await?;

    info!(max_connections = MAX_CONNECTIONS, "Connected to PostgreSQL");
    Ok(pool)
}

/// Creates tables and indexes that do not exist yet
#[instrument(skip(pool))]
pub async fn apply_schema(pool: &PgPool, timeout: Duration) -> Result<(), AppError> {
    with_timeout(timeout, "apply schema", async {
        pool.execute(SCHEMA)
            .await
            .map(|_| ())
            .map_err(AppError::from)
    })
    .await?;

    info!("Database schema is up to date");
    Ok(())
}
