use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::codec::StatsFields;
use crate::shared::{with_timeout, AppError};

/// A stored aggregate record together with its write version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedStats {
    pub version: i64,
    pub fields: StatsFields,
}

/// Versioned storage for per-player aggregate records.
///
/// Writers read a record, compute the new fields and write them back with
/// `compare_and_swap`, which only succeeds if nobody else wrote in between.
#[async_trait]
pub trait PlayerStatsRepository {
    async fn load(&self, player_id: &str) -> Result<Option<VersionedStats>, AppError>;

    /// Stores `fields` if the current version equals `expected_version`
    /// (`None` meaning the record must not exist yet). Returns `false` when
    /// another writer got there first.
    async fn compare_and_swap(
        &self,
        player_id: &str,
        expected_version: Option<i64>,
        fields: &StatsFields,
    ) -> Result<bool, AppError>;
}

/// In-memory implementation of PlayerStatsRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryPlayerStatsRepository {
    records: RwLock<HashMap<String, VersionedStats>>,
}

impl InMemoryPlayerStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository holding the given raw records at version 1
    pub fn with_records(records: Vec<(String, StatsFields)>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|(player_id, fields)| (player_id, VersionedStats { version: 1, fields }))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl PlayerStatsRepository for InMemoryPlayerStatsRepository {
    async fn load(&self, player_id: &str) -> Result<Option<VersionedStats>, AppError> {
        Ok(self.records.read().await.get(player_id).cloned())
    }

    async fn compare_and_swap(
        &self,
        player_id: &str,
        expected_version: Option<i64>,
        fields: &StatsFields,
    ) -> Result<bool, AppError> {
        let mut records = self.records.write().await;
        let current_version = records.get(player_id).map(|r| r.version);
        if current_version != expected_version {
            debug!(
                player_id = %player_id,
                ?expected_version,
                ?current_version,
                "Stats version moved on"
            );
            return Ok(false);
        }

        records.insert(
            player_id.to_string(),
            VersionedStats {
                version: expected_version.unwrap_or(0) + 1,
                fields: fields.clone(),
            },
        );
        Ok(true)
    }
}

/// PostgreSQL implementation of PlayerStatsRepository.
///
/// Fields are kept as a JSON object next to a version column; the swap is a
/// conditional insert or update on that version.
pub struct PostgresPlayerStatsRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresPlayerStatsRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

/// Flattens a stored JSON object into string fields; anything else is
/// treated as an empty record and left to the decoder's fallbacks.
fn fields_from_json(value: Value) -> StatsFields {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(text) => (key, text),
                other => (key, other.to_string()),
            })
            .collect(),
        _ => StatsFields::new(),
    }
}

#[async_trait]
impl PlayerStatsRepository for PostgresPlayerStatsRepository {
    #[instrument(skip(self))]
    async fn load(&self, player_id: &str) -> Result<Option<VersionedStats>, AppError> {
        let row = with_timeout(self.timeout, "load player stats", async {
            sqlx::query_as::<_, (i64, Json<Value>)>(
                "SELECT version, fields FROM player_stats WHERE player_id = $1",
            )
            .bind(player_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
        })
        .await?;

        Ok(row.map(|(version, Json(fields))| VersionedStats {
            version,
            fields: fields_from_json(fields),
        }))
    }

    #[instrument(skip(self, fields))]
    async fn compare_and_swap(
        &self,
        player_id: &str,
        expected_version: Option<i64>,
        fields: &StatsFields,
    ) -> Result<bool, AppError> {
        let affected = with_timeout(self.timeout, "swap player stats", async {
            let query = match expected_version {
                None => sqlx::query(
                    "INSERT INTO player_stats (player_id, version, fields) VALUES ($1, 1, $2) \
                     ON CONFLICT (player_id) DO NOTHING",
                )
                .bind(player_id)
                .bind(Json(fields)),
                Some(version) => sqlx::query(
                    "UPDATE player_stats SET fields = $2, version = version + 1 \
                     WHERE player_id = $1 AND version = $3",
                )
                .bind(player_id)
                .bind(Json(fields))
                .bind(version),
            };
            query
                .execute(&self.pool)
                .await
                .map(|done| done.rows_affected())
                .map_err(AppError::from)
        })
        .await?;

        Ok(affected == 1)
    }
}
