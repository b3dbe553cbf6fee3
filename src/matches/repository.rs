use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound::{Excluded, Unbounded};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::Match;
use crate::shared::{with_timeout, AppError};

/// Storage for match records and their secondary indexes.
///
/// Every saved match is reachable through the global time index, its server's
/// membership and time indexes, and the membership index of each participant.
/// `save` makes all of these visible together or not at all.
#[async_trait]
pub trait MatchRepository {
    async fn save(&self, record: &Match) -> Result<(), AppError>;

    /// Most recent first; equal timestamps are ordered latest-inserted first
    async fn find_recent(&self, limit: usize) -> Result<Vec<Match>, AppError>;

    /// Matches on `endpoint` played strictly after `since`, oldest first
    async fn find_by_server_since(
        &self,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Match>, AppError>;

    /// All matches on `endpoint`, oldest first
    async fn find_by_server_endpoint(&self, endpoint: &str) -> Result<Vec<Match>, AppError>;

    /// All matches `player_id` took part in, oldest first
    async fn find_by_player(&self, player_id: &str) -> Result<Vec<Match>, AppError>;
}

/// Ordering key for time indexes: timestamp, then insertion sequence
type TimeKey = (DateTime<Utc>, u64);

#[derive(Debug)]
struct StoredMatch {
    seq: u64,
    record: Match,
}

impl StoredMatch {
    fn time_key(&self) -> TimeKey {
        (self.record.played_at, self.seq)
    }
}

#[derive(Debug, Default)]
struct MatchTables {
    next_seq: u64,
    records: HashMap<Uuid, StoredMatch>,
    by_time: BTreeMap<TimeKey, Uuid>,
    server_members: HashMap<String, HashSet<Uuid>>,
    server_timeline: HashMap<String, BTreeMap<TimeKey, Uuid>>,
    player_members: HashMap<String, HashSet<Uuid>>,
}

impl MatchTables {
    fn resolve<'a>(&self, ids: impl Iterator<Item = &'a Uuid>) -> Vec<Match> {
        ids.filter_map(|id| self.records.get(id))
            .map(|stored| stored.record.clone())
            .collect()
    }

    /// Resolves an unordered id set in existence order
    fn resolve_in_time_order(&self, ids: Option<&HashSet<Uuid>>) -> Vec<Match> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        let mut stored: Vec<&StoredMatch> =
            ids.iter().filter_map(|id| self.records.get(id)).collect();
        stored.sort_by_key(|s| s.time_key());
        stored.into_iter().map(|s| s.record.clone()).collect()
    }
}

/// In-memory match store for development and testing.
///
/// All tables sit behind one lock, so a save updates the record and every
/// index in a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryMatchRepository {
    tables: RwLock<MatchTables>,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn match_count(&self) -> usize {
        self.tables.read().await.records.len()
    }

    /// Lists every disagreement between the primary records and the indexes.
    /// An empty result means the store is consistent.
    pub async fn consistency_violations(&self) -> Vec<String> {
        let tables = self.tables.read().await;
        let mut violations = Vec::new();

        for (id, stored) in &tables.records {
            let key = stored.time_key();
            let endpoint = &stored.record.server_endpoint;

            if tables.by_time.get(&key) != Some(id) {
                violations.push(format!("{} missing from global time index", id));
            }
            if !tables
                .server_members
                .get(endpoint)
                .is_some_and(|members| members.contains(id))
            {
                violations.push(format!("{} missing from server index {}", id, endpoint));
            }
            if tables
                .server_timeline
                .get(endpoint)
                .and_then(|timeline| timeline.get(&key))
                != Some(id)
            {
                violations.push(format!("{} missing from server timeline {}", id, endpoint));
            }
            for player in stored.record.scores.keys() {
                if !tables
                    .player_members
                    .get(player)
                    .is_some_and(|members| members.contains(id))
                {
                    violations.push(format!("{} missing from player index {}", id, player));
                }
            }
        }

        let indexed: usize = tables.by_time.len();
        if indexed != tables.records.len() {
            violations.push(format!(
                "global time index holds {} entries for {} records",
                indexed,
                tables.records.len()
            ));
        }
        let server_indexed: usize = tables.server_members.values().map(HashSet::len).sum();
        if server_indexed != tables.records.len() {
            violations.push(format!(
                "server indexes hold {} entries for {} records",
                server_indexed,
                tables.records.len()
            ));
        }
        let timeline_indexed: usize = tables.server_timeline.values().map(BTreeMap::len).sum();
        if timeline_indexed != tables.records.len() {
            violations.push(format!(
                "server timelines hold {} entries for {} records",
                timeline_indexed,
                tables.records.len()
            ));
        }
        let participations: usize = tables
            .records
            .values()
            .map(|s| s.record.player_count())
            .sum();
        let player_indexed: usize = tables.player_members.values().map(HashSet::len).sum();
        if player_indexed != participations {
            violations.push(format!(
                "player indexes hold {} entries for {} participations",
                player_indexed, participations
            ));
        }

        violations
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    #[instrument(skip(self, record), fields(match_id = %record.id))]
    async fn save(&self, record: &Match) -> Result<(), AppError> {
        record.validate()?;

        let mut tables = self.tables.write().await;
        if tables.records.contains_key(&record.id) {
            warn!("Match already exists in memory");
            return Err(AppError::DuplicateMatch(record.id));
        }

        let seq = tables.next_seq;
        tables.next_seq += 1;
        let key = (record.played_at, seq);

        tables.by_time.insert(key, record.id);
        tables
            .server_members
            .entry(record.server_endpoint.clone())
            .or_default()
            .insert(record.id);
        tables
            .server_timeline
            .entry(record.server_endpoint.clone())
            .or_default()
            .insert(key, record.id);
        for player in record.scores.keys() {
            tables
                .player_members
                .entry(player.clone())
                .or_default()
                .insert(record.id);
        }
        tables.records.insert(
            record.id,
            StoredMatch {
                seq,
                record: record.clone(),
            },
        );

        debug!(
            server = %record.server_endpoint,
            players = record.player_count(),
            "Match saved in memory"
        );
        Ok(())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<Match>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.resolve(tables.by_time.values().rev().take(limit)))
    }

    async fn find_by_server_since(
        &self,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Match>, AppError> {
        let tables = self.tables.read().await;
        let Some(timeline) = tables.server_timeline.get(endpoint) else {
            return Ok(Vec::new());
        };
        Ok(tables.resolve(
            timeline
                .range((Excluded((since, u64::MAX)), Unbounded))
                .map(|(_, id)| id),
        ))
    }

    async fn find_by_server_endpoint(&self, endpoint: &str) -> Result<Vec<Match>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.resolve_in_time_order(tables.server_members.get(endpoint)))
    }

    async fn find_by_player(&self, player_id: &str) -> Result<Vec<Match>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.resolve_in_time_order(tables.player_members.get(player_id)))
    }
}

#[derive(Debug, FromRow)]
struct MatchRow {
    id: Uuid,
    server_endpoint: String,
    played_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ScoreRow {
    match_id: Uuid,
    player_id: String,
    score: i32,
}

/// PostgreSQL implementation of the match store.
///
/// The secondary indexes are database indexes over `matches` and
/// `match_scores`; a save inserts both inside one transaction.
pub struct PostgresMatchRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresMatchRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn insert_match(&self, record: &Match) -> Result<(), AppError> {
        let player_ids: Vec<String> = record.scores.keys().cloned().collect();
        let scores: Vec<i32> = record.scores.values().copied().collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO matches (id, server_endpoint, played_at) VALUES ($1, $2, $3)")
            .bind(record.id)
            .bind(&record.server_endpoint)
            .bind(record.played_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::DuplicateMatch(record.id)
                }
                _ => AppError::from(e),
            })?;

        sqlx::query(
            "INSERT INTO match_scores (match_id, player_id, score) \
             SELECT $1, t.player_id, t.score FROM UNNEST($2::text[], $3::int4[]) AS t(player_id, score)",
        )
        .bind(record.id)
        .bind(&player_ids)
        .bind(&scores)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_rows(
        &self,
        operation: &str,
        query: sqlx::query::QueryAs<'_, sqlx::Postgres, MatchRow, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<Match>, AppError> {
        let rows = with_timeout(self.timeout, operation, async {
            query.fetch_all(&self.pool).await.map_err(AppError::from)
        })
        .await?;
        self.hydrate(rows).await
    }

    /// Attaches scores to match rows, preserving row order
    async fn hydrate(&self, rows: Vec<MatchRow>) -> Result<Vec<Match>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let score_rows = with_timeout(self.timeout, "load match scores", async {
            sqlx::query_as::<_, ScoreRow>(
                "SELECT match_id, player_id, score FROM match_scores WHERE match_id = ANY($1)",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
        })
        .await?;

        let mut scores_by_match: HashMap<Uuid, BTreeMap<String, i32>> = HashMap::new();
        for row in score_rows {
            scores_by_match
                .entry(row.match_id)
                .or_default()
                .insert(row.player_id, row.score);
        }

        Ok(rows
            .into_iter()
            .map(|row| Match {
                scores: scores_by_match.remove(&row.id).unwrap_or_default(),
                id: row.id,
                server_endpoint: row.server_endpoint,
                played_at: row.played_at,
            })
            .collect())
    }
}

#[async_trait]
impl MatchRepository for PostgresMatchRepository {
    #[instrument(skip(self, record), fields(match_id = %record.id))]
    async fn save(&self, record: &Match) -> Result<(), AppError> {
        record.validate()?;

        with_timeout(self.timeout, "save match", self.insert_match(record))
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to save match in database");
                e
            })?;

        info!(server = %record.server_endpoint, "Match saved in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_recent(&self, limit: usize) -> Result<Vec<Match>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.fetch_rows(
            "find recent matches",
            sqlx::query_as::<_, MatchRow>(
                "SELECT id, server_endpoint, played_at FROM matches \
                 ORDER BY played_at DESC, seq DESC LIMIT $1",
            )
            .bind(limit),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_by_server_since(
        &self,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Match>, AppError> {
        self.fetch_rows(
            "find server matches since",
            sqlx::query_as::<_, MatchRow>(
                "SELECT id, server_endpoint, played_at FROM matches \
                 WHERE server_endpoint = $1 AND played_at > $2 ORDER BY played_at, seq",
            )
            .bind(endpoint)
            .bind(since),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_by_server_endpoint(&self, endpoint: &str) -> Result<Vec<Match>, AppError> {
        self.fetch_rows(
            "find server matches",
            sqlx::query_as::<_, MatchRow>(
                "SELECT id, server_endpoint, played_at FROM matches \
                 WHERE server_endpoint = $1 ORDER BY played_at, seq",
            )
            .bind(endpoint),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_by_player(&self, player_id: &str) -> Result<Vec<Match>, AppError> {
        self.fetch_rows(
            "find player matches",
            sqlx::query_as::<_, MatchRow>(
                "SELECT m.id, m.server_endpoint, m.played_at FROM matches m \
                 JOIN match_scores s ON s.match_id = m.id \
                 WHERE s.player_id = $1 ORDER BY m.played_at, m.seq",
            )
            .bind(player_id),
        )
        .await
    }
}
