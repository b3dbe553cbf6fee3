use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

use matchstats::{
    matches::{Match, MatchRepository},
    player_stats::{
        codec::StatsFields, repository::VersionedStats, PlayerStatsRepository,
    },
    AppError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

fn unavailable() -> AppError {
    AppError::StorageUnavailable("mock store is down".to_string())
}

/// Match store that rejects every call and counts save attempts
#[derive(Default)]
pub struct FailingMatchRepository {
    save_attempts: AtomicUsize,
}

impl FailingMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchRepository for FailingMatchRepository {
    async fn save(&self, _record: &Match) -> Result<(), AppError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        Err(unavailable())
    }

    async fn find_recent(&self, _limit: usize) -> Result<Vec<Match>, AppError> {
        Err(unavailable())
    }

    async fn find_by_server_since(
        &self,
        _endpoint: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Match>, AppError> {
        Err(unavailable())
    }

    async fn find_by_server_endpoint(&self, _endpoint: &str) -> Result<Vec<Match>, AppError> {
        Err(unavailable())
    }

    async fn find_by_player(&self, _player_id: &str) -> Result<Vec<Match>, AppError> {
        Err(unavailable())
    }
}

/// Aggregate store that fails every read and write
#[derive(Default)]
pub struct FailingPlayerStatsRepository {
    calls: AtomicUsize,
}

impl FailingPlayerStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlayerStatsRepository for FailingPlayerStatsRepository {
    async fn load(&self, _player_id: &str) -> Result<Option<VersionedStats>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable())
    }

    async fn compare_and_swap(
        &self,
        _player_id: &str,
        _expected_version: Option<i64>,
        _fields: &StatsFields,
    ) -> Result<bool, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(unavailable())
    }
}
