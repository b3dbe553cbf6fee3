use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use super::codec;
use super::models::PlayerAggregate;
use super::repository::PlayerStatsRepository;
use crate::matches::models::{Match, MAX_SCORE, MIN_SCORE};
use crate::shared::AppError;

pub const DEFAULT_MERGE_MAX_RETRIES: u32 = 32;

/// Reads and updates per-player aggregates.
///
/// Updates use optimistic concurrency against the repository, so any number
/// of service instances may merge into the same player at once.
pub struct PlayerStatsService {
    repository: Arc<dyn PlayerStatsRepository + Send + Sync>,
    max_retries: u32,
}

impl PlayerStatsService {
    pub fn new(repository: Arc<dyn PlayerStatsRepository + Send + Sync>) -> Self {
        Self {
            repository,
            max_retries: DEFAULT_MERGE_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Current aggregate for a player, `Empty` if nothing was recorded
    #[instrument(skip(self))]
    pub async fn get(&self, player_id: &str) -> Result<PlayerAggregate, AppError> {
        Ok(self
            .repository
            .load(player_id)
            .await?
            .map(|stored| codec::decode(player_id, &stored.fields))
            .unwrap_or_default())
    }

    /// Folds one score into a player's aggregate and returns the new value
    #[instrument(skip(self))]
    pub async fn merge(&self, player_id: &str, score: i32) -> Result<PlayerAggregate, AppError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(AppError::InvalidMatch(format!(
                "score {} for player {} is outside {}..={}",
                score, player_id, MIN_SCORE, MAX_SCORE
            )));
        }

        for attempt in 1..=self.max_retries {
            let stored = self.repository.load(player_id).await?;
            let (expected_version, current) = match &stored {
                Some(stored) => (
                    Some(stored.version),
                    codec::decode(player_id, &stored.fields),
                ),
                None => (None, PlayerAggregate::Empty),
            };

            let updated = current.merge(score);
            let written = self
                .repository
                .compare_and_swap(player_id, expected_version, &codec::encode(&updated))
                .await?;

            if written {
                debug!(
                    attempt,
                    match_count = updated.match_count(),
                    "Player stats merged"
                );
                return Ok(updated);
            }

            debug!(attempt, "Concurrent stats update detected, retrying");
            tokio::task::yield_now().await;
        }

        warn!(attempts = self.max_retries, "Giving up on player stats merge");
        Err(AppError::WriteConflict {
            player_id: player_id.to_string(),
            attempts: self.max_retries,
        })
    }

    /// Merges every participant's score from a saved match.
    ///
    /// All participants are attempted even if one fails; the first failure
    /// is returned.
    #[instrument(skip(self, record), fields(match_id = %record.id))]
    pub async fn record_match(&self, record: &Match) -> Result<(), AppError> {
        let mut first_error = None;

        for (player_id, score) in &record.scores {
            if let Err(e) = self.merge(player_id, *score).await {
                error!(player_id = %player_id, error = %e, "Failed to update player stats");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
