use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::shared::AppError;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// A finished match: who played on which server and what each player scored.
///
/// Matches are immutable once stored. Scores are keyed by player username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: Uuid,
    pub server_endpoint: String,
    pub played_at: DateTime<Utc>,
    pub scores: BTreeMap<String, i32>,
}

impl Match {
    /// Creates a match with a fresh id, played now
    pub fn new(server_endpoint: &str, scores: BTreeMap<String, i32>) -> Result<Self, AppError> {
        Self::with_details(Uuid::new_v4(), server_endpoint, Utc::now(), scores)
    }

    pub fn with_details(
        id: Uuid,
        server_endpoint: &str,
        played_at: DateTime<Utc>,
        scores: BTreeMap<String, i32>,
    ) -> Result<Self, AppError> {
        let record = Self {
            id,
            server_endpoint: server_endpoint.to_string(),
            played_at,
            scores,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks the invariants every stored match must satisfy
    pub fn validate(&self) -> Result<(), AppError> {
        if self.server_endpoint.is_empty() {
            return Err(AppError::InvalidMatch(format!(
                "match {} has no server endpoint",
                self.id
            )));
        }
        if self.scores.is_empty() {
            return Err(AppError::InvalidMatch(format!(
                "match {} has no participants",
                self.id
            )));
        }
        if let Some((player, score)) = self
            .scores
            .iter()
            .find(|(_, score)| !(MIN_SCORE..=MAX_SCORE).contains(*score))
        {
            return Err(AppError::InvalidMatch(format!(
                "score {} for player {} is outside {}..={}",
                score, player, MIN_SCORE, MAX_SCORE
            )));
        }
        Ok(())
    }

    pub fn player_count(&self) -> usize {
        self.scores.len()
    }

    pub fn total_score(&self) -> u64 {
        self.scores.values().map(|s| *s as u64).sum()
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.scores.contains_key(player_id)
    }
}
