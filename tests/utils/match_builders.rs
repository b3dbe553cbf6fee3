use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use matchstats::Match;

pub struct MatchBuilder {
    server_endpoint: String,
    played_at: DateTime<Utc>,
    scores: BTreeMap<String, i32>,
}

impl MatchBuilder {
    pub fn on(server_endpoint: &str) -> Self {
        Self {
            server_endpoint: server_endpoint.to_string(),
            played_at: Utc::now(),
            scores: BTreeMap::new(),
        }
    }

    pub fn at(mut self, played_at: DateTime<Utc>) -> Self {
        self.played_at = played_at;
        self
    }

    /// Plays the match `seconds` after (or before, if negative) `base`
    pub fn offset_from(self, base: DateTime<Utc>, seconds: i64) -> Self {
        self.at(base + Duration::seconds(seconds))
    }

    pub fn score(mut self, username: &str, score: i32) -> Self {
        self.scores.insert(username.to_string(), score);
        self
    }

    pub fn build(self) -> Match {
        Match::with_details(
            Uuid::new_v4(),
            &self.server_endpoint,
            self.played_at,
            self.scores,
        )
        .expect("built match should be valid")
    }
}
