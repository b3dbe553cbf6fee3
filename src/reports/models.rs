use serde::Serialize;

use crate::catalog::{Player, ServerInfo};
use crate::matches::Match;
use crate::player_stats::PlayerAggregate;
use crate::rating::rating;
use crate::shared::round2;

/// A player's aggregate together with the derived rating
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub username: String,
    pub display_name: String,
    pub total_matches: u64,
    pub total_score: u64,
    pub best_score: Option<i32>,
    pub worst_score: Option<i32>,
    pub average_score: f64,
    pub rating: f64,
}

impl PlayerStats {
    pub fn from_aggregate(player: &Player, aggregate: &PlayerAggregate) -> Self {
        Self {
            username: player.username.clone(),
            display_name: player.display_name.clone(),
            total_matches: aggregate.match_count(),
            total_score: aggregate.score_sum(),
            best_score: aggregate.best_score(),
            worst_score: aggregate.worst_score(),
            average_score: aggregate.average_score(),
            rating: rating(aggregate),
        }
    }
}

/// Activity summary of one server, computed from its stored matches
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub endpoint: String,
    pub name: String,
    pub region: String,
    pub total_matches: u64,
    pub total_score: u64,
    /// Whole players per match, rounded down
    pub average_players_per_match: u64,
    /// Mean score over every participation, two decimals
    pub average_score: f64,
}

impl ServerStats {
    pub fn from_matches(server: &ServerInfo, matches: &[Match]) -> Self {
        let total_matches = matches.len() as u64;
        let total_players: u64 = matches.iter().map(|m| m.player_count() as u64).sum();
        let total_score: u64 = matches.iter().map(Match::total_score).sum();

        Self {
            endpoint: server.endpoint.clone(),
            name: server.name.clone(),
            region: server.region.clone(),
            total_matches,
            total_score,
            average_players_per_match: if total_matches > 0 {
                total_players / total_matches
            } else {
                0
            },
            average_score: if total_players > 0 {
                round2(total_score as f64 / total_players as f64)
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(players: &[(&str, i32)]) -> Match {
        Match::new(
            "eu:1",
            players.iter().map(|(p, s)| (p.to_string(), *s)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_player_stats_from_empty_aggregate() {
        let stats =
            PlayerStats::from_aggregate(&Player::new("ace", "Ace"), &PlayerAggregate::Empty);

        assert_eq!(stats.total_matches, 0);
        assert_eq!(stats.best_score, None);
        assert_eq!(stats.rating, 0.0);
    }

    #[test]
    fn test_player_stats_carries_rating() {
        let stats = PlayerStats::from_aggregate(
            &Player::new("ace", "Ace"),
            &PlayerAggregate::from_scores([10, 20]),
        );

        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.total_score, 30);
        assert_eq!(stats.average_score, 15.0);
        assert_eq!(stats.best_score, Some(20));
        assert_eq!(stats.worst_score, Some(10));
        assert_eq!(stats.rating, 15.91);
    }

    #[test]
    fn test_server_stats_averages() {
        let server = ServerInfo::new("eu:1", "Dublin", "EU");
        let matches = vec![
            record(&[("ace", 10), ("bo", 20)]),
            record(&[("ace", 30), ("bo", 40), ("cy", 50)]),
        ];

        let stats = ServerStats::from_matches(&server, &matches);

        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.total_score, 150);
        assert_eq!(stats.average_players_per_match, 2);
        assert_eq!(stats.average_score, 30.0);
        assert_eq!(stats.region, "EU");
    }

    #[test]
    fn test_server_stats_without_matches() {
        let stats = ServerStats::from_matches(&ServerInfo::new("eu:1", "Dublin", "EU"), &[]);

        assert_eq!(stats.total_matches, 0);
        assert_eq!(stats.average_players_per_match, 0);
        assert_eq!(stats.average_score, 0.0);
    }

    #[test]
    fn test_player_stats_serializes_camel_case() {
        let stats = PlayerStats::from_aggregate(
            &Player::new("ace", "Ace"),
            &PlayerAggregate::from_scores([10]),
        );
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["displayName"], "Ace");
        assert_eq!(json["totalMatches"], 1);
    }
}
