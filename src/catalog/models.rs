use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A game server that matches are played on, keyed by its endpoint
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ServerInfo {
    pub endpoint: String,
    pub name: String,
    pub region: String,
}

impl ServerInfo {
    pub fn new(endpoint: &str, name: &str, region: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            name: name.to_string(),
            region: region.to_string(),
        }
    }
}

/// A registered player. The username doubles as the player identifier
/// in match scores and aggregates.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub username: String,
    pub display_name: String,
    #[serde(default = "default_level")]
    pub level: i32,
    #[serde(default)]
    pub country: String,
}

fn default_level() -> i32 {
    1
}

impl Player {
    pub fn new(username: &str, display_name: &str) -> Self {
        Self {
            username: username.to_string(),
            display_name: display_name.to_string(),
            level: default_level(),
            country: String::new(),
        }
    }
}
