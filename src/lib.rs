// Library crate for the match statistics service
// This file exposes the public API for integration tests

pub mod catalog;
pub mod config;
pub mod database;
pub mod generator;
pub mod matches;
pub mod player_stats;
pub mod rating;
pub mod reports;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use catalog::{CatalogRepository, Player, ServerInfo};
pub use config::{Settings, StoreBackend};
pub use generator::{MatchGenerator, TickOutcome};
pub use matches::{Match, MatchRepository};
pub use player_stats::{PlayerAggregate, PlayerStatsService};
pub use reports::{PlayerStats, ReportService, ServerStats};
pub use shared::{AppError, AppState};
