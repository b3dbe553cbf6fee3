pub mod codec;
pub mod models;
pub mod repository;
pub mod service;

pub use models::{PlayerAggregate, ScoreTotals};
pub use repository::{
    InMemoryPlayerStatsRepository, PlayerStatsRepository, PostgresPlayerStatsRepository,
};
pub use service::{PlayerStatsService, DEFAULT_MERGE_MAX_RETRIES};
