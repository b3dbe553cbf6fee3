pub mod models;
pub mod repository;

pub use models::{Match, MAX_SCORE, MIN_SCORE};
pub use repository::{InMemoryMatchRepository, MatchRepository, PostgresMatchRepository};
