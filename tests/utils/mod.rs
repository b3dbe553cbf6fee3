pub mod match_builders;
pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use match_builders::MatchBuilder;
#[allow(unused_imports)]
pub use mocks::{FailingMatchRepository, FailingPlayerStatsRepository};
#[allow(unused_imports)]
pub use setup::{TestSetup, TestSetupBuilder};
