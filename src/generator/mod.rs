pub mod task;

pub use task::{
    plan_match, start_match_generator, GeneratorConfig, MatchGenerator, MatchPlan, SkipReason,
    TickOutcome, MIN_PLAYERS,
};
