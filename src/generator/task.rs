use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument};

use crate::catalog::{CatalogRepository, Player, ServerInfo};
use crate::matches::{Match, MatchRepository, MAX_SCORE, MIN_SCORE};
use crate::player_stats::PlayerStatsService;
use crate::shared::{AppError, AppState};

/// Smallest number of participants in a generated match
pub const MIN_PLAYERS: usize = 2;

/// Configuration for the match generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// How often a match is generated
    pub interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Why a tick produced no match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoServers,
    NotEnoughPlayers { available: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoServers => write!(f, "no servers in catalog"),
            SkipReason::NotEnoughPlayers { available } => write!(
                f,
                "{} players available, at least {} needed",
                available, MIN_PLAYERS
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Generated(Match),
    Skipped(SkipReason),
}

/// Server and scores chosen for one synthetic match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPlan {
    pub server_endpoint: String,
    pub scores: BTreeMap<String, i32>,
}

/// Picks a server, a participant count, distinct participants and their
/// scores, all uniformly.
pub fn plan_match<R: Rng + ?Sized>(
    rng: &mut R,
    servers: &[ServerInfo],
    players: &[Player],
) -> Result<MatchPlan, SkipReason> {
    let server = servers.choose(rng).ok_or(SkipReason::NoServers)?;
    if players.len() < MIN_PLAYERS {
        return Err(SkipReason::NotEnoughPlayers {
            available: players.len(),
        });
    }

    let participant_count = rng.random_range(MIN_PLAYERS..=players.len());
    let participants: Vec<&Player> = players.choose_multiple(rng, participant_count).collect();
    let scores = participants
        .into_iter()
        .map(|player| {
            (
                player.username.clone(),
                rng.random_range(MIN_SCORE..=MAX_SCORE),
            )
        })
        .collect();

    Ok(MatchPlan {
        server_endpoint: server.endpoint.clone(),
        scores,
    })
}

/// Produces synthetic matches from the catalog and records them
pub struct MatchGenerator {
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    player_stats: Arc<PlayerStatsService>,
}

impl MatchGenerator {
    pub fn new(
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        player_stats: Arc<PlayerStatsService>,
    ) -> Self {
        Self {
            catalog,
            matches,
            player_stats,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.catalog.clone(),
            state.match_repository.clone(),
            state.player_stats.clone(),
        )
    }

    /// Generates, saves and aggregates one match.
    ///
    /// Nothing is written on a skip. If the save fails no aggregate is
    /// touched; if a merge fails the remaining participants are still merged.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<TickOutcome, AppError> {
        let servers = self.catalog.all_servers().await?;
        let players = self.catalog.all_players().await?;

        let planned = plan_match(&mut rand::rng(), &servers, &players);
        let plan = match planned {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(reason = %reason, "Skipping match generation");
                return Ok(TickOutcome::Skipped(reason));
            }
        };

        let record = Match::new(&plan.server_endpoint, plan.scores)?;
        self.matches.save(&record).await?;
        self.player_stats.record_match(&record).await?;

        info!(
            match_id = %record.id,
            server = %record.server_endpoint,
            players = record.player_count(),
            "Generated match"
        );
        Ok(TickOutcome::Generated(record))
    }
}

/// Runs the generator until the task is aborted.
///
/// Ticks never overlap; a tick that overruns the interval causes the missed
/// ticks to be skipped. Tick errors are logged and the loop continues.
#[instrument(skip(generator))]
pub async fn start_match_generator(generator: Arc<MatchGenerator>, config: GeneratorConfig) {
    info!(
        interval_ms = config.interval.as_millis() as u64,
        "Starting match generator background task"
    );

    let mut ticker = interval(config.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if let Err(e) = generator.tick().await {
            error!(error = %e, "Match generation tick failed");
        }
    }
}
