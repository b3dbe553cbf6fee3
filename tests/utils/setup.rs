use std::sync::Arc;

use matchstats::{
    catalog::{InMemoryCatalogRepository, Player, ServerInfo},
    matches::{InMemoryMatchRepository, Match, MatchRepository},
    player_stats::{InMemoryPlayerStatsRepository, PlayerStatsRepository},
    AppState,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub state: AppState,
    pub matches: Arc<InMemoryMatchRepository>,
}

impl TestSetup {
    /// Saves a match and folds it into the participants' aggregates
    pub async fn play(&self, record: Match) -> Match {
        self.state
            .match_repository
            .save(&record)
            .await
            .expect("match should save");
        self.state
            .player_stats
            .record_match(&record)
            .await
            .expect("aggregates should update");
        record
    }
}

pub struct TestSetupBuilder {
    servers: Vec<ServerInfo>,
    players: Vec<Player>,
    merge_max_retries: u32,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            servers: vec![],
            players: vec![],
            merge_max_retries: 32,
        }
    }

    pub fn with_servers(mut self, endpoints: Vec<&str>) -> Self {
        self.servers = endpoints
            .into_iter()
            .map(|endpoint| ServerInfo::new(endpoint, &format!("Server {}", endpoint), "EU"))
            .collect();
        self
    }

    pub fn with_players(mut self, usernames: Vec<&str>) -> Self {
        self.players = usernames
            .into_iter()
            .map(|username| Player::new(username, &username.to_uppercase()))
            .collect();
        self
    }

    pub fn with_four_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "charlie", "david"])
    }

    pub fn with_merge_max_retries(mut self, retries: u32) -> Self {
        self.merge_max_retries = retries;
        self
    }

    pub fn build(self) -> TestSetup {
        let matches = Arc::new(InMemoryMatchRepository::new());
        let state = self.build_state(
            matches.clone(),
            Arc::new(InMemoryPlayerStatsRepository::new()),
        );
        TestSetup { state, matches }
    }

    /// Builds state around caller-supplied stores, e.g. failing mocks
    pub fn build_state(
        self,
        matches: Arc<dyn MatchRepository + Send + Sync>,
        player_stats: Arc<dyn PlayerStatsRepository + Send + Sync>,
    ) -> AppState {
        AppState::new(
            Arc::new(InMemoryCatalogRepository::with_entries(
                self.servers,
                self.players,
            )),
            matches,
            player_stats,
            self.merge_max_retries,
        )
    }
}
