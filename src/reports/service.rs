use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::models::{PlayerStats, ServerStats};
use crate::catalog::{CatalogRepository, ServerInfo};
use crate::matches::{Match, MatchRepository};
use crate::player_stats::PlayerStatsService;
use crate::shared::AppError;

/// Read-only queries over matches, aggregates and the catalog.
///
/// Storage failures are returned to the caller; nothing here degrades to an
/// empty result on error. Queries never write, so dropping one mid-flight
/// leaves no trace.
pub struct ReportService {
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
    matches: Arc<dyn MatchRepository + Send + Sync>,
    player_stats: Arc<PlayerStatsService>,
}

impl ReportService {
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

    #[instrument(skip(self))]
    pub async fn recent_matches(&self, limit: usize) -> Result<Vec<Match>, AppError> {
        debug!("Getting recent matches");
        self.matches.find_recent(limit).await
    }

    /// Highest-rated players with at least one match; ties go to the
    /// alphabetically first username.
    #[instrument(skip(self))]
    pub async fn best_players(&self, limit: usize) -> Result<Vec<PlayerStats>, AppError> {
        debug!("Getting best players");
        if limit == 0 {
            return Ok(Vec::new());
        }

        let players = self.catalog.all_players().await?;
        let mut ranked: Vec<PlayerStats> = try_join_all(players.iter().map(|player| async move {
            let aggregate = self.player_stats.get(&player.username).await?;
            Ok::<_, AppError>(PlayerStats::from_aggregate(player, &aggregate))
        }))
        .await?
        .into_iter()
        .filter(|stats| stats.total_matches > 0)
        .collect();

        ranked.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then_with(|| a.username.cmp(&b.username))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Servers with the most matches; ties go to the alphabetically first
    /// endpoint.
    #[instrument(skip(self))]
    pub async fn popular_servers(&self, limit: usize) -> Result<Vec<ServerStats>, AppError> {
        debug!("Getting popular servers");
        if limit == 0 {
            return Ok(Vec::new());
        }

        let servers = self.catalog.all_servers().await?;
        let mut ranked =
            try_join_all(servers.iter().map(|server| self.build_server_stats(server))).await?;

        ranked.sort_by(|a, b| {
            b.total_matches
                .cmp(&a.total_matches)
                .then_with(|| a.endpoint.cmp(&b.endpoint))
        });
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// `None` when the player is not in the catalog
    #[instrument(skip(self))]
    pub async fn player_stats(&self, username: &str) -> Result<Option<PlayerStats>, AppError> {
        let Some(player) = self.catalog.find_player(username).await? else {
            debug!("Player not found");
            return Ok(None);
        };
        let aggregate = self.player_stats.get(&player.username).await?;
        Ok(Some(PlayerStats::from_aggregate(&player, &aggregate)))
    }

    /// `None` when the server is not in the catalog
    #[instrument(skip(self))]
    pub async fn server_stats(&self, endpoint: &str) -> Result<Option<ServerStats>, AppError> {
        let Some(server) = self.catalog.find_server(endpoint).await? else {
            debug!("Server not found");
            return Ok(None);
        };
        Ok(Some(self.build_server_stats(&server).await?))
    }

    #[instrument(skip(self))]
    pub async fn matches_since(
        &self,
        endpoint: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Match>, AppError> {
        self.matches.find_by_server_since(endpoint, since).await
    }

    async fn build_server_stats(&self, server: &ServerInfo) -> Result<ServerStats, AppError> {
        let matches = self.matches.find_by_server_endpoint(&server.endpoint).await?;
        Ok(ServerStats::from_matches(server, &matches))
    }
}
