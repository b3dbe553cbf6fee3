use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::models::{Player, ServerInfo};
use crate::shared::{with_timeout, AppError};

/// Read access to the static server/player reference data.
///
/// Listing operations return entries sorted by key so that every consumer
/// sees a deterministic order.
#[async_trait]
pub trait CatalogRepository {
    async fn all_servers(&self) -> Result<Vec<ServerInfo>, AppError>;
    async fn all_players(&self) -> Result<Vec<Player>, AppError>;
    async fn find_server(&self, endpoint: &str) -> Result<Option<ServerInfo>, AppError>;
    async fn find_player(&self, username: &str) -> Result<Option<Player>, AppError>;
    async fn has_servers(&self) -> Result<bool, AppError>;
    async fn has_players(&self) -> Result<bool, AppError>;

    /// Inserts or replaces servers by endpoint; used when seeding the catalog
    async fn save_servers(&self, servers: &[ServerInfo]) -> Result<usize, AppError>;

    /// Inserts or replaces players by username; used when seeding the catalog
    async fn save_players(&self, players: &[Player]) -> Result<usize, AppError>;
}

/// In-memory catalog for development and testing
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    servers: RwLock<BTreeMap<String, ServerInfo>>,
    players: RwLock<BTreeMap<String, Player>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog pre-populated with the given entries
    pub fn with_entries(servers: Vec<ServerInfo>, players: Vec<Player>) -> Self {
        Self {
            servers: RwLock::new(
                servers
                    .into_iter()
                    .map(|s| (s.endpoint.clone(), s))
                    .collect(),
            ),
            players: RwLock::new(
                players
                    .into_iter()
                    .map(|p| (p.username.clone(), p))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn all_servers(&self) -> Result<Vec<ServerInfo>, AppError> {
        Ok(self.servers.read().await.values().cloned().collect())
    }

    async fn all_players(&self) -> Result<Vec<Player>, AppError> {
        Ok(self.players.read().await.values().cloned().collect())
    }

    async fn find_server(&self, endpoint: &str) -> Result<Option<ServerInfo>, AppError> {
        Ok(self.servers.read().await.get(endpoint).cloned())
    }

    async fn find_player(&self, username: &str) -> Result<Option<Player>, AppError> {
        Ok(self.players.read().await.get(username).cloned())
    }

    async fn has_servers(&self) -> Result<bool, AppError> {
        Ok(!self.servers.read().await.is_empty())
    }

    async fn has_players(&self) -> Result<bool, AppError> {
        Ok(!self.players.read().await.is_empty())
    }

    #[instrument(skip(self, servers), fields(count = servers.len()))]
    async fn save_servers(&self, servers: &[ServerInfo]) -> Result<usize, AppError> {
        let mut stored = self.servers.write().await;
        for server in servers {
            stored.insert(server.endpoint.clone(), server.clone());
        }
        debug!("Servers saved in memory");
        Ok(servers.len())
    }

    #[instrument(skip(self, players), fields(count = players.len()))]
    async fn save_players(&self, players: &[Player]) -> Result<usize, AppError> {
        let mut stored = self.players.write().await;
        for player in players {
            stored.insert(player.username.clone(), player.clone());
        }
        debug!("Players saved in memory");
        Ok(players.len())
    }
}

/// PostgreSQL implementation of the catalog
pub struct PostgresCatalogRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[instrument(skip(self))]
    async fn all_servers(&self) -> Result<Vec<ServerInfo>, AppError> {
        with_timeout(self.timeout, "list servers", async {
            sqlx::query_as::<_, ServerInfo>(
                "SELECT endpoint, name, region FROM servers ORDER BY endpoint",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn all_players(&self) -> Result<Vec<Player>, AppError> {
        with_timeout(self.timeout, "list players", async {
            sqlx::query_as::<_, Player>(
                "SELECT username, display_name, level, country FROM players ORDER BY username",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn find_server(&self, endpoint: &str) -> Result<Option<ServerInfo>, AppError> {
        with_timeout(self.timeout, "find server", async {
            sqlx::query_as::<_, ServerInfo>(
                "SELECT endpoint, name, region FROM servers WHERE endpoint = $1",
            )
            .bind(endpoint)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn find_player(&self, username: &str) -> Result<Option<Player>, AppError> {
        with_timeout(self.timeout, "find player", async {
            sqlx::query_as::<_, Player>(
                "SELECT username, display_name, level, country FROM players WHERE username = $1",
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
        })
        .await
    }

    async fn has_servers(&self) -> Result<bool, AppError> {
        with_timeout(self.timeout, "count servers", async {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM servers)")
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)
        })
        .await
    }

    async fn has_players(&self) -> Result<bool, AppError> {
        with_timeout(self.timeout, "count players", async {
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM players)")
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)
        })
        .await
    }

    #[instrument(skip(self, servers), fields(count = servers.len()))]
    async fn save_servers(&self, servers: &[ServerInfo]) -> Result<usize, AppError> {
        let endpoints: Vec<String> = servers.iter().map(|s| s.endpoint.clone()).collect();
        let names: Vec<String> = servers.iter().map(|s| s.name.clone()).collect();
        let regions: Vec<String> = servers.iter().map(|s| s.region.clone()).collect();

        let affected = with_timeout(self.timeout, "save servers", async {
            sqlx::query(
                "INSERT INTO servers (endpoint, name, region) \
                 SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[]) \
                 ON CONFLICT (endpoint) DO UPDATE SET name = EXCLUDED.name, region = EXCLUDED.region",
            )
            .bind(&endpoints)
            .bind(&names)
            .bind(&regions)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(AppError::from)
        })
        .await?;

        debug!(affected, "Servers saved in database");
        Ok(affected as usize)
    }

    #[instrument(skip(self, players), fields(count = players.len()))]
    async fn save_players(&self, players: &[Player]) -> Result<usize, AppError> {
        let usernames: Vec<String> = players.iter().map(|p| p.username.clone()).collect();
        let display_names: Vec<String> = players.iter().map(|p| p.display_name.clone()).collect();
        let levels: Vec<i32> = players.iter().map(|p| p.level).collect();
        let countries: Vec<String> = players.iter().map(|p| p.country.clone()).collect();

        let affected = with_timeout(self.timeout, "save players", async {
            sqlx::query(
                "INSERT INTO players (username, display_name, level, country) \
                 SELECT * FROM UNNEST($1::text[], $2::text[], $3::int4[], $4::text[]) \
                 ON CONFLICT (username) DO UPDATE SET display_name = EXCLUDED.display_name, \
                 level = EXCLUDED.level, country = EXCLUDED.country",
            )
            .bind(&usernames)
            .bind(&display_names)
            .bind(&levels)
            .bind(&countries)
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(AppError::from)
        })
        .await?;

        debug!(affected, "Players saved in database");
        Ok(affected as usize)
    }
}
