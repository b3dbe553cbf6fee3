use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::models::{Player, ServerInfo};
use super::repository::CatalogRepository;
use crate::shared::AppError;

/// Locations of the JSON files used to seed an empty catalog
#[derive(Debug, Clone)]
pub struct CatalogSources {
    pub servers_path: PathBuf,
    pub players_path: PathBuf,
}

impl Default for CatalogSources {
    fn default() -> Self {
        Self {
            servers_path: PathBuf::from("data/servers.json"),
            players_path: PathBuf::from("data/players.json"),
        }
    }
}

/// Number of entries written by a seeding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub servers_loaded: usize,
    pub players_loaded: usize,
}

/// Fills the server and player catalogs from JSON files, each only if it is
/// currently empty.
///
/// Unreadable or malformed files are logged and leave that catalog untouched;
/// storage failures are returned.
#[instrument(skip(catalog))]
pub async fn seed_catalog(
    catalog: &Arc<dyn CatalogRepository + Send + Sync>,
    sources: &CatalogSources,
) -> Result<SeedSummary, AppError> {
    let mut summary = SeedSummary::default();

    if catalog.has_servers().await? {
        info!("Servers already present, skipping load");
    } else {
        match read_entries::<ServerInfo>(&sources.servers_path).await {
            Ok(servers) if servers.is_empty() => {
                warn!(path = %sources.servers_path.display(), "No server data found");
            }
            Ok(servers) => {
                summary.servers_loaded = catalog.save_servers(&servers).await?;
                info!(count = summary.servers_loaded, "Loaded servers");
            }
            Err(e) => warn!(error = %e, "Failed to load servers"),
        }
    }

    if catalog.has_players().await? {
        info!("Players already present, skipping load");
    } else {
        match read_entries::<Player>(&sources.players_path).await {
            Ok(players) if players.is_empty() => {
                warn!(path = %sources.players_path.display(), "No player data found");
            }
            Ok(players) => {
                summary.players_loaded = catalog.save_players(&players).await?;
                info!(count = summary.players_loaded, "Loaded players");
            }
            Err(e) => warn!(error = %e, "Failed to load players"),
        }
    }

    Ok(summary)
}

async fn read_entries<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Catalog(format!("{}: {}", path.display(), e)))?;

    serde_json::from_str(&raw).map_err(|e| AppError::Catalog(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repository::InMemoryCatalogRepository;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "matchstats-{}-{}",
            uuid::Uuid::new_v4(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_seeds_empty_catalog() {
        let catalog: Arc<dyn CatalogRepository + Send + Sync> =
            Arc::new(InMemoryCatalogRepository::new());
        let sources = CatalogSources {
            servers_path: temp_file(
                "servers.json",
                r#"[{"endpoint":"eu:1","name":"EU One","region":"EU"}]"#,
            ),
            players_path: temp_file(
                "players.json",
                r#"[{"username":"ace","displayName":"Ace"},{"username":"bo","displayName":"Bo"}]"#,
            ),
        };

        let summary = seed_catalog(&catalog, &sources).await.unwrap();

        assert_eq!(summary.servers_loaded, 1);
        assert_eq!(summary.players_loaded, 2);
        assert_eq!(catalog.all_players().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_skips_populated_catalog() {
        let catalog: Arc<dyn CatalogRepository + Send + Sync> =
            Arc::new(InMemoryCatalogRepository::with_entries(
                vec![ServerInfo::new("us:1", "US One", "US")],
                vec![Player::new("ace", "Ace")],
            ));
        let sources = CatalogSources {
            servers_path: temp_file(
                "servers.json",
                r#"[{"endpoint":"eu:1","name":"EU One","region":"EU"}]"#,
            ),
            players_path: temp_file("players.json", r#"[{"username":"bo","displayName":"Bo"}]"#),
        };

        let summary = seed_catalog(&catalog, &sources).await.unwrap();

        assert_eq!(summary, SeedSummary::default());
        assert!(catalog.find_server("eu:1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_or_malformed_files_leave_catalog_empty() {
        let catalog: Arc<dyn CatalogRepository + Send + Sync> =
            Arc::new(InMemoryCatalogRepository::new());
        let sources = CatalogSources {
            servers_path: PathBuf::from("/nonexistent/servers.json"),
            players_path: temp_file("players.json", "not json"),
        };

        let summary = seed_catalog(&catalog, &sources).await.unwrap();

        assert_eq!(summary, SeedSummary::default());
        assert!(!catalog.has_servers().await.unwrap());
        assert!(!catalog.has_players().await.unwrap());
    }
}
