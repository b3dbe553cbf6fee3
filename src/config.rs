use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum_macros::{Display, EnumString};

use crate::catalog::CatalogSources;
use crate::generator::GeneratorConfig;
use crate::player_stats::DEFAULT_MERGE_MAX_RETRIES;
use crate::shared::AppError;

/// Which storage backend the repositories use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// Runtime settings, read from `STATS_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    /// Upper bound on every storage call, including pool acquisition
    pub store_timeout: Duration,
    pub match_interval: Duration,
    pub merge_max_retries: u32,
    pub servers_path: PathBuf,
    pub players_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        let sources = CatalogSources::default();
        Self {
            store: StoreBackend::Memory,
            database_url: None,
            store_timeout: Duration::from_millis(2000),
            match_interval: GeneratorConfig::default().interval,
            merge_max_retries: DEFAULT_MERGE_MAX_RETRIES,
            servers_path: sources.servers_path,
            players_path: sources.players_path,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(store) = lookup("STATS_STORE") {
            settings.store = StoreBackend::from_str(store.trim()).map_err(|_| {
                AppError::Config(format!(
                    "STATS_STORE must be 'memory' or 'postgres', got '{}'",
                    store
                ))
            })?;
        }
        settings.database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        if let Some(ms) = parse_positive::<u64, _>(&lookup, "STATS_STORE_TIMEOUT_MS")? {
            settings.store_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_positive::<u64, _>(&lookup, "STATS_MATCH_INTERVAL_SECS")? {
            settings.match_interval = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_positive::<u32, _>(&lookup, "STATS_MERGE_MAX_RETRIES")? {
            settings.merge_max_retries = retries;
        }
        if let Some(path) = lookup("STATS_SERVERS_PATH") {
            settings.servers_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("STATS_PLAYERS_PATH") {
            settings.players_path = PathBuf::from(path);
        }

        if settings.store == StoreBackend::Postgres && settings.database_url.is_none() {
            return Err(AppError::Config(
                "DATABASE_URL must be set when STATS_STORE=postgres".to_string(),
            ));
        }

        Ok(settings)
    }

    pub fn catalog_sources(&self) -> CatalogSources {
        CatalogSources {
            servers_path: self.servers_path.clone(),
            players_path: self.players_path.clone(),
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            interval: self.match_interval,
        }
    }
}

fn parse_positive<T, F>(lookup: &F, key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr + PartialOrd + Default,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(Some(value)),
        _ => Err(AppError::Config(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
