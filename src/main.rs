use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchstats::catalog::seed_catalog;
use matchstats::config::{Settings, StoreBackend};
use matchstats::database;
use matchstats::generator::{start_match_generator, MatchGenerator};
use matchstats::{AppError, AppState};

const LEADERBOARD_SIZE: usize = 10;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matchstats=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Match statistics service stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let settings = Settings::from_env()?;
    info!(store = %settings.store, "Starting match statistics service");

    let app_state = match settings.store {
        StoreBackend::Postgres => {
            // Settings guarantee a URL for this backend
            let database_url = settings.database_url.as_deref().unwrap_or_default();
            let pool = database::connect(database_url, settings.store_timeout).await?;
            database::apply_schema(&pool, settings.store_timeout).await?;
            AppState::postgres(pool, settings.store_timeout, settings.merge_max_retries)
        }
        StoreBackend::Memory => AppState::in_memory(settings.merge_max_retries),
    };

    let seeded = seed_catalog(&app_state.catalog, &settings.catalog_sources()).await?;
    info!(
        servers = seeded.servers_loaded,
        players = seeded.players_loaded,
        "Catalog ready"
    );

    let generator = Arc::new(MatchGenerator::from_state(&app_state));
    let generator_task = tokio::spawn(start_match_generator(
        generator,
        settings.generator_config(),
    ));

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");
    generator_task.abort();

    match app_state.reports.best_players(LEADERBOARD_SIZE).await {
        Ok(leaders) => {
            for (position, player) in leaders.iter().enumerate() {
                info!(
                    position = position + 1,
                    username = %player.username,
                    rating = player.rating,
                    matches = player.total_matches,
                    "Leaderboard"
                );
            }
        }
        Err(e) => warn!(error = %e, "Failed to read final leaderboard"),
    }

    Ok(())
}
