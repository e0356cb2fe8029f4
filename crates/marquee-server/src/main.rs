//! Marquee server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `marquee.yaml` plus environment
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations
//! 4. Build shared state and warm the timeline cache
//! 5. Spawn the timeline change listener
//! 6. Serve HTTP until `Ctrl-C`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use marquee_db::{PgBackend, PostgresPool, listen_for_timeline_changes};
use marquee_server::config::{DEFAULT_CONFIG_PATH, LoggingConfig, MarqueeConfig};
use marquee_server::{AppState, Verifier, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("MARQUEE_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = MarqueeConfig::load(&config_path).context("loading configuration")?;

    init_tracing(&config.logging);
    info!(
        config = %config_path.display(),
        require_open = config.voting.require_open,
        turnstile = config.turnstile.enabled,
        "marquee-server starting"
    );

    let pool = PostgresPool::connect(&config.database.pool_config())
        .await
        .context("connecting to PostgreSQL")?;
    if config.database.run_migrations {
        pool.run_migrations().await.context("running migrations")?;
    }

    let backend = Arc::new(PgBackend::new(&pool));
    let verifier = Verifier::from_config(&config.turnstile);
    info!(verifier = verifier.name(), "Verifier configured");

    let state = Arc::new(AppState::new(
        backend,
        verifier,
        config.voting.require_open,
    ));

    if let Err(e) = state.timeline.fetch_or_get().await {
        tracing::warn!(error = %e, "Initial timeline fetch failed, will retry on first request");
    }

    if config.database.listen_for_changes {
        let store = Arc::clone(&state.timeline);
        let listen_pool = pool.clone();
        tokio::spawn(async move {
            if let Err(e) = listen_for_timeline_changes(&listen_pool, &store).await {
                tracing::error!(error = %e, "Timeline listener stopped");
            }
        });
    }

    start_server(&config.server, state)
        .await
        .context("running HTTP server")?;

    pool.close().await;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}
