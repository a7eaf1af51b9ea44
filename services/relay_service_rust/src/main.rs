use anyhow::{Context, Result};
use chessrelay_rust_core::clients::{LichessClient, TelegramClient};
use chessrelay_rust_core::db::{create_pool, DbPoolConfig, PgSubscriberDirectory};
use chessrelay_rust_core::relay::RelayEngine;
use dotenv::dotenv;
use relay_service_rust::{run_command_loop, CommandHandler, Config};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Rust Relay Service...");

    let cfg = Config::from_env()?;
    info!(
        "Config: team={} base_url={} roster={}s poll={}s horizon={}s",
        cfg.lichess_team_id,
        cfg.lichess_base_url,
        cfg.relay.roster_sync_interval.as_secs(),
        cfg.relay.status_poll_interval.as_secs(),
        cfg.relay.dedup_horizon.as_secs(),
    );

    // Subscriber store
    let pool_cfg = DbPoolConfig::from_env_with_defaults(DbPoolConfig::default());
    let pool = create_pool(&cfg.database_url, &pool_cfg).await?;
    let directory = Arc::new(PgSubscriberDirectory::new(pool));
    directory
        .ensure_schema()
        .await
        .context("Failed to prepare subscriber table")?;

    // Upstream clients
    let lichess = Arc::new(LichessClient::new(
        cfg.lichess_base_url.clone(),
        cfg.lichess_team_id.clone(),
    ));
    let telegram = TelegramClient::new(cfg.telegram_token.clone());

    let handle = RelayEngine {
        roster: lichess.clone(),
        activity: lichess,
        directory: directory.clone(),
        transport: Arc::new(telegram.clone()),
    }
    .start(cfg.relay.clone());

    // Inbound commands
    let (stop_tx, stop_rx) = watch::channel(false);
    let handler = CommandHandler::new(directory, handle.maintenance(), handle.dedup(), cfg.master_id);
    let commands = tokio::spawn(run_command_loop(telegram, handler, stop_rx));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }

    stop_tx.send_replace(true);
    if let Err(e) = commands.await {
        error!("Command loop ended abnormally: {}", e);
    }
    handle.shutdown().await;

    Ok(())
}
