use anyhow::{anyhow, Context, Result};
use chessrelay_rust_core::clients::lichess::DEFAULT_BASE_URL;
use chessrelay_rust_core::relay::dispatcher::DEFAULT_MAINTENANCE_MESSAGE;
use chessrelay_rust_core::relay::RelayConfig;
use std::env;
use std::time::Duration;

/// Only this chat user may trigger the maintenance broadcast.
pub const DEFAULT_MASTER_ID: i64 = 731217828;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub database_url: String,

    pub lichess_base_url: String,
    pub lichess_team_id: String,

    pub master_id: i64,

    pub relay: RelayConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let telegram_token = env::var("TG_BOT_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .context("TG_BOT_TOKEN must be set")?;

        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("DSN_BOT"))
            .context("DATABASE_URL (or DSN_BOT) must be set to a Postgres DSN")?;

        let lichess_base_url =
            env::var("LICHESS_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let lichess_team_id =
            env::var("LICHESS_TEAM_ID").unwrap_or_else(|_| "chesswahili".to_string());

        let master_id = parse_i64_env("MASTER_ID", DEFAULT_MASTER_ID)?;

        let defaults = RelayConfig::default();
        let relay = RelayConfig {
            roster_sync_interval: parse_secs_env("ROSTER_SYNC_INTERVAL_SECS", defaults.roster_sync_interval)?,
            status_poll_interval: parse_secs_env("STATUS_POLL_INTERVAL_SECS", defaults.status_poll_interval)?,
            poll_concurrency: parse_usize_env("POLL_CONCURRENCY", defaults.poll_concurrency)?,
            dedup_horizon: parse_secs_env("DEDUP_HORIZON_SECS", defaults.dedup_horizon)?,
            dedup_sweep_interval: parse_secs_env("DEDUP_SWEEP_INTERVAL_SECS", defaults.dedup_sweep_interval)?,
            event_queue_capacity: parse_usize_env("EVENT_QUEUE_CAPACITY", defaults.event_queue_capacity)?,
            maintenance_message: env::var("MAINTENANCE_MESSAGE")
                .unwrap_or_else(|_| DEFAULT_MAINTENANCE_MESSAGE.to_string()),
        };

        Ok(Self {
            telegram_token,
            database_url,
            lichess_base_url,
            lichess_team_id,
            master_id,
            relay,
        })
    }
}

fn parse_secs_env(key: &str, default: Duration) -> Result<Duration> {
    let secs = match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid {key}: {raw} (expected seconds)"))?,
        Err(_) => return Ok(default),
    };
    if secs == 0 {
        return Err(anyhow!("{key} must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_usize_env(key: &str, default: usize) -> Result<usize> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<usize>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer)"))
}

fn parse_i64_env(key: &str, default: i64) -> Result<i64> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid {key}: {raw} (expected integer id)"))
}
