// [apps/monitor/src/config.rs]
//! Environment-driven configuration: every tunable this engine reads at
//! startup. `dotenvy`-backed env loading, minus an HTTP port — this
//! engine exposes no network listener of its own.

use std::path::PathBuf;

use crate::alert::ladder::AlertDefaults;

/// Global configuration, resolved once at startup and shared read-only
/// for the life of the process.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the store file plus the Protector's key material.
    pub data_root: PathBuf,
    /// `libsql` connection URL. Defaults to a file under `data_root`.
    pub database_url: String,
    pub database_auth_token: Option<String>,
    /// Alert-evaluator ticker cadence ("periodic ticker,
    /// default 15 s").
    pub scheduler_tick_seconds: u64,
    /// Used only to build absolute links in notification bodies.
    pub public_base_url: Option<String>,
    pub alert_defaults: AlertDefaults,
}

impl Config {
    /// Reads `dotenvy`-hydrated environment variables, falling back to
    /// the documented defaults for anything unset.
    pub fn from_env() -> Self {
        let data_root = env_path("DATA_ROOT", "./data");
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| format!("{}/monitor.db", data_root.display()));

        Self {
            database_url,
            database_auth_token: std::env::var("TURSO_AUTH_TOKEN").ok(),
            data_root,
            scheduler_tick_seconds: env_u64("SCHEDULER_TICK_SECONDS", 15),
            public_base_url: std::env::var("PUBLIC_BASE_URL").ok(),
            alert_defaults: AlertDefaults {
                down_after_seconds: env_u64("DOWN_AFTER_SECONDS", 180),
                recovered_after_seconds: env_u64("RECOVERED_AFTER_SECONDS", 60),
                repeat_every_seconds_under24h: env_u64("REPEAT_EVERY_SECONDS_UNDER24H", 1800),
                repeat_every_seconds_24h_to72h: env_u64("REPEAT_EVERY_SECONDS_24H_TO72H", 3600),
                daily_after_hours: env_u64("DAILY_AFTER_HOURS", 72),
                daily_hour_local: env_u32("DAILY_HOUR_LOCAL", 10),
                daily_minute_local: env_u32("DAILY_MINUTE_LOCAL", 0),
            },
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
