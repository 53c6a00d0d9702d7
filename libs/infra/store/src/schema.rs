// [libs/infra/store/src/schema.rs]
/*!
 * Three-stratum migration shape: base tables, then idempotent ALTER
 * TABLE patches (tolerant of "duplicate column name" on replay), then
 * indexes. Forward-only, named with ascending identifiers.
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_INSTANCES", r#"
        CREATE TABLE IF NOT EXISTS instances (
            instance_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            is_paused INTEGER NOT NULL DEFAULT 0,
            paused_until_utc TEXT,
            check_interval_seconds INTEGER NOT NULL DEFAULT 60,
            concurrency_limit INTEGER NOT NULL DEFAULT 4,
            time_zone_id TEXT NOT NULL DEFAULT 'Etc/UTC',
            created_utc TEXT NOT NULL
        );
    "#),
    ("TABLE_TARGETS", r#"
        CREATE TABLE IF NOT EXISTS targets (
            target_id INTEGER PRIMARY KEY AUTOINCREMENT,
            instance_id TEXT NOT NULL REFERENCES instances(instance_id),
            url TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            http_expected_status_min INTEGER NOT NULL DEFAULT 200,
            http_expected_status_max INTEGER NOT NULL DEFAULT 399,
            login_rule TEXT
        );
    "#),
    ("TABLE_CHECKS", r#"
        CREATE TABLE IF NOT EXISTS checks (
            check_id INTEGER PRIMARY KEY AUTOINCREMENT,
            target_id INTEGER NOT NULL REFERENCES targets(target_id),
            timestamp_utc TEXT NOT NULL,
            tcp_ok INTEGER NOT NULL,
            http_ok INTEGER NOT NULL,
            http_status_code INTEGER,
            tcp_latency_ms INTEGER,
            http_latency_ms INTEGER,
            final_url TEXT,
            used_ip TEXT,
            detected_login_type TEXT,
            login_detected INTEGER NOT NULL DEFAULT 0,
            summary TEXT NOT NULL
        );
    "#),
    ("TABLE_TARGET_STATE", r#"
        CREATE TABLE IF NOT EXISTS target_state (
            target_id INTEGER PRIMARY KEY REFERENCES targets(target_id),
            is_up INTEGER NOT NULL,
            last_check_utc TEXT NOT NULL,
            state_since_utc TEXT NOT NULL,
            last_change_utc TEXT NOT NULL,
            consecutive_failures INTEGER NOT NULL DEFAULT 0,
            last_summary TEXT NOT NULL DEFAULT '',
            last_final_url TEXT,
            last_used_ip TEXT,
            last_detected_login_type TEXT,
            login_detected_last INTEGER NOT NULL DEFAULT 0,
            login_detected_ever INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_EVENTS", r#"
        CREATE TABLE IF NOT EXISTS events (
            event_id INTEGER PRIMARY KEY AUTOINCREMENT,
            instance_id TEXT NOT NULL REFERENCES instances(instance_id),
            target_id INTEGER,
            timestamp_utc TEXT NOT NULL,
            event_type TEXT NOT NULL,
            message TEXT NOT NULL
        );
    "#),
    ("TABLE_SMTP_SETTINGS", r#"
        CREATE TABLE IF NOT EXISTS smtp_settings (
            instance_id TEXT PRIMARY KEY REFERENCES instances(instance_id),
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            security_mode TEXT NOT NULL DEFAULT 'None',
            username TEXT,
            password_protected TEXT,
            from_address TEXT NOT NULL
        );
    "#),
    ("TABLE_RECIPIENTS", r#"
        CREATE TABLE IF NOT EXISTS recipients (
            instance_id TEXT NOT NULL REFERENCES instances(instance_id),
            email TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (instance_id, email)
        );
    "#),
    ("TABLE_WEBHOOK_ENDPOINTS", r#"
        CREATE TABLE IF NOT EXISTS webhook_endpoints (
            instance_id TEXT NOT NULL REFERENCES instances(instance_id),
            url TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (instance_id, url)
        );
    "#),
];

/// Per-instance alert-ladder overrides and the crash breadcrumb land as
/// nullable columns so existing instance rows keep working unmodified.
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    ("INSTANCE_DOWN_AFTER", "ALTER TABLE instances ADD COLUMN down_after_seconds INTEGER"),
    ("INSTANCE_RECOVERED_AFTER", "ALTER TABLE instances ADD COLUMN recovered_after_seconds INTEGER"),
    ("INSTANCE_REPEAT_U24H", "ALTER TABLE instances ADD COLUMN repeat_every_seconds_under24h INTEGER"),
    ("INSTANCE_REPEAT_24_72H", "ALTER TABLE instances ADD COLUMN repeat_every_seconds_24h_to72h INTEGER"),
    ("INSTANCE_DAILY_AFTER", "ALTER TABLE instances ADD COLUMN daily_after_hours INTEGER"),
    ("INSTANCE_DAILY_HOUR", "ALTER TABLE instances ADD COLUMN daily_hour_local INTEGER"),
    ("INSTANCE_DAILY_MINUTE", "ALTER TABLE instances ADD COLUMN daily_minute_local INTEGER"),
    ("INSTANCE_LAST_CRASH_MSG", "ALTER TABLE instances ADD COLUMN last_crash_message TEXT"),
    ("INSTANCE_LAST_CRASH_UTC", "ALTER TABLE instances ADD COLUMN last_crash_utc TEXT"),
    ("TARGET_STATE_DOWN_FIRST_NOTIFIED", "ALTER TABLE target_state ADD COLUMN down_first_notified_utc TEXT"),
    ("TARGET_STATE_LAST_NOTIFIED", "ALTER TABLE target_state ADD COLUMN last_notified_utc TEXT"),
    ("TARGET_STATE_NEXT_NOTIFY", "ALTER TABLE target_state ADD COLUMN next_notify_utc TEXT"),
    ("TARGET_STATE_RECOVERED_DUE", "ALTER TABLE target_state ADD COLUMN recovered_due_utc TEXT"),
    ("TARGET_STATE_RECOVERED_NOTIFIED", "ALTER TABLE target_state ADD COLUMN recovered_notified_utc TEXT"),
];

const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_TARGETS_INSTANCE", "CREATE INDEX IF NOT EXISTS idx_targets_instance ON targets(instance_id);"),
    ("IDX_CHECKS_TARGET_TS", "CREATE INDEX IF NOT EXISTS idx_checks_target_ts ON checks(target_id, timestamp_utc);"),
    ("IDX_EVENTS_INSTANCE_TS", "CREATE INDEX IF NOT EXISTS idx_events_instance_ts ON events(instance_id, timestamp_utc);"),
    ("IDX_RECIPIENTS_INSTANCE", "CREATE INDEX IF NOT EXISTS idx_recipients_instance ON recipients(instance_id);"),
    ("IDX_WEBHOOKS_INSTANCE", "CREATE INDEX IF NOT EXISTS idx_webhooks_instance ON webhook_endpoints(instance_id);"),
];

#[instrument(skip(connection))]
pub async fn apply_full_schema(connection: &Connection) -> Result<()> {
    info!("applying website-monitor schema");
    solidify_base_strata(connection).await?;
    execute_evolutionary_repair(connection).await?;
    harden_access_layer(connection).await?;
    info!("schema synchronized");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("solidifying {identifier}");
        db.execute(sql, ()).await.with_context(|| format!("base table failed: {identifier}"))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(sql, ()).await {
            Ok(_) => debug!("applied evolutionary stratum {identifier}"),
            Err(error) => {
                let message = error.to_string();
                if message.contains("duplicate column name") {
                    debug!("{identifier} already applied");
                } else {
                    warn!("evolutionary stratum {identifier} incomplete: {message}");
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("hardening {identifier}");
        db.execute(sql, ()).await.with_context(|| format!("index failed: {identifier}"))?;
    }
    Ok(())
}
