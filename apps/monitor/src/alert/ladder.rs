// [apps/monitor/src/alert/ladder.rs]
//! The escalation ladder's pure arithmetic: configuration constants and
//! the next-notify calculation. Kept free of I/O so the escalation
//! properties are unit-testable without a store or a running
//! evaluator.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use monitor_core_timezone::Zone;
use monitor_domain_models::Instance;

/// Global alert-ladder defaults, overridable per instance: each field is
/// optional on `Instance`, falling back to these global defaults.
#[derive(Debug, Clone, Copy)]
pub struct AlertDefaults {
    pub down_after_seconds: u64,
    pub recovered_after_seconds: u64,
    pub repeat_every_seconds_under24h: u64,
    pub repeat_every_seconds_24h_to72h: u64,
    pub daily_after_hours: u64,
    pub daily_hour_local: u32,
    pub daily_minute_local: u32,
}

/// Resolves an instance's effective ladder, taking its overrides where
/// present and falling back to the process-wide defaults otherwise.
pub fn resolve_for_instance(instance: &Instance, defaults: &AlertDefaults) -> AlertDefaults {
    AlertDefaults {
        down_after_seconds: instance.down_after_seconds.unwrap_or(defaults.down_after_seconds),
        recovered_after_seconds: instance.recovered_after_seconds.unwrap_or(defaults.recovered_after_seconds),
        repeat_every_seconds_under24h: instance
            .repeat_every_seconds_under24h
            .unwrap_or(defaults.repeat_every_seconds_under24h),
        repeat_every_seconds_24h_to72h: instance
            .repeat_every_seconds_24h_to72h
            .unwrap_or(defaults.repeat_every_seconds_24h_to72h),
        daily_after_hours: instance.daily_after_hours.unwrap_or(defaults.daily_after_hours),
        daily_hour_local: instance.daily_hour_local.unwrap_or(defaults.daily_hour_local),
        daily_minute_local: instance.daily_minute_local.unwrap_or(defaults.daily_minute_local),
    }
}

/// `next(downStart, lastSent, tz)` from  `age` is measured from
/// `down_start` to `last_sent`, the instant the most recent notification
/// went out — not `now` — so the ladder advances strictly forward from
/// the last send.
pub fn next_notify(down_start: DateTime<Utc>, last_sent: DateTime<Utc>, zone: &Zone, ladder: &AlertDefaults) -> DateTime<Utc> {
    let age = last_sent - down_start;

    if age < ChronoDuration::hours(24) {
        return last_sent + ChronoDuration::seconds(ladder.repeat_every_seconds_under24h as i64);
    }

    if age < ChronoDuration::hours(ladder.daily_after_hours as i64) {
        return last_sent + ChronoDuration::seconds(ladder.repeat_every_seconds_24h_to72h as i64);
    }

    next_daily_instant(last_sent, zone, ladder)
}

/// Today's `dailyHourLocal:dailyMinuteLocal` in `zone`, converted to UTC;
/// rolled forward a day if that instant has already passed `after`.
fn next_daily_instant(after: DateTime<Utc>, zone: &Zone, ladder: &AlertDefaults) -> DateTime<Utc> {
    let local_after = monitor_core_timezone::to_local(after, zone);
    let wall_time = NaiveTime::from_hms_opt(ladder.daily_hour_local, ladder.daily_minute_local, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(10, 0, 0).unwrap());

    let mut candidate_local_date = local_after.date_naive();
    let mut candidate_wall = candidate_local_date.and_time(wall_time);
    let mut candidate_utc = monitor_core_timezone::to_utc(candidate_wall, zone);

    if candidate_utc <= after {
        candidate_local_date = candidate_local_date.succ_opt().unwrap_or(candidate_local_date);
        candidate_wall = candidate_local_date.and_time(wall_time);
        candidate_utc = monitor_core_timezone::to_utc(candidate_wall, zone);
    }

    candidate_utc
}
