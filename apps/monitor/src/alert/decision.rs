// [apps/monitor/src/alert/decision.rs]
//! Pure per-target alert decision: evaluation, per instance, per
//! target. Kept free of I/O — sending and persistence are the
//! evaluator's job — so the DOWN/UP branch logic is unit-testable
//! without a store, a clock, or a notification channel.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use monitor_core_timezone::Zone;
use monitor_domain_models::TargetState;
use monitor_domain_notification::AlertKind;

use super::ladder::{next_notify, AlertDefaults};

/// What the evaluator should do with one `TargetState` this tick.
pub struct Evaluation {
    /// The state to persist if no notification goes out this tick (the
    /// UP path's `recoveredDueUtc` can be set even when nothing sends).
    pub pending_state: TargetState,
    pub due: Option<AlertKind>,
}

/// Decides whether `state` is due a notification at `now`, per the
/// DOWN/UP branches of the evaluation algorithm.
pub fn decide(state: &TargetState, now: DateTime<Utc>, ladder: &AlertDefaults) -> Evaluation {
    let mut pending = state.clone();

    if !state.is_up {
        let down_age = now - state.state_since_utc;

        if state.down_first_notified_utc.is_none() {
            if down_age >= ChronoDuration::seconds(ladder.down_after_seconds as i64) {
                return Evaluation { pending_state: pending, due: Some(AlertKind::Down) };
            }
        } else if let Some(next_notify_utc) = state.next_notify_utc {
            if now >= next_notify_utc {
                return Evaluation { pending_state: pending, due: Some(AlertKind::DownRepeat) };
            }
        }
        return Evaluation { pending_state: pending, due: None };
    }

    // isUp: recovery path.
    if state.down_first_notified_utc.is_none() {
        pending.recovered_due_utc = None;
        pending.recovered_notified_utc = None;
        return Evaluation { pending_state: pending, due: None };
    }
    if state.recovered_notified_utc.is_some() {
        return Evaluation { pending_state: pending, due: None };
    }

    let recovered_due = pending
        .recovered_due_utc
        .unwrap_or_else(|| state.state_since_utc + ChronoDuration::seconds(ladder.recovered_after_seconds as i64));
    pending.recovered_due_utc = Some(recovered_due);

    if now >= recovered_due {
        return Evaluation { pending_state: pending, due: Some(AlertKind::Recovered) };
    }
    Evaluation { pending_state: pending, due: None }
}

/// Applies a successfully-delivered notification's bookkeeping on top of
/// `state` (usually `Evaluation::pending_state`). Only called once the
/// Notifier reports at least one channel delivered.
pub fn apply_delivered(mut state: TargetState, kind: AlertKind, now: DateTime<Utc>, zone: &Zone, ladder: &AlertDefaults) -> TargetState {
    match kind {
        AlertKind::Down => {
            state.down_first_notified_utc = Some(now);
            state.last_notified_utc = Some(now);
            state.next_notify_utc = Some(next_notify(state.state_since_utc, now, zone, ladder));
        }
        AlertKind::DownRepeat => {
            state.last_notified_utc = Some(now);
            state.next_notify_utc = Some(next_notify(state.state_since_utc, now, zone, ladder));
        }
        AlertKind::Recovered => {
            state.recovered_notified_utc = Some(now);
            state.down_first_notified_utc = None;
            state.last_notified_utc = None;
            state.next_notify_utc = None;
            state.recovered_due_utc = None;
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core_timezone::SystemTimeZoneResolver;
    use monitor_core_timezone::TimeZoneResolver;

    fn ladder() -> AlertDefaults {
        AlertDefaults {
            down_after_seconds: 180,
            recovered_after_seconds: 60,
            repeat_every_seconds_under24h: 1800,
            repeat_every_seconds_24h_to72h: 3600,
            daily_after_hours: 72,
            daily_hour_local: 10,
            daily_minute_local: 0,
        }
    }

    fn base_state(is_up: bool, since: DateTime<Utc>) -> TargetState {
        TargetState {
            target_id: 1,
            is_up,
            last_check_utc: since,
            state_since_utc: since,
            last_change_utc: since,
            consecutive_failures: if is_up { 0 } else { 1 },
            last_summary: "TCP OK".into(),
            last_final_url: None,
            last_used_ip: None,
            last_detected_login_type: None,
            login_detected_last: false,
            login_detected_ever: false,
            down_first_notified_utc: None,
            last_notified_utc: None,
            next_notify_utc: None,
            recovered_due_utc: None,
            recovered_notified_utc: None,
        }
    }

    #[test]
    fn down_under_threshold_is_not_due() {
        let down_since = Utc::now();
        let state = base_state(false, down_since);
        let now = down_since + ChronoDuration::seconds(60);
        let evaluation = decide(&state, now, &ladder());
        assert!(evaluation.due.is_none());
    }

    #[test]
    fn down_past_threshold_is_due_once() {
        let down_since = Utc::now();
        let state = base_state(false, down_since);
        let now = down_since + ChronoDuration::seconds(200);
        let evaluation = decide(&state, now, &ladder());
        assert_eq!(evaluation.due, Some(AlertKind::Down));
    }

    #[test]
    fn already_notified_down_waits_for_next_notify() {
        let down_since = Utc::now();
        let mut state = base_state(false, down_since);
        state.down_first_notified_utc = Some(down_since + ChronoDuration::seconds(200));
        state.last_notified_utc = Some(down_since + ChronoDuration::seconds(200));
        state.next_notify_utc = Some(down_since + ChronoDuration::seconds(2000));

        let too_early = decide(&state, down_since + ChronoDuration::seconds(500), &ladder());
        assert!(too_early.due.is_none());

        let on_time = decide(&state, down_since + ChronoDuration::seconds(2000), &ladder());
        assert_eq!(on_time.due, Some(AlertKind::DownRepeat));
    }

    #[test]
    fn up_without_prior_down_notice_clears_recovery_fields_and_never_sends() {
        let since = Utc::now();
        let mut state = base_state(true, since);
        state.recovered_due_utc = Some(since);
        let evaluation = decide(&state, since + ChronoDuration::seconds(5), &ladder());
        assert!(evaluation.due.is_none());
        assert!(evaluation.pending_state.recovered_due_utc.is_none());
    }

    #[test]
    fn up_after_down_sets_recovered_due_then_fires_once_elapsed() {
        let since = Utc::now();
        let mut state = base_state(true, since);
        state.down_first_notified_utc = Some(since - ChronoDuration::seconds(300));

        let early = decide(&state, since + ChronoDuration::seconds(10), &ladder());
        assert!(early.due.is_none());
        assert_eq!(early.pending_state.recovered_due_utc, Some(since + ChronoDuration::seconds(60)));

        state.recovered_due_utc = early.pending_state.recovered_due_utc;
        let on_time = decide(&state, since + ChronoDuration::seconds(60), &ladder());
        assert_eq!(on_time.due, Some(AlertKind::Recovered));
    }

    #[test]
    fn already_recovered_notified_never_fires_again() {
        let since = Utc::now();
        let mut state = base_state(true, since);
        state.down_first_notified_utc = Some(since - ChronoDuration::seconds(300));
        state.recovered_notified_utc = Some(since);
        let evaluation = decide(&state, since + ChronoDuration::seconds(9000), &ladder());
        assert!(evaluation.due.is_none());
    }

    #[test]
    fn apply_delivered_recovered_clears_all_outage_bookkeeping_but_itself() {
        let since = Utc::now();
        let mut state = base_state(true, since);
        state.down_first_notified_utc = Some(since);
        state.last_notified_utc = Some(since);
        state.next_notify_utc = Some(since);
        state.recovered_due_utc = Some(since);

        let zone = SystemTimeZoneResolver.resolve("Etc/UTC");
        let after = apply_delivered(state, AlertKind::Recovered, since, &zone, &ladder());

        assert!(after.down_first_notified_utc.is_none());
        assert!(after.last_notified_utc.is_none());
        assert!(after.next_notify_utc.is_none());
        assert!(after.recovered_due_utc.is_none());
        assert_eq!(after.recovered_notified_utc, Some(since));
    }
}
