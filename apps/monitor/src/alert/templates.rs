// [apps/monitor/src/alert/templates.rs]
//! Renders an `AlertSignal` into the bodies "HTML
//! body for email containing title, timestamps (local + UTC), TCP/HTTP
//! details, final URL, down-since/up-since; a plaintext fallback".

use monitor_core_timezone::Zone;
use monitor_domain_notification::{AlertKind, AlertSignal, EmailMessage};

/// Builds the email subject + HTML/text bodies for `signal`. `recipients`
/// is only the `to` list; callers send one message per recipient so a
/// bad address on one does not block the others ("isolate
/// per-recipient failures").
pub fn render_email(signal: &AlertSignal, recipients: Vec<String>, zone: &Zone) -> EmailMessage {
    let local_time = monitor_core_timezone::to_local(signal.timestamp_utc, zone);
    let since_local = monitor_core_timezone::to_local(signal.state_since_utc, zone);

    let subject = format!("[{}] {} is {}", signal.instance_display_name, signal.url, signal.kind_label());

    let since_label = match signal.kind {
        AlertKind::Recovered => "Up since",
        _ => "Down since",
    };

    let degraded_line = if signal.is_degraded() {
        "\nNote: a login surface was detected on this target; it is currently Degraded rather than fully healthy."
    } else {
        ""
    };

    let text_body = format!(
        "{title}\n\n\
         Instance:  {instance}\n\
         Target:    {url}\n\
         Status:    {label}\n\
         {since_label}: {since_local} ({since_utc} UTC)\n\
         Reported:  {local_time} ({timestamp_utc} UTC)\n\
         Detail:    {summary}\n\
         Consecutive failures: {failures}{degraded_line}\n",
        title = subject,
        instance = signal.instance_display_name,
        url = signal.url,
        label = signal.kind_label(),
        since_label = since_label,
        since_local = since_local.format("%Y-%m-%d %H:%M:%S %Z"),
        since_utc = signal.state_since_utc.format("%Y-%m-%dT%H:%M:%SZ"),
        local_time = local_time.format("%Y-%m-%d %H:%M:%S %Z"),
        timestamp_utc = signal.timestamp_utc.format("%Y-%m-%dT%H:%M:%SZ"),
        summary = signal.summary,
        failures = signal.consecutive_failures,
        degraded_line = degraded_line,
    );

    let html_body = format!(
        "<html><body>\
         <h2>{title}</h2>\
         <table cellpadding=\"4\">\
         <tr><td><b>Instance</b></td><td>{instance}</td></tr>\
         <tr><td><b>Target</b></td><td><a href=\"{url}\">{url}</a></td></tr>\
         <tr><td><b>Status</b></td><td>{label}</td></tr>\
         <tr><td><b>{since_label}</b></td><td>{since_local} ({since_utc} UTC)</td></tr>\
         <tr><td><b>Reported</b></td><td>{local_time} ({timestamp_utc} UTC)</td></tr>\
         <tr><td><b>Detail</b></td><td>{summary}</td></tr>\
         <tr><td><b>Consecutive failures</b></td><td>{failures}</td></tr>\
         </table>\
         {degraded_html}\
         </body></html>",
        title = subject,
        instance = signal.instance_display_name,
        url = signal.url,
        label = signal.kind_label(),
        since_label = since_label,
        since_local = since_local.format("%Y-%m-%d %H:%M:%S %Z"),
        since_utc = signal.state_since_utc.format("%Y-%m-%dT%H:%M:%SZ"),
        local_time = local_time.format("%Y-%m-%d %H:%M:%S %Z"),
        timestamp_utc = signal.timestamp_utc.format("%Y-%m-%dT%H:%M:%SZ"),
        summary = signal.summary,
        failures = signal.consecutive_failures,
        degraded_html = if signal.is_degraded() {
            "<p><i>A login surface was detected on this target; it is currently Degraded rather than fully healthy.</i></p>"
        } else {
            ""
        },
    );

    EmailMessage { to: recipients, subject, text_body, html_body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use monitor_core_timezone::SystemTimeZoneResolver;
    use monitor_core_timezone::TimeZoneResolver;

    fn signal() -> AlertSignal {
        let now = Utc::now();
        AlertSignal {
            instance_id: "acme".into(),
            instance_display_name: "Acme Corp".into(),
            target_id: 1,
            url: "https://acme.example/".into(),
            kind: AlertKind::Down,
            is_up: false,
            state_since_utc: now,
            timestamp_utc: now,
            consecutive_failures: 3,
            summary: "TCP FAIL; HTTP FAIL".into(),
            login_detected_ever: false,
            login_detected_last: false,
        }
    }

    #[test]
    fn subject_includes_instance_and_kind_label() {
        let zone = SystemTimeZoneResolver.resolve("Etc/UTC");
        let message = render_email(&signal(), vec!["ops@acme.example".into()], &zone);
        assert!(message.subject.contains("Acme Corp"));
        assert!(message.subject.contains("DOWN"));
        assert_eq!(message.to, vec!["ops@acme.example".to_string()]);
    }

    #[test]
    fn degraded_signal_surfaces_note_in_both_bodies() {
        let mut degraded = signal();
        degraded.is_up = true;
        degraded.login_detected_ever = true;
        degraded.login_detected_last = false;
        let zone = SystemTimeZoneResolver.resolve("Etc/UTC");
        let message = render_email(&degraded, vec!["ops@acme.example".into()], &zone);
        assert!(message.text_body.contains("Degraded"));
        assert!(message.html_body.contains("Degraded"));
    }
}
