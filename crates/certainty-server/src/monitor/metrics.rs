use certainty_common::types::CertificateMonitor;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Renders one monitor as Prometheus text exposition.
///
/// Every gauge always gets its `HELP`/`TYPE` lines; the sample line is left
/// out when the underlying field is unknown.
pub fn render_prometheus(monitor: &CertificateMonitor, now: DateTime<Utc>) -> String {
    let domain = escape_label(&monitor.domain);
    let mut out = String::new();

    let gauges: [(&str, &str, Option<i64>); 5] = [
        (
            "cert_seconds_until_expiry",
            "Seconds until the certificate expires (negative once expired)",
            monitor.time_remaining(now).map(|d| d.num_seconds()),
        ),
        (
            "cert_last_checked_timestamp",
            "Unix timestamp of the last certificate check",
            monitor.checked_at.map(|t| t.timestamp()),
        ),
        (
            "cert_not_before",
            "Unix timestamp the certificate became valid",
            monitor.not_before.map(|t| t.timestamp()),
        ),
        (
            "cert_not_after",
            "Unix timestamp the certificate expires",
            monitor.not_after.map(|t| t.timestamp()),
        ),
        (
            "cert_monitor_state",
            "Monitor state (0=UNKNOWN, 1=OK, 2=EXPIRED, 3=EXPIRING, 4=ERROR)",
            Some(i64::from(monitor.state.gauge_value())),
        ),
    ];

    for (name, help, value) in gauges {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} gauge");
        if let Some(value) = value {
            let _ = writeln!(out, "{name}{{domain=\"{domain}\"}} {value}");
        }
    }
    out
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
