use certainty_common::types::MonitorState;
use chrono::{DateTime, Duration, Utc};

/// Derives a monitor's state from its certificate snapshot.
///
/// First match wins: any missing field is `ERROR`, a `not_after` in the past
/// is `EXPIRED`, one inside the warning window is `EXPIRING`, anything else is
/// `OK`. `not_before` only has to be present; a certificate that is not valid
/// yet still reads as `OK`.
pub fn classify(
    now: DateTime<Utc>,
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
    serial: Option<&str>,
    warning_days: u32,
) -> MonitorState {
    let (Some(_), Some(not_after), Some(_)) = (not_before, not_after, serial) else {
        return MonitorState::Error;
    };

    if not_after < now {
        MonitorState::Expired
    } else if not_after < now + Duration::days(i64::from(warning_days)) {
        MonitorState::Expiring
    } else {
        MonitorState::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn full(not_after: DateTime<Utc>, warning_days: u32) -> MonitorState {
        classify(
            now(),
            Some(now() - Duration::days(30)),
            Some(not_after),
            Some("01"),
            warning_days,
        )
    }

    #[test]
    fn any_missing_field_is_error() {
        let nb = Some(now() - Duration::days(1));
        let na = Some(now() + Duration::days(90));
        assert_eq!(classify(now(), None, na, Some("01"), 7), MonitorState::Error);
        assert_eq!(classify(now(), nb, None, Some("01"), 7), MonitorState::Error);
        assert_eq!(classify(now(), nb, na, None, 7), MonitorState::Error);
        assert_eq!(classify(now(), None, None, None, 7), MonitorState::Error);
    }

    #[test]
    fn past_not_after_is_expired() {
        assert_eq!(full(now() - Duration::seconds(1), 7), MonitorState::Expired);
        assert_eq!(full(now() - Duration::days(400), 7), MonitorState::Expired);
    }

    #[test]
    fn not_after_equal_to_now_is_expiring() {
        assert_eq!(full(now(), 7), MonitorState::Expiring);
    }

    #[test]
    fn warning_window_boundary_is_strict() {
        assert_eq!(full(now() + Duration::days(7), 7), MonitorState::Ok);
        assert_eq!(
            full(now() + Duration::days(7) - Duration::seconds(1), 7),
            MonitorState::Expiring
        );
        assert_eq!(full(now() + Duration::days(3), 7), MonitorState::Expiring);
        assert_eq!(full(now() + Duration::days(3), 2), MonitorState::Ok);
    }

    #[test]
    fn not_yet_valid_certificate_still_reads_ok() {
        let state = classify(
            now(),
            Some(now() + Duration::days(10)),
            Some(now() + Duration::days(100)),
            Some("01"),
            7,
        );
        assert_eq!(state, MonitorState::Ok);
    }

    #[test]
    fn classification_is_deterministic() {
        let na = now() + Duration::days(5);
        let first = full(na, 7);
        for _ in 0..10 {
            assert_eq!(full(na, 7), first);
        }
    }
}
