use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Health of a monitored certificate.
///
/// The discriminants are the stable gauge values published to metrics
/// consumers.
///
/// # Examples
///
/// ```
/// use certainty_common::types::MonitorState;
///
/// let state: MonitorState = "expiring".parse().unwrap();
/// assert_eq!(state, MonitorState::Expiring);
/// assert_eq!(state.to_string(), "EXPIRING");
/// assert_eq!(state.gauge_value(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorState {
    #[default]
    Unknown = 0,
    Ok = 1,
    Expired = 2,
    Expiring = 3,
    Error = 4,
}

impl MonitorState {
    pub const ALL: [MonitorState; 5] = [
        MonitorState::Unknown,
        MonitorState::Ok,
        MonitorState::Expired,
        MonitorState::Expiring,
        MonitorState::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MonitorState::Unknown => "UNKNOWN",
            MonitorState::Ok => "OK",
            MonitorState::Expired => "EXPIRED",
            MonitorState::Expiring => "EXPIRING",
            MonitorState::Error => "ERROR",
        }
    }

    /// Small integer used by the Prometheus `cert_monitor_state` gauge.
    pub fn gauge_value(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MonitorState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNKNOWN" => Ok(MonitorState::Unknown),
            "OK" => Ok(MonitorState::Ok),
            "EXPIRED" => Ok(MonitorState::Expired),
            "EXPIRING" => Ok(MonitorState::Expiring),
            "ERROR" => Ok(MonitorState::Error),
            _ => Err(format!("unknown monitor state: {s}")),
        }
    }
}

/// One watched (domain, owner) pair and its cached certificate snapshot.
///
/// `serial`, `not_before` and `not_after` are either all set or all `None`.
/// `state` is only ever written by the refresh engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateMonitor {
    pub id: String,
    pub domain: String,
    pub email: String,
    pub warning_days: u32,
    pub enabled: bool,
    pub state: MonitorState,
    pub serial: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CertificateMonitor {
    /// Time left until `not_after`, negative once expired.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.not_after.map(|not_after| not_after - now)
    }
}

pub const MIN_WARNING_DAYS: u32 = 1;
pub const MAX_WARNING_DAYS: u32 = 365;
pub const DEFAULT_WARNING_DAYS: u32 = 7;

fn default_warning_days() -> u32 {
    DEFAULT_WARNING_DAYS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMonitorRequest {
    pub domain: String,
    pub email: String,
    #[serde(default = "default_warning_days")]
    pub warning_days: u32,
}

/// Rejected input to monitor creation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("domain must not be empty")]
    EmptyDomain,
    #[error("'{0}' is not a valid domain name")]
    InvalidDomain(String),
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("warning_days must be between 1 and 365, got {0}")]
    WarningDaysOutOfRange(u32),
}

impl CreateMonitorRequest {
    pub fn new(domain: impl Into<String>, email: impl Into<String>, warning_days: u32) -> Self {
        Self {
            domain: domain.into(),
            email: email.into(),
            warning_days,
        }
    }

    /// Checks the request and returns it with `domain` and `email` trimmed.
    ///
    /// # Examples
    ///
    /// ```
    /// use certainty_common::types::{CreateMonitorRequest, ValidationError};
    ///
    /// let ok = CreateMonitorRequest::new("  example.com ", "me@example.com", 7)
    ///     .validated()
    ///     .unwrap();
    /// assert_eq!(ok.domain, "example.com");
    ///
    /// let err = CreateMonitorRequest::new("example.com", "me@example.com", 0).validated();
    /// assert_eq!(err, Err(ValidationError::WarningDaysOutOfRange(0)));
    /// ```
    pub fn validated(self) -> Result<Self, ValidationError> {
        let domain = self.domain.trim().to_string();
        let email = self.email.trim().to_string();

        if domain.is_empty() {
            return Err(ValidationError::EmptyDomain);
        }
        if !is_valid_domain(&domain) {
            return Err(ValidationError::InvalidDomain(domain));
        }
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail(email));
        }
        if !(MIN_WARNING_DAYS..=MAX_WARNING_DAYS).contains(&self.warning_days) {
            return Err(ValidationError::WarningDaysOutOfRange(self.warning_days));
        }

        Ok(Self {
            domain,
            email,
            warning_days: self.warning_days,
        })
    }
}

fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, host)) => {
            !local.is_empty()
                && !host.contains('@')
                && host.contains('.')
                && is_valid_domain(host)
                && !local.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DeletedMonitor,
    ErrorDetected,
    Expired,
    Expiring,
    Renewed,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationKind::DeletedMonitor => "deleted_monitor",
            NotificationKind::ErrorDetected => "error_detected",
            NotificationKind::Expired => "expired",
            NotificationKind::Expiring => "expiring",
            NotificationKind::Renewed => "renewed",
        };
        f.write_str(name)
    }
}

/// A request to tell a monitor's owner about something. Delivery is handled
/// elsewhere; this only says who, about what, and with which expiry date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    pub email: String,
    pub domain: String,
    pub monitor_id: String,
    pub not_after: Option<DateTime<Utc>>,
}

impl NotificationRequest {
    pub fn for_monitor(kind: NotificationKind, monitor: &CertificateMonitor) -> Self {
        Self {
            kind,
            email: monitor.email.clone(),
            domain: monitor.domain.clone(),
            monitor_id: monitor.id.clone(),
            not_after: monitor.not_after,
        }
    }

    pub fn deleted(monitor: &CertificateMonitor) -> Self {
        Self {
            not_after: None,
            ..Self::for_monitor(NotificationKind::DeletedMonitor, monitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> CertificateMonitor {
        CertificateMonitor {
            id: "42".into(),
            domain: "example.com".into(),
            email: "owner@example.com".into(),
            warning_days: 7,
            enabled: true,
            state: MonitorState::Ok,
            serial: Some("0A".into()),
            not_before: Some(Utc::now() - Duration::days(10)),
            not_after: Some(Utc::now() + Duration::days(80)),
            checked_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn state_gauge_values_are_stable() {
        let values: Vec<u8> = MonitorState::ALL.iter().map(|s| s.gauge_value()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn state_serializes_uppercase() {
        let json = serde_json::to_string(&MonitorState::Expiring).unwrap();
        assert_eq!(json, "\"EXPIRING\"");
        for state in MonitorState::ALL {
            assert_eq!(state.as_str().parse::<MonitorState>().unwrap(), state);
        }
    }

    #[test]
    fn validation_rejects_blank_domain() {
        let err = CreateMonitorRequest::new("   ", "a@b.com", 7).validated();
        assert_eq!(err, Err(ValidationError::EmptyDomain));
    }

    #[test]
    fn validation_rejects_urls_and_bad_emails() {
        assert!(matches!(
            CreateMonitorRequest::new("https://example.com", "a@b.com", 7).validated(),
            Err(ValidationError::InvalidDomain(_))
        ));
        assert!(matches!(
            CreateMonitorRequest::new("example.com", "not-an-email", 7).validated(),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            CreateMonitorRequest::new("example.com", "a@@b.com", 7).validated(),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn validation_checks_warning_day_bounds() {
        assert!(CreateMonitorRequest::new("example.com", "a@b.com", 1).validated().is_ok());
        assert!(CreateMonitorRequest::new("example.com", "a@b.com", 365).validated().is_ok());
        assert_eq!(
            CreateMonitorRequest::new("example.com", "a@b.com", 366).validated(),
            Err(ValidationError::WarningDaysOutOfRange(366))
        );
    }

    #[test]
    fn time_remaining_follows_not_after() {
        let m = monitor();
        let now = Utc::now();
        let remaining = m.time_remaining(now).unwrap();
        assert!(remaining > Duration::days(79));

        let blank = CertificateMonitor {
            not_after: None,
            ..monitor()
        };
        assert!(blank.time_remaining(now).is_none());
    }

    #[test]
    fn deleted_notification_drops_expiry() {
        let req = NotificationRequest::deleted(&monitor());
        assert_eq!(req.kind, NotificationKind::DeletedMonitor);
        assert_eq!(req.monitor_id, "42");
        assert!(req.not_after.is_none());
    }
}
