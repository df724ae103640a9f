//! Durable storage for certificate monitors.
//!
//! [`MonitorStore`] is the contract the refresh engine and the owner-facing
//! service depend on. The default implementation ([`sqlite::SqliteMonitorStore`])
//! keeps every monitor in a single SQLite database with WAL mode enabled.

pub mod error;
pub mod sqlite;


use certainty_common::types::{CertificateMonitor, CreateMonitorRequest, MonitorState};
use chrono::{DateTime, Utc};

pub use error::{Result, StorageError};
pub use sqlite::SqliteMonitorStore;

/// Everything one refresh writes back, persisted in a single statement.
///
/// The certificate fields must be all `Some` or all `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckUpdate {
    pub serial: Option<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub checked_at: DateTime<Utc>,
    pub state: MonitorState,
}

/// Persistence backend for monitors.
///
/// Implementations must be safe to share across threads because a sweep
/// refreshes many monitors from concurrent tasks. Writes to one record never
/// need to coordinate with writes to another.
pub trait MonitorStore: Send + Sync {
    /// Inserts a new monitor in state `UNKNOWN` with no certificate snapshot.
    /// The request is expected to be validated already.
    fn create(&self, req: &CreateMonitorRequest) -> Result<CertificateMonitor>;

    /// Loads a monitor, failing with [`StorageError::NotFound`] if absent.
    fn get(&self, id: &str) -> Result<CertificateMonitor>;

    /// Enabled monitors never checked, or last checked strictly before
    /// `checked_before`.
    fn list_due(&self, checked_before: DateTime<Utc>) -> Result<Vec<CertificateMonitor>>;

    /// All monitors owned by `email`, newest first.
    fn list_by_email(&self, email: &str) -> Result<Vec<CertificateMonitor>>;

    /// Writes the outcome of a refresh. Fails with [`StorageError::NotFound`]
    /// if the monitor was deleted in the meantime.
    fn save_check(&self, id: &str, update: &CheckUpdate) -> Result<()>;

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;
}
