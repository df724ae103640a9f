use certainty_common::types::{CertificateMonitor, CreateMonitorRequest, NotificationRequest};
use certainty_notify::NotificationQueue;
use certainty_storage::MonitorStore;
use std::sync::Arc;

use super::Result;

/// Owner-facing operations on monitors. Never touches certificate state.
pub struct MonitorService {
    store: Arc<dyn MonitorStore>,
    queue: Arc<dyn NotificationQueue>,
}

impl MonitorService {
    pub fn new(store: Arc<dyn MonitorStore>, queue: Arc<dyn NotificationQueue>) -> Self {
        Self { store, queue }
    }

    /// Validates the request and stores a new monitor in state `UNKNOWN`.
    pub fn create(&self, request: CreateMonitorRequest) -> Result<CertificateMonitor> {
        let request = request.validated()?;
        let monitor = self.store.create(&request)?;
        tracing::info!(
            monitor_id = %monitor.id,
            domain = %monitor.domain,
            warning_days = monitor.warning_days,
            "Monitor created"
        );
        Ok(monitor)
    }

    pub fn get(&self, id: &str) -> Result<CertificateMonitor> {
        Ok(self.store.get(id)?)
    }

    pub fn list_for_owner(&self, email: &str) -> Result<Vec<CertificateMonitor>> {
        Ok(self.store.list_by_email(email.trim())?)
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<CertificateMonitor> {
        self.store.set_enabled(id, enabled)?;
        tracing::info!(monitor_id = %id, enabled, "Monitor toggled");
        Ok(self.store.get(id)?)
    }

    /// Deletes the monitor and tells its owner. The notification carries the
    /// details read before deletion.
    pub fn delete(&self, id: &str) -> Result<()> {
        let monitor = self.store.get(id)?;
        self.store.delete(id)?;
        tracing::info!(monitor_id = %id, domain = %monitor.domain, "Monitor deleted");

        if let Err(e) = self.queue.enqueue(NotificationRequest::deleted(&monitor)) {
            tracing::error!(monitor_id = %id, error = %e, "Failed to enqueue deletion notification");
        }
        Ok(())
    }
}
