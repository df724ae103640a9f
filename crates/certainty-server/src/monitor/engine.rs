use certainty_common::types::{
    CertificateMonitor, MonitorState, NotificationKind, NotificationRequest,
};
use certainty_notify::NotificationQueue;
use certainty_storage::{CheckUpdate, MonitorStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use super::classifier::classify;
use super::inspector::CertificateInspector;
use super::Result;

/// Which notification, if any, a state change deserves.
///
/// Keyed by the destination state only. Reaching `OK` from `UNKNOWN` is a
/// first successful check, not a renewal.
pub fn notification_for_transition(old: MonitorState, new: MonitorState) -> Option<NotificationKind> {
    if old == new {
        return None;
    }
    match new {
        MonitorState::Error => Some(NotificationKind::ErrorDetected),
        MonitorState::Expired => Some(NotificationKind::Expired),
        MonitorState::Expiring => Some(NotificationKind::Expiring),
        MonitorState::Ok if old != MonitorState::Unknown => Some(NotificationKind::Renewed),
        _ => None,
    }
}

/// Refreshes one monitor at a time: inspect, classify, persist, notify.
///
/// The engine is the only writer of `state`.
pub struct RefreshEngine {
    store: Arc<dyn MonitorStore>,
    inspector: Arc<dyn CertificateInspector>,
    queue: Arc<dyn NotificationQueue>,
}

impl RefreshEngine {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        inspector: Arc<dyn CertificateInspector>,
        queue: Arc<dyn NotificationQueue>,
    ) -> Self {
        Self {
            store,
            inspector,
            queue,
        }
    }

    pub async fn refresh(&self, id: &str) -> Result<CertificateMonitor> {
        let current = self.store.get(id)?;
        let previous_state = current.state;

        let facts = self.inspector.inspect(&current.domain).await;
        let now = whole_seconds(Utc::now());

        let mut staged = current;
        match facts {
            Some(facts) => {
                staged.serial = Some(facts.serial);
                staged.not_before = Some(facts.not_before);
                staged.not_after = Some(facts.not_after);
            }
            None => {
                staged.serial = None;
                staged.not_before = None;
                staged.not_after = None;
            }
        }
        staged.state = classify(
            now,
            staged.not_before,
            staged.not_after,
            staged.serial.as_deref(),
            staged.warning_days,
        );
        staged.checked_at = Some(staged.checked_at.map_or(now, |prev| prev.max(now)));

        let notification = notification_for_transition(previous_state, staged.state)
            .map(|kind| NotificationRequest::for_monitor(kind, &staged));

        self.store.save_check(
            id,
            &CheckUpdate {
                serial: staged.serial.clone(),
                not_before: staged.not_before,
                not_after: staged.not_after,
                checked_at: now,
                state: staged.state,
            },
        )?;

        if previous_state != staged.state {
            tracing::info!(
                monitor_id = %id,
                domain = %staged.domain,
                old_state = %previous_state,
                new_state = %staged.state,
                "Monitor state changed"
            );
        } else {
            tracing::debug!(monitor_id = %id, state = %staged.state, "Monitor refreshed");
        }

        if let Some(request) = notification {
            let kind = request.kind;
            if let Err(e) = self.queue.enqueue(request) {
                tracing::error!(
                    monitor_id = %id,
                    kind = %kind,
                    error = %e,
                    "Failed to enqueue notification"
                );
            }
        }

        Ok(staged)
    }

    /// Like [`refresh`](Self::refresh), but returns the stored record untouched
    /// when it was checked less than `floor` ago.
    pub async fn refresh_if_stale(&self, id: &str, floor: Duration) -> Result<CertificateMonitor> {
        let current = self.store.get(id)?;
        if let Some(checked_at) = current.checked_at {
            if Utc::now() - checked_at < floor {
                tracing::debug!(
                    monitor_id = %id,
                    checked_at = %checked_at,
                    "Skipping refresh, checked too recently"
                );
                return Ok(current);
            }
        }
        self.refresh(id).await
    }
}

fn whole_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}
