use anyhow::Result;
use certainty_storage::MonitorStore;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};

use super::engine::RefreshEngine;

/// Outcome counts of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub due: usize,
    pub refreshed: usize,
    /// Monitors deleted between selection and persistence.
    pub skipped: usize,
    pub failed: usize,
}

/// Periodically refreshes every enabled monitor that has not been checked
/// within `min_recheck_secs`.
pub struct SweepScheduler {
    engine: Arc<RefreshEngine>,
    store: Arc<dyn MonitorStore>,
    tick_secs: u64,
    min_recheck_secs: u64,
    max_concurrent: usize,
}

impl SweepScheduler {
    pub fn new(
        engine: Arc<RefreshEngine>,
        store: Arc<dyn MonitorStore>,
        tick_secs: u64,
        min_recheck_secs: u64,
        max_concurrent: usize,
    ) -> Self {
        Self {
            engine,
            store,
            tick_secs,
            min_recheck_secs,
            max_concurrent,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            tick_secs = self.tick_secs,
            min_recheck_secs = self.min_recheck_secs,
            max_concurrent = self.max_concurrent,
            "Sweep scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.tick_secs.max(1)));
        loop {
            tick.tick().await;
            if let Err(e) = self.sweep().await {
                tracing::error!(error = %e, "Sweep failed");
            }
        }
    }

    /// Refreshes all due monitors concurrently and waits for every one of
    /// them. A failing refresh never aborts its siblings.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.min_recheck_secs as i64);
        let due = self.store.list_due(cutoff)?;

        let mut report = SweepReport {
            due: due.len(),
            ..SweepReport::default()
        };
        if due.is_empty() {
            return Ok(report);
        }

        tracing::info!(count = due.len(), "Refreshing due monitors");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent.max(1)));
        let mut handles = Vec::with_capacity(due.len());

        for monitor in due {
            let permit = semaphore.clone().acquire_owned().await?;
            let engine = self.engine.clone();

            let handle = tokio::spawn(async move {
                let result = engine.refresh(&monitor.id).await;
                drop(permit);
                (monitor, result)
            });
            handles.push(handle);
        }

        for handle in handles {
            match handle.await {
                Ok((_, Ok(_))) => report.refreshed += 1,
                Ok((monitor, Err(e))) if e.is_not_found() => {
                    tracing::info!(
                        monitor_id = %monitor.id,
                        domain = %monitor.domain,
                        "Monitor disappeared during sweep, skipping"
                    );
                    report.skipped += 1;
                }
                Ok((monitor, Err(e))) => {
                    tracing::error!(
                        monitor_id = %monitor.id,
                        domain = %monitor.domain,
                        error = %e,
                        "Refresh failed"
                    );
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Refresh task panicked");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            refreshed = report.refreshed,
            skipped = report.skipped,
            failed = report.failed,
            "Sweep completed"
        );

        Ok(report)
    }
}
