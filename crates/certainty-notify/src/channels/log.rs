use async_trait::async_trait;
use certainty_common::types::NotificationRequest;

use crate::error::Result;
use crate::template::RenderedMessage;
use crate::NotificationChannel;

/// Writes notifications to the log instead of delivering them. Used when no
/// SMTP relay is configured.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, request: &NotificationRequest, message: &RenderedMessage) -> Result<()> {
        tracing::info!(
            kind = %request.kind,
            to = %request.email,
            domain = %request.domain,
            monitor_id = %request.monitor_id,
            subject = %message.subject,
            "Notification (log only)"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
