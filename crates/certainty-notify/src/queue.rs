use certainty_common::types::NotificationRequest;
use tokio::sync::mpsc;

use crate::error::{NotifyError, Result};
use crate::template;
use crate::{NotificationChannel, NotificationQueue};

/// In-process queue backed by an unbounded channel. Cheap to clone.
#[derive(Clone)]
pub struct ChannelQueue {
    sender: mpsc::UnboundedSender<NotificationRequest>,
}

impl NotificationQueue for ChannelQueue {
    fn enqueue(&self, request: NotificationRequest) -> Result<()> {
        tracing::debug!(
            kind = %request.kind,
            monitor_id = %request.monitor_id,
            "Notification enqueued"
        );
        self.sender
            .send(request)
            .map_err(|_| NotifyError::QueueClosed)
    }
}

/// Consumes queued requests and delivers them through every channel.
///
/// A failing channel is logged and skipped; nothing is reported back to the
/// producer.
pub struct NotificationDispatcher {
    receiver: mpsc::UnboundedReceiver<NotificationRequest>,
    channels: Vec<Box<dyn NotificationChannel>>,
    base_url: String,
}

/// Creates a connected queue/dispatcher pair. Spawn
/// [`NotificationDispatcher::run`] and hand the queue to producers.
pub fn notification_queue(
    channels: Vec<Box<dyn NotificationChannel>>,
    base_url: impl Into<String>,
) -> (ChannelQueue, NotificationDispatcher) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ChannelQueue { sender },
        NotificationDispatcher {
            receiver,
            channels,
            base_url: base_url.into(),
        },
    )
}

impl NotificationDispatcher {
    /// Runs until every [`ChannelQueue`] clone has been dropped.
    pub async fn run(mut self) {
        tracing::info!(
            channels = self.channels.len(),
            "Notification dispatcher started"
        );
        while let Some(request) = self.receiver.recv().await {
            self.dispatch(&request).await;
        }
        tracing::info!("Notification queue closed, dispatcher stopping");
    }

    async fn dispatch(&self, request: &NotificationRequest) {
        let message = template::render(request, &self.base_url);
        for channel in &self.channels {
            if let Err(e) = channel.send(request, &message).await {
                tracing::error!(
                    channel = channel.channel_name(),
                    kind = %request.kind,
                    monitor_id = %request.monitor_id,
                    error = %e,
                    "Failed to send notification"
                );
            }
        }
    }
}
