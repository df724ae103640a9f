//! Owner notifications for certificate monitors.
//!
//! The refresh engine only ever sees [`NotificationQueue`]: it hands over a
//! [`NotificationRequest`] and moves on. A [`queue::NotificationDispatcher`]
//! drains the queue in the background, renders each request with
//! [`template::render`], and passes the message to every configured
//! [`NotificationChannel`].

pub mod channels;
pub mod error;
pub mod queue;
pub mod template;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use certainty_common::types::NotificationRequest;

use error::Result;
use template::RenderedMessage;

/// Sink the core hands notification requests to.
///
/// `enqueue` must not block on delivery. Delivery is at-least-once from the
/// caller's point of view and requests are not deduplicated.
pub trait NotificationQueue: Send + Sync {
    fn enqueue(&self, request: NotificationRequest) -> Result<()>;
}

/// A delivery channel (SMTP, log, ...).
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers one rendered message to the request's owner.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, request: &NotificationRequest, message: &RenderedMessage) -> Result<()>;

    /// Returns the channel type name (e.g., `"email"`, `"log"`).
    fn channel_name(&self) -> &str;
}
