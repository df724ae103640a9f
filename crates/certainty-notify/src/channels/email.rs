use async_trait::async_trait;
use certainty_common::types::NotificationRequest;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{NotifyError, Result};
use crate::template::RenderedMessage;
use crate::NotificationChannel;

const MAX_ATTEMPTS: u32 = 3;

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("smtp host is empty".to_string()));
        }
        let _: lettre::message::Mailbox = config.from.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, request: &NotificationRequest, message: &RenderedMessage) -> Result<()> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(request.email.parse()?)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())?;

        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.transport.send(email.clone()).await {
                Ok(_) => {
                    tracing::info!(
                        to = %request.email,
                        kind = %request.kind,
                        attempts = attempt + 1,
                        "Email sent"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        to = %request.email,
                        error = %e,
                        "Email send failed, retrying"
                    );
                    last_err = Some(e);
                    if attempt + 1 < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
                    }
                }
            }
        }

        Err(NotifyError::Smtp(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}
