use crate::channels::email::{EmailChannel, EmailConfig};
use crate::error::{NotifyError, Result};
use crate::queue::notification_queue;
use crate::template::{render, RenderedMessage};
use crate::{NotificationChannel, NotificationQueue};
use async_trait::async_trait;
use certainty_common::types::{NotificationKind, NotificationRequest};
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

fn request(kind: NotificationKind) -> NotificationRequest {
    NotificationRequest {
        kind,
        email: "owner@example.com".to_string(),
        domain: "example.com".to_string(),
        monitor_id: "1001".to_string(),
        not_after: Some(Utc.with_ymd_and_hms(2024, 5, 30, 23, 59, 59).unwrap()),
    }
}

#[derive(Clone, Default)]
struct CapturingChannel {
    sent: Arc<Mutex<Vec<(NotificationKind, String)>>>,
}

#[async_trait]
impl NotificationChannel for CapturingChannel {
    async fn send(&self, request: &NotificationRequest, message: &RenderedMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((request.kind, message.subject.clone()));
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "capture"
    }
}

struct FailingChannel;

#[async_trait]
impl NotificationChannel for FailingChannel {
    async fn send(&self, _: &NotificationRequest, _: &RenderedMessage) -> Result<()> {
        Err(NotifyError::Other("boom".to_string()))
    }

    fn channel_name(&self) -> &str {
        "failing"
    }
}

#[test]
fn render_dated_kinds_include_expiry() {
    for kind in [
        NotificationKind::Expired,
        NotificationKind::Expiring,
        NotificationKind::Renewed,
    ] {
        let msg = render(&request(kind), "https://certainty.dev/");
        assert!(
            msg.html_body.contains("2024-05-30 23:59:59 UTC"),
            "{kind}: {}",
            msg.html_body
        );
        assert!(msg.html_body.contains("https://certainty.dev/monitor/1001"));
        assert!(msg.subject.contains("example.com"));
    }
}

#[test]
fn render_subjects_per_kind() {
    let subject = |kind| render(&request(kind), "http://x").subject;
    assert_eq!(
        subject(NotificationKind::Expired),
        "SSL certificate for example.com has expired!"
    );
    assert_eq!(
        subject(NotificationKind::Expiring),
        "SSL certificate for example.com is expiring soon"
    );
    assert_eq!(
        subject(NotificationKind::Renewed),
        "SSL certificate for example.com has been renewed"
    );
    assert_eq!(
        subject(NotificationKind::DeletedMonitor),
        "SSL certificate monitor for example.com has been deleted"
    );
}

#[test]
fn render_deleted_has_no_monitor_link() {
    let msg = render(&request(NotificationKind::DeletedMonitor), "http://x");
    assert!(!msg.html_body.contains("/monitor/1001"));
    assert!(msg.html_body.contains("1001"));
}

#[tokio::test]
async fn dispatcher_delivers_to_every_channel_despite_failures() {
    let capture = CapturingChannel::default();
    let (queue, dispatcher) = notification_queue(
        vec![Box::new(FailingChannel), Box::new(capture.clone())],
        "http://localhost",
    );

    queue.enqueue(request(NotificationKind::Expiring)).unwrap();
    queue.enqueue(request(NotificationKind::Renewed)).unwrap();
    drop(queue);

    dispatcher.run().await;

    let sent = capture.sent.lock().unwrap().clone();
    let kinds: Vec<NotificationKind> = sent.iter().map(|(k, _)| *k).collect();
    assert_eq!(
        kinds,
        vec![NotificationKind::Expiring, NotificationKind::Renewed]
    );
}

#[tokio::test]
async fn enqueue_after_dispatcher_dropped_is_queue_closed() {
    let (queue, dispatcher) = notification_queue(Vec::new(), "http://localhost");
    drop(dispatcher);

    let err = queue
        .enqueue(request(NotificationKind::ErrorDetected))
        .unwrap_err();
    assert!(matches!(err, NotifyError::QueueClosed));
}

#[tokio::test]
async fn email_channel_rejects_bad_sender() {
    let config = EmailConfig {
        host: "smtp.example.com".to_string(),
        port: 587,
        username: None,
        password: None,
        from: "not an address".to_string(),
    };
    assert!(matches!(
        EmailChannel::new(&config),
        Err(NotifyError::Address(_))
    ));

    let blank_host = EmailConfig {
        host: " ".to_string(),
        from: "monitor@certainty.dev".to_string(),
        ..config
    };
    assert!(matches!(
        EmailChannel::new(&blank_host),
        Err(NotifyError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn email_channel_retries_before_giving_up() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let channel = EmailChannel::new(&EmailConfig {
        host: "localhost".to_string(),
        port,
        username: None,
        password: None,
        from: "monitor@certainty.dev".to_string(),
    })
    .unwrap();

    let req = request(NotificationKind::Expired);
    let message = render(&req, "http://localhost");
    let started = std::time::Instant::now();
    let err = channel.send(&req, &message).await.unwrap_err();

    assert!(matches!(err, NotifyError::Smtp(_)), "unexpected error: {err}");
    // Two backoff sleeps: 100ms then 200ms.
    assert!(started.elapsed() >= std::time::Duration::from_millis(300));
}
