use certainty_common::types::{NotificationKind, NotificationRequest};
use chrono::{DateTime, Utc};

/// Subject and HTML body of an owner email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html_body: String,
}

fn format_expiry(not_after: Option<DateTime<Utc>>) -> String {
    not_after
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "an unknown date".to_string())
}

fn monitor_link(base_url: &str, monitor_id: &str) -> String {
    let url = format!("{}/monitor/{monitor_id}", base_url.trim_end_matches('/'));
    format!("<p>You can view the monitor <a clicktracking=off href=\"{url}\">here</a>.</p>")
}

/// Renders the email for a notification request.
///
/// # Examples
///
/// ```
/// use certainty_common::types::{NotificationKind, NotificationRequest};
/// use certainty_notify::template::render;
///
/// let req = NotificationRequest {
///     kind: NotificationKind::ErrorDetected,
///     email: "owner@example.com".into(),
///     domain: "example.com".into(),
///     monitor_id: "17".into(),
///     not_after: None,
/// };
/// let msg = render(&req, "https://certainty.dev");
/// assert_eq!(msg.subject, "SSL certificate error for example.com!");
/// assert!(msg.html_body.contains("https://certainty.dev/monitor/17"));
/// ```
pub fn render(request: &NotificationRequest, base_url: &str) -> RenderedMessage {
    let domain = &request.domain;
    let expiry = format_expiry(request.not_after);
    let link = monitor_link(base_url, &request.monitor_id);

    let (subject, paragraph) = match request.kind {
        NotificationKind::DeletedMonitor => (
            format!("SSL certificate monitor for {domain} has been deleted"),
            format!(
                "<p>The SSL certificate monitor for {domain} (identifier {id}) has been deleted \
                 and will no longer be checked.</p>\n\n<p>You are welcome to create a new monitor \
                 at any time.</p>",
                id = request.monitor_id
            ),
        ),
        NotificationKind::ErrorDetected => (
            format!("SSL certificate error for {domain}!"),
            format!(
                "<p>We could not read the SSL certificate for {domain}. This may indicate a \
                 problem with the certificate or the server.</p>\n\n{link}"
            ),
        ),
        NotificationKind::Expired => (
            format!("SSL certificate for {domain} has expired!"),
            format!(
                "<p>The SSL certificate for {domain} has expired and became invalid on \
                 {expiry}.</p>\n\n{link}"
            ),
        ),
        NotificationKind::Expiring => (
            format!("SSL certificate for {domain} is expiring soon"),
            format!(
                "<p>The SSL certificate for {domain} is expiring soon and will become invalid \
                 on {expiry}.</p>\n\n{link}"
            ),
        ),
        NotificationKind::Renewed => (
            format!("SSL certificate for {domain} has been renewed"),
            format!(
                "<p>The SSL certificate for {domain} is valid again and will stay valid until \
                 {expiry}.</p>\n\n{link}"
            ),
        ),
    };

    RenderedMessage {
        subject,
        html_body: format!("<p>Hello!</p>\n\n{paragraph}\n\n<p>Many thanks!</p>\n"),
    }
}
