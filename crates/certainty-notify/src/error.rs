/// Errors that can occur within the notification subsystem.
///
/// # Examples
///
/// ```rust
/// use certainty_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing smtp host".to_string());
/// assert!(err.to_string().contains("smtp host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The dispatcher behind a queue has shut down, so nothing can be enqueued.
    #[error("Notify: notification queue is closed")]
    QueueClosed,

    /// Channel configuration is missing a required field or contains an invalid value.
    #[error("Notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// SMTP transport error when sending email.
    #[error("Notify: SMTP error: {0}")]
    Smtp(String),

    /// A sender or recipient address could not be parsed.
    #[error("Notify: invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Building the email message failed.
    #[error("Notify: failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("Notify: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
