//! The monitoring core: read a domain's certificate, classify it, persist the
//! outcome and tell the owner when the state moves somewhere they care about.

pub mod api;
pub mod classifier;
pub mod engine;
pub mod inspector;
pub mod metrics;
pub mod scheduler;
pub mod service;

use certainty_common::types::ValidationError;
use certainty_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("monitor not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for MonitorError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id, .. } => MonitorError::NotFound(id),
            other => MonitorError::Storage(other),
        }
    }
}

impl MonitorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MonitorError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
