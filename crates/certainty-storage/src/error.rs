/// Errors returned by [`MonitorStore`](crate::MonitorStore) implementations.
///
/// # Examples
///
/// ```rust
/// use certainty_storage::error::StorageError;
///
/// let err = StorageError::NotFound {
///     entity: "monitor",
///     id: "1234".to_string(),
/// };
/// assert!(err.is_not_found());
/// assert!(err.to_string().contains("1234"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No record with the given id exists.
    #[error("Storage: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// An underlying SQLite error.
    #[error("Storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A timestamp column held a value outside the representable range.
    #[error("Storage: invalid timestamp in column '{column}': {value}")]
    InvalidTimestamp { column: &'static str, value: i64 },

    /// The `state` column held something other than a known monitor state.
    #[error("Storage: invalid monitor state '{0}'")]
    InvalidState(String),

    #[error("Storage: {0}")]
    Other(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
