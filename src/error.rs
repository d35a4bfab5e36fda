use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibrarySearchError>;

#[derive(Debug, Error)]
pub enum LibrarySearchError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Caller-side input rejection. The message is shown to the user as-is.
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for LibrarySearchError {
    fn from(e: rusqlite::Error) -> Self {
        LibrarySearchError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for LibrarySearchError {
    fn from(e: serde_json::Error) -> Self {
        LibrarySearchError::Serialization(e.to_string())
    }
}
