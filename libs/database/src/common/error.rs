use std::time::Duration;

/// Unified database error type for all database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Driver-level errors (URI parsing, client construction, commands)
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Initial connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A close was already issued for this connection
    #[error("Connection is already closing")]
    AlreadyClosing,

    /// The driver did not finish shutting down in time
    #[error("Closing the connection exceeded {0:?}")]
    CloseTimedOut(Duration),

    /// In-memory connection state could not be read
    #[error("Connection state unavailable: {0}")]
    StateUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
