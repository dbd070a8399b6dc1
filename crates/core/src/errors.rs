use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Domain-rule denial. The message is the conflict engine's reason and
    /// is surfaced verbatim to the caller.
    #[error("{0}")]
    Conflict(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),

    #[error("Internal server error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type CalendarResult<T> = Result<T, CalendarError>;
