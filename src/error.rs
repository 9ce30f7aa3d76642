use thiserror::Error;

/// Custom error types for the group session server
#[derive(Debug, Error)]
pub enum SessionError {
    /// Login errors
    #[error("Invalid class code.")]
    InvalidCode,

    #[error("All groups are full.")]
    SessionFull,

    /// Admin move errors
    #[error("Destination group is full.")]
    DestinationFull,

    #[error("Group {0} does not exist")]
    GroupNotFound(usize),

    #[error("No student at group {group} index {index}")]
    StudentNotFound { group: usize, index: usize },

    /// HTTP admin errors
    #[error("Invalid admin credentials")]
    Unauthorized,

    /// Wire errors
    #[error("Failed to serialize message: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Generic errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using SessionError
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// Helper to create Internal errors with context
    pub fn internal(msg: impl Into<String>) -> Self {
        SessionError::Internal(msg.into())
    }
}
