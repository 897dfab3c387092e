//! Error types for LPT Défis
//!
//! One taxonomy for the whole reconciliation flow. Which variants are
//! recoverable depends on the caller:
//! - `StorageUnavailable` is treated as "nothing pending"
//! - `Persistence`, `Conflict` and `Timeout` are recovered per record
//! - `InvalidIdentity` is a contract violation and always surfaces

/// MongoDB duplicate key error code
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Main error type for LPT Défis operations
#[derive(Debug, thiserror::Error)]
pub enum DefisError {
    #[error("Local anonymous store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Participation already exists: {0}")]
    Conflict(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DefisError {
    /// Short, user-presentable description without internals
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::StorageUnavailable(_) => "Local storage is not available",
            Self::InvalidIdentity(_) => "You need to be signed in",
            Self::Persistence(_) | Self::Database(_) | Self::Timeout(_) => {
                "The server could not save your participations"
            }
            Self::Conflict(_) => "This participation was already saved",
            Self::Notification(_) | Self::Internal(_) => "Something went wrong",
            Self::Auth(_) => "Your session is no longer valid",
            Self::Config(_) => "The application is misconfigured",
        }
    }
}

impl From<std::io::Error> for DefisError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for DefisError {
    fn from(err: serde_json::Error) -> Self {
        Self::StorageUnavailable(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for DefisError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        let duplicate = matches!(
            err.kind.as_ref(),
            ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY_CODE
        );

        if duplicate {
            Self::Conflict(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for DefisError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("JWT error: {}", err))
    }
}

/// Result type alias for LPT Défis operations
pub type Result<T> = std::result::Result<T, DefisError>;
