//! Client-side error type.

use thiserror::Error;

use ideabase_core::ValidationError;

/// Everything that can stop a client action. Display strings are what the
/// user sees.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No usable session; nothing was sent.
    #[error("Please sign in")]
    SignInRequired,

    /// Rejected locally before any network call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The API answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        details: Option<String>,
    },

    /// Transport-level failure (connect, timeout, malformed response).
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored session file could not be read or written.
    #[error("Session file error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the action was refused without touching the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ClientError::SignInRequired | ClientError::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_server_message() {
        let err = ClientError::Api {
            status: 500,
            message: "Failed to save file metadata".into(),
            details: Some("connection reset".into()),
        };
        assert_eq!(err.to_string(), "Failed to save file metadata");
        assert_eq!(err.status(), Some(500));
        assert!(!err.is_local());
    }

    #[test]
    fn test_local_errors() {
        assert_eq!(ClientError::SignInRequired.to_string(), "Please sign in");
        let err = ClientError::from(ValidationError::MissingFile);
        assert!(err.is_local());
        assert_eq!(err.to_string(), "No file uploaded");
    }
}
