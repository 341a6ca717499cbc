//! Error types for the Proclima desk client
//!
//! All errors use thiserror for structured error handling.
//! They serialize as their display string so they can be shown as-is.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The request never reached the server (DNS, refused connection, TLS, ...)
    #[error("Cannot reach API: {0}")]
    Unreachable(String),

    /// The server answered with a non-2xx status
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Request timed out")]
    Timeout,

    /// Rejected locally, the request was never sent
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// HTTP status of an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_display_string() {
        let err = AppError::Api {
            status: 409,
            message: "SKU already exists".to_string(),
        };
        assert_eq!(serde_json::to_value(&err).unwrap(), "SKU already exists");
        assert_eq!(err.status(), Some(409));

        let err = AppError::NotFound("project 3".to_string());
        assert_eq!(serde_json::to_string(&err).unwrap(), "\"Not found: project 3\"");
        assert_eq!(err.status(), None);
    }
}
