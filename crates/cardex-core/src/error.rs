//! Error types for cardex.

use thiserror::Error;

/// Result type alias using cardex's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cardex operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Search operation failed
    #[error("Search error: {0}")]
    Search(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error was caused by the caller's input rather than by
    /// the service itself. The HTTP layer maps client errors to 4xx and
    /// everything else to 5xx without matching on individual variants.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("test resource".to_string());
        assert_eq!(err.to_string(), "Not found: test resource");
    }

    #[test]
    fn test_error_display_search() {
        let err = Error::Search("index unavailable".to_string());
        assert_eq!(err.to_string(), "Search error: index unavailable");
    }

    #[test]
    fn test_error_display_serialization() {
        let err = Error::Serialization("invalid JSON".to_string());
        assert_eq!(err.to_string(), "Serialization error: invalid JSON");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("missing DATABASE_URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing DATABASE_URL");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("query is required".to_string());
        assert_eq!(err.to_string(), "Invalid input: query is required");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("unexpected state".to_string());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("bad page".into()).is_client_error());
        assert!(Error::NotFound("no such set".into()).is_client_error());
        assert!(!Error::Search("index build failed".into()).is_client_error());
        assert!(!Error::Internal("poisoned lock".into()).is_client_error());
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        let result = get_result();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_debug_format() {
        let err = Error::NotFound("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("NotFound"));
    }
}
