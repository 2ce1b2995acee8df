//! Error types for the logging engine

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error while loading options
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unusable root directory or option value
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A flush of one stream failed; the batches it held are gone
    #[error("Failed to persist {batches} batch(es) to '{path}': {message}")]
    PersistenceFailure {
        path: String,
        batches: usize,
        message: String,
    },

    /// Compressing or pruning one generation failed
    #[error("Rotation failed for '{path}': {message}")]
    RotationFailure { path: String, message: String },

    /// The worker has shut down and no longer accepts commands
    #[error("Log handler already closed")]
    HandlerClosed,

    /// The process-wide handler has not been set up
    #[error("Logging not initialized")]
    NotInitialized,

    /// The process-wide handler is already set up
    #[error("Logging already initialized at '{path}'")]
    AlreadyInitialized { path: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a persistence failure for a stream file
    pub fn persistence(path: impl Into<String>, batches: usize, message: impl Into<String>) -> Self {
        LoggerError::PersistenceFailure {
            path: path.into(),
            batches,
            message: message.into(),
        }
    }

    /// Create a rotation failure for a backup file
    pub fn rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::RotationFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("Handler", "Invalid path");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::persistence("/var/log/app.log", 3, "Disk full");
        assert!(matches!(err, LoggerError::PersistenceFailure { batches: 3, .. }));

        let err = LoggerError::rotation("/var/log/app.log.2025-01-08_10.30.45", "Permission denied");
        assert!(matches!(err, LoggerError::RotationFailure { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::persistence("/var/log/app.log", 2, "Disk full");
        assert_eq!(
            err.to_string(),
            "Failed to persist 2 batch(es) to '/var/log/app.log': Disk full"
        );

        let err = LoggerError::rotation("/var/log/app.log.1", "Disk full");
        assert_eq!(err.to_string(), "Rotation failed for '/var/log/app.log.1': Disk full");

        assert_eq!(LoggerError::HandlerClosed.to_string(), "Log handler already closed");
        assert_eq!(LoggerError::NotInitialized.to_string(), "Logging not initialized");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("creating log root", "cannot create directory", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("creating log root"));
        assert!(err.to_string().contains("cannot create directory"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
