//! Error types for outfit finishing and job queue operations

use thiserror::Error;

/// Result type alias for outfit finishing operations
pub type Result<T> = std::result::Result<T, PawdrobeError>;

/// Comprehensive error types for outfit finishing operations
#[derive(Error, Debug)]
pub enum PawdrobeError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image format or processing errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Generated frame bytes that could not be decoded into an image
    #[error("Image decode error: {0}")]
    Decode(String),

    /// Upstream frame generator failure, with the HTTP-style status when known
    #[error("Generator error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Generator {
        /// Human-readable failure description from the generator
        message: String,
        /// Status code reported by the generator, if any
        status: Option<u16>,
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed or incomplete outfit item payload
    #[error("Invalid outfit items: {0}")]
    InvalidItems(String),

    /// Operation attempted against a job in the wrong state
    #[error("Job state error: {0}")]
    JobState(String),

    /// Wardrobe persistence failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PawdrobeError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new generator error without a status code
    pub fn generator<S: Into<String>>(msg: S) -> Self {
        Self::Generator {
            message: msg.into(),
            status: None,
        }
    }

    /// Create a new generator error carrying a status code
    pub fn generator_with_status<S: Into<String>>(msg: S, status: u16) -> Self {
        Self::Generator {
            message: msg.into(),
            status: Some(status),
        }
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new invalid items error
    pub fn invalid_items<S: Into<String>>(msg: S) -> Self {
        Self::InvalidItems(msg.into())
    }

    /// Create a new job state error
    pub fn job_state<S: Into<String>>(msg: S) -> Self {
        Self::JobState(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Whether this error describes a transient generator failure worth retrying.
    ///
    /// A generator error is transient when the reported status is 429 or 500,
    /// or when the message contains one of the rate limiting / server fault
    /// markers upstream providers are known to emit. Decode errors and every
    /// other variant are permanent.
    #[must_use]
    pub fn is_transient_generator(&self) -> bool {
        match self {
            Self::Generator { message, status } => {
                if matches!(status, Some(429) | Some(500)) {
                    return true;
                }
                message.contains("rate limit")
                    || message.contains("quota")
                    || message.contains("Internal Server Error")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = PawdrobeError::invalid_config("test config error");
        assert!(matches!(err, PawdrobeError::InvalidConfig(_)));

        let err = PawdrobeError::invalid_items("missing image reference");
        assert!(matches!(err, PawdrobeError::InvalidItems(_)));
    }

    #[test]
    fn test_error_display() {
        let err = PawdrobeError::decode("corrupt PNG stream");
        assert_eq!(err.to_string(), "Image decode error: corrupt PNG stream");

        let err = PawdrobeError::generator_with_status("model overloaded", 429);
        assert_eq!(
            err.to_string(),
            "Generator error (status 429): model overloaded"
        );

        let err = PawdrobeError::generator("no capacity");
        assert_eq!(err.to_string(), "Generator error: no capacity");
    }

    #[test]
    fn test_transient_classification_by_status() {
        assert!(PawdrobeError::generator_with_status("too many requests", 429)
            .is_transient_generator());
        assert!(PawdrobeError::generator_with_status("server fell over", 500)
            .is_transient_generator());
        assert!(!PawdrobeError::generator_with_status("bad prompt", 400)
            .is_transient_generator());
        assert!(!PawdrobeError::generator_with_status("forbidden", 403)
            .is_transient_generator());
    }

    #[test]
    fn test_transient_classification_by_message() {
        assert!(PawdrobeError::generator("hit the rate limit, slow down")
            .is_transient_generator());
        assert!(PawdrobeError::generator("monthly quota exceeded").is_transient_generator());
        assert!(PawdrobeError::generator("500 Internal Server Error").is_transient_generator());
        assert!(!PawdrobeError::generator("prompt rejected by safety filter")
            .is_transient_generator());
    }

    #[test]
    fn test_non_generator_errors_are_permanent() {
        assert!(!PawdrobeError::decode("rate limit").is_transient_generator());
        assert!(!PawdrobeError::internal("quota").is_transient_generator());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "rate limit");
        assert!(!PawdrobeError::from(io).is_transient_generator());
    }

    #[test]
    fn test_file_io_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err =
            PawdrobeError::file_io_error("read journal", Path::new("/var/lib/jobs.jsonl"), io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("read journal"));
        assert!(error_string.contains("/var/lib/jobs.jsonl"));
    }
}
