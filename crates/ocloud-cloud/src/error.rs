//! Cloud provider error types

use thiserror::Error;

/// HTTP status used by the control plane to signal throttling
pub const HTTP_TOO_MANY_REQUESTS: u16 = 429;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Rate limited ({status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("rate limit exceeded after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        source: Box<CloudError>,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Worker task failed: {0}")]
    Join(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Build an error from an HTTP status and the service's message.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            HTTP_TOO_MANY_REQUESTS => CloudError::RateLimited { status, message },
            404 => CloudError::NotFound(message),
            401 | 403 => CloudError::PermissionDenied(message),
            _ => CloudError::Api { status, message },
        }
    }

    /// Whether the remote API rejected the call for issuing requests too fast
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CloudError::RateLimited { .. })
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            CloudError::Cancelled => true,
            CloudError::RetriesExhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(CloudError::from_status(429, "slow down").is_rate_limited());
        assert!(matches!(
            CloudError::from_status(404, "gone"),
            CloudError::NotFound(_)
        ));
        assert!(matches!(
            CloudError::from_status(403, "nope"),
            CloudError::PermissionDenied(_)
        ));
        assert!(matches!(
            CloudError::from_status(500, "boom"),
            CloudError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = CloudError::RetriesExhausted {
            retries: 5,
            source: Box::new(CloudError::from_status(429, "TooManyRequests")),
        };
        assert_eq!(
            err.to_string(),
            "rate limit exceeded after 5 retries: Rate limited (429): TooManyRequests"
        );
        assert!(!err.is_rate_limited());
        assert!(!err.is_cancelled());
    }
}
