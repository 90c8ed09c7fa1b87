//! REST client error types

use ocloud_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OciError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Service returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OciError>;

impl From<OciError> for CloudError {
    fn from(err: OciError) -> Self {
        match err {
            OciError::Status {
                status,
                code,
                message,
            } => CloudError::from_status(status, format!("{}: {}", code, message)),
            OciError::MissingEnvVar(_) | OciError::InvalidConfig(_) => {
                CloudError::InvalidConfig(err.to_string())
            }
            OciError::Http(e) => CloudError::Http(e.to_string()),
            OciError::Json(e) => CloudError::Json(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_cloud_error() {
        let throttled: CloudError = OciError::Status {
            status: 429,
            code: "TooManyRequests".to_string(),
            message: "slow down".to_string(),
        }
        .into();
        assert!(throttled.is_rate_limited());

        let missing: CloudError = OciError::Status {
            status: 404,
            code: "NotAuthorizedOrNotFound".to_string(),
            message: "subnet".to_string(),
        }
        .into();
        assert!(
            matches!(missing, CloudError::NotFound(m) if m.contains("NotAuthorizedOrNotFound"))
        );
    }
}
