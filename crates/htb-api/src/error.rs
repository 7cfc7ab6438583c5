//! Error types for htb-api

use thiserror::Error;

/// Errors that can occur at the transport boundary
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure (connect, TLS, timeout, body read)
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Response JSON is missing an expected envelope or field
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// Client could not be configured (bad URL, proxy or token)
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the server rejected the request with the given status.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, ApiError::Status { status, .. } if *status == code)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Shape(err.to_string())
    }
}

/// Result type for transport operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 403: forbidden");
        assert!(err.is_status(403));
        assert!(!err.is_status(404));
    }

    #[test]
    fn test_json_error_maps_to_shape() {
        let err: ApiError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ApiError::Shape(_)));
    }
}
