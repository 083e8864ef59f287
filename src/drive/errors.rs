//! Drive API Error Types
//!
//! Structured error handling for Google Drive API operations.
//! Maps HTTP status codes to specific error variants for retry decisions.

/// Drive API error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriveError {
    #[error("Authentication expired or invalid access token")]
    AuthExpired,

    #[error("Rate limited: try again after backoff")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl DriveError {
    /// Whether a transport-level retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriveError::RateLimited
                | DriveError::Timeout
                | DriveError::Network(_)
                | DriveError::Server(_, _)
        )
    }

    /// Create a DriveError from an HTTP status code and response body
    ///
    /// Drive reports quota exhaustion as 403 with a `rateLimitExceeded`
    /// or `userRateLimitExceeded` reason, so those bodies map to RateLimited.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => DriveError::AuthExpired,
            403 if body.contains("ateLimitExceeded") => DriveError::RateLimited,
            403 => DriveError::Forbidden(body.to_string()),
            404 => DriveError::NotFound(body.to_string()),
            408 => DriveError::Timeout,
            429 => DriveError::RateLimited,
            500..=599 => DriveError::Server(status, body.to_string()),
            _ => DriveError::Request(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriveError::Timeout
        } else if err.is_connect() {
            DriveError::Network(err.to_string())
        } else if err.is_decode() {
            DriveError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DriveError::from_status(status.as_u16(), &err.to_string())
        } else {
            DriveError::Request(err.to_string())
        }
    }
}
