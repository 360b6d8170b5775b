use thiserror::Error;

/// Errors reported by a session service implementation.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("unauthorized - credentials or session rejected")]
    Unauthorized,

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("rate limited - please wait before retrying")]
    RateLimited,

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies kept in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ServiceError {
    /// Truncate a response body to avoid dragging large payloads into logs
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ServiceError::Unauthorized,
            403 => ServiceError::AccessDenied(truncated),
            404 => ServiceError::NotFound(truncated),
            429 => ServiceError::RateLimited,
            500..=599 => ServiceError::ServerError(truncated),
            _ => ServiceError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
