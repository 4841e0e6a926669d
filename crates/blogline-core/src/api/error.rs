use serde::Deserialize;
use thiserror::Error;

/// Message the backend puts in a 401 body when the account is blocked
pub const BLOCKED_USER_MESSAGE: &str = "User is blocked";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unauthorized - please log in again")]
    Unauthorized,

    #[error("User temporarily blocked")]
    AccountBlocked,

    #[error("Session could not be renewed: {0}")]
    RefreshFailed(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request failed ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// `{message}` / `{error}` error body convention
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    message: Option<String>,
    error: Option<String>,
}

impl ErrorPayload {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn text(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.is_empty())
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Human-readable message from an error body, preferring `message`, then
    /// `error`, then the (truncated) raw body.
    pub fn message_from_body(body: &str) -> String {
        ErrorPayload::parse(body)
            .text()
            .unwrap_or_else(|| Self::truncate_body(body))
    }

    /// Whether a 401 body carries the blocked-account signal
    pub fn is_blocked_signal(body: &str) -> bool {
        let payload = ErrorPayload::parse(body);
        payload.message.as_deref() == Some(BLOCKED_USER_MESSAGE)
            || payload.error.as_deref() == Some(BLOCKED_USER_MESSAGE)
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let message = Self::message_from_body(body);
        match status {
            401 if Self::is_blocked_signal(body) => ApiError::AccountBlocked,
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::Http { status, message },
        }
    }

    /// Errors after which the local session no longer exists
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthorized | ApiError::AccountBlocked | ApiError::RefreshFailed(_)
        )
    }
}
