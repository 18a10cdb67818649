//! Network-related error types.
//!
//! Errors raised before the reply starts streaming: connecting, sending the
//! request, and non-success statuses from the chat endpoint.

use std::fmt;

use crate::traits::HttpError;

/// Network-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Connection to the server failed.
    ConnectionFailed { url: String, message: String },

    /// Request timed out.
    Timeout { operation: String, message: String },

    /// The endpoint answered with a non-2xx status before streaming began.
    HttpStatus { status: u16, message: String },

    /// Invalid request URL.
    InvalidUrl { url: String },

    /// Request was cancelled.
    Cancelled,

    /// Generic network error.
    Other { message: String },
}

impl NetworkError {
    /// Build a rejection from a non-success response body.
    ///
    /// The endpoint reports failures as `{"error": "..."}`; when the body has
    /// no such field the message falls back to `Error <status>`.
    pub fn rejected(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .and_then(|e| e.as_str())
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Error {}", status));

        NetworkError::HttpStatus { status, message }
    }

    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::ConnectionFailed { .. } => true,
            NetworkError::Timeout { .. } => true,
            NetworkError::HttpStatus { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            NetworkError::InvalidUrl { .. } => false,
            NetworkError::Cancelled => false,
            NetworkError::Other { .. } => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            NetworkError::ConnectionFailed { .. } => {
                "Unable to reach the chat service. Please check your internet connection."
                    .to_string()
            }
            NetworkError::Timeout { operation, .. } => {
                format!("The {} timed out. The server may be slow or unreachable.", operation)
            }
            // The endpoint's own message is already meant for people
            NetworkError::HttpStatus { message, .. } => message.clone(),
            NetworkError::InvalidUrl { url } => {
                format!("The chat endpoint '{}' is not a valid URL.", url)
            }
            NetworkError::Cancelled => "The request was cancelled.".to_string(),
            NetworkError::Other { message } => format!("Network error: {}", message),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed { .. } => "E_NET_CONN",
            NetworkError::Timeout { .. } => "E_NET_TIMEOUT",
            NetworkError::HttpStatus { .. } => "E_NET_REJECTED",
            NetworkError::InvalidUrl { .. } => "E_NET_URL",
            NetworkError::Cancelled => "E_NET_CANCEL",
            NetworkError::Other { .. } => "E_NET_OTHER",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::ConnectionFailed { url, message } => {
                write!(f, "Connection failed to '{}': {}", url, message)
            }
            NetworkError::Timeout { operation, message } => {
                write!(f, "{} timed out: {}", operation, message)
            }
            NetworkError::HttpStatus { status, message } => {
                write!(f, "Request rejected with HTTP {}: {}", status, message)
            }
            NetworkError::InvalidUrl { url } => write!(f, "Invalid URL: {}", url),
            NetworkError::Cancelled => write!(f, "Request cancelled"),
            NetworkError::Other { message } => write!(f, "Network error: {}", message),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Classify an error from the HTTP seam, for a request to `url`.
pub fn classify_http_error(err: HttpError, url: &str) -> NetworkError {
    match err {
        HttpError::ConnectionFailed(message) => NetworkError::ConnectionFailed {
            url: url.to_string(),
            message,
        },
        HttpError::Timeout(message) => NetworkError::Timeout {
            operation: "chat request".to_string(),
            message,
        },
        HttpError::ServerError { status, message } => NetworkError::rejected(status, &message),
        HttpError::Cancelled => NetworkError::Cancelled,
        HttpError::InvalidUrl(_) => NetworkError::InvalidUrl {
            url: url.to_string(),
        },
        HttpError::Io(message) | HttpError::Other(message) => NetworkError::Other { message },
    }
}
