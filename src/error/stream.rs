//! Streaming-related error types.
//!
//! This module defines errors that occur once the reply body is being read.

use std::fmt;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Reading the body failed mid-stream.
    ConnectionLost { message: String },

    /// The stream ended with no content and at least one payload that never
    /// parsed.
    MalformedPayload { dropped: usize },

    /// Neither the sentinel nor end of data arrived within the deadline.
    Stalled { elapsed_ms: u64 },
}

impl StreamError {
    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::ConnectionLost { .. } | StreamError::Stalled { .. }
        )
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::ConnectionLost { .. } => {
                "Connection to the chat service was lost while the reply was streaming."
                    .to_string()
            }
            StreamError::MalformedPayload { .. } => {
                "Received invalid data from the chat service. Please try again.".to_string()
            }
            StreamError::Stalled { elapsed_ms } => format!(
                "No complete reply after {:.1} seconds. The stream was stopped.",
                *elapsed_ms as f64 / 1000.0
            ),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::ConnectionLost { .. } => "E_STREAM_CONN",
            StreamError::MalformedPayload { .. } => "E_STREAM_PAYLOAD",
            StreamError::Stalled { .. } => "E_STREAM_STALLED",
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::ConnectionLost { message } => {
                write!(f, "Stream connection lost: {}", message)
            }
            StreamError::MalformedPayload { dropped } => {
                write!(f, "Stream produced no content; {} malformed payload(s) dropped", dropped)
            }
            StreamError::Stalled { elapsed_ms } => {
                write!(f, "Stream stalled after {} ms", elapsed_ms)
            }
        }
    }
}

impl std::error::Error for StreamError {}
