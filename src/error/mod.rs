//! Unified error handling for boardchat.
//!
//! - **Error Categories**: High-level classification for handling decisions
//! - **Domain-specific Errors**: Network (before streaming) and Stream (while
//!   decoding) errors
//! - **Unified Error Type**: `ChatError` consolidates all error types
//! - **Result Type Alias**: `ChatResult<T>` for consistent return types
//!
//! # Error Categories
//!
//! | Category | Examples | Retryable |
//! |----------|----------|-----------|
//! | Network | Connection refused, body read failed, stalled | Yes |
//! | Server | Non-2xx status, stream with only malformed payloads | Yes |
//! | Client | Request encoding failure | No |
//! | User | Empty message, cancelled request | No |
//! | Configuration | Missing endpoint or key | No |

mod category;
mod chat_error;
mod network;
mod result;
mod stream;

pub use category::ErrorCategory;
pub use chat_error::ChatError;
pub use network::{classify_http_error, NetworkError};
pub use result::ChatResult;
pub use stream::StreamError;

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Every error kind in the chat taxonomy maps to a code, a category and
    /// a user-facing message.
    #[test]
    fn test_error_unification() {
        let errors: Vec<ChatError> = vec![
            NetworkError::ConnectionFailed {
                url: "http://localhost:54321".to_string(),
                message: "refused".to_string(),
            }
            .into(),
            NetworkError::rejected(402, r#"{"error":"Payment required"}"#).into(),
            StreamError::MalformedPayload { dropped: 1 }.into(),
            StreamError::Stalled { elapsed_ms: 30_000 }.into(),
            ChatError::EmptyMessage,
        ];

        for err in errors {
            assert!(!err.error_code().is_empty(), "{err:?}");
            assert!(!err.user_message().is_empty(), "{err:?}");
            assert!(!err.recovery_hint().is_empty(), "{err:?}");
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ChatError = json_err.into();
        assert!(matches!(err, ChatError::Encoding { .. }));
        assert_eq!(err.category(), ErrorCategory::Client);
    }

    #[test]
    fn test_retry_logic() {
        let retryable: Vec<ChatError> = vec![
            NetworkError::Timeout {
                operation: "chat request".to_string(),
                message: "30s".to_string(),
            }
            .into(),
            NetworkError::rejected(500, "").into(),
            StreamError::ConnectionLost {
                message: "eof".to_string(),
            }
            .into(),
        ];
        for err in retryable {
            assert!(err.is_retryable(), "Expected {:?} to be retryable", err);
        }

        let permanent: Vec<ChatError> = vec![
            NetworkError::rejected(400, "").into(),
            NetworkError::Cancelled.into(),
            StreamError::MalformedPayload { dropped: 3 }.into(),
            ChatError::Config {
                message: "missing key".to_string(),
            },
        ];
        for err in permanent {
            assert!(!err.is_retryable(), "Expected {:?} to not be retryable", err);
        }
    }
}
