//! Unified error type for boardchat.
//!
//! `ChatError` consolidates the domain-specific errors so callers get one
//! type with consistent categorization, retry logic and user messaging.

use std::fmt;

use super::category::ErrorCategory;
use super::network::NetworkError;
use super::stream::StreamError;

/// Unified error type for chat operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Transport or request-rejection errors, raised before streaming.
    Network(NetworkError),

    /// Errors raised while the reply body is being decoded.
    Stream(StreamError),

    /// Missing or invalid configuration.
    Config { message: String },

    /// The message to send was empty after trimming.
    EmptyMessage,

    /// The request body could not be encoded.
    Encoding { message: String },
}

impl ChatError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::Network(NetworkError::HttpStatus { .. }) => ErrorCategory::Server,
            ChatError::Network(NetworkError::Cancelled) => ErrorCategory::User,
            ChatError::Network(NetworkError::InvalidUrl { .. }) => ErrorCategory::Configuration,
            ChatError::Network(_) => ErrorCategory::Network,
            ChatError::Stream(StreamError::MalformedPayload { .. }) => ErrorCategory::Server,
            ChatError::Stream(_) => ErrorCategory::Network,
            ChatError::Config { .. } => ErrorCategory::Configuration,
            ChatError::EmptyMessage => ErrorCategory::User,
            ChatError::Encoding { .. } => ErrorCategory::Client,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Network(err) => err.is_retryable(),
            ChatError::Stream(err) => err.is_retryable(),
            ChatError::Config { .. } | ChatError::EmptyMessage | ChatError::Encoding { .. } => {
                false
            }
        }
    }

    /// Check if this is a transport failure (connect or read).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ChatError::Network(
                NetworkError::ConnectionFailed { .. }
                    | NetworkError::Timeout { .. }
                    | NetworkError::Other { .. }
            ) | ChatError::Stream(StreamError::ConnectionLost { .. })
        )
    }

    /// Check if the endpoint rejected the request before streaming.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ChatError::Network(NetworkError::HttpStatus { .. }))
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Network(err) => err.user_message(),
            ChatError::Stream(err) => err.user_message(),
            ChatError::Config { message } => format!("Configuration error: {}", message),
            ChatError::EmptyMessage => "Type a message before sending.".to_string(),
            ChatError::Encoding { .. } => "Something went wrong".to_string(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::Network(err) => err.error_code(),
            ChatError::Stream(err) => err.error_code(),
            ChatError::Config { .. } => "E_CONFIG",
            ChatError::EmptyMessage => "E_EMPTY_MESSAGE",
            ChatError::Encoding { .. } => "E_ENCODING",
        }
    }

    /// Get the recovery hint for this error.
    pub fn recovery_hint(&self) -> &'static str {
        self.category().recovery_hint()
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Network(err) => write!(f, "{}", err),
            ChatError::Stream(err) => write!(f, "{}", err),
            ChatError::Config { message } => write!(f, "Configuration error: {}", message),
            ChatError::EmptyMessage => write!(f, "Message is empty"),
            ChatError::Encoding { message } => write!(f, "Failed to encode request: {}", message),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Network(err) => Some(err),
            ChatError::Stream(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for ChatError {
    fn from(err: NetworkError) -> Self {
        ChatError::Network(err)
    }
}

impl From<StreamError> for ChatError {
    fn from(err: StreamError) -> Self {
        ChatError::Stream(err)
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::Encoding {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_is_server_category() {
        let err: ChatError = NetworkError::rejected(503, "").into();
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(err.is_rejection());
        assert!(!err.is_transport());
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "Error 503");
    }

    #[test]
    fn test_transport_errors() {
        let connect: ChatError = NetworkError::ConnectionFailed {
            url: "http://localhost".to_string(),
            message: "refused".to_string(),
        }
        .into();
        let lost: ChatError = StreamError::ConnectionLost {
            message: "reset".to_string(),
        }
        .into();

        for err in [connect, lost] {
            assert!(err.is_transport(), "{err:?}");
            assert!(!err.is_rejection());
            assert_eq!(err.category(), ErrorCategory::Network);
        }
    }

    #[test]
    fn test_malformed_payload_category() {
        let err: ChatError = StreamError::MalformedPayload { dropped: 1 }.into();
        assert_eq!(err.category(), ErrorCategory::Server);
        assert!(!err.is_transport());
        assert_eq!(err.error_code(), "E_STREAM_PAYLOAD");
    }

    #[test]
    fn test_user_and_config_errors() {
        assert_eq!(ChatError::EmptyMessage.category(), ErrorCategory::User);
        assert!(!ChatError::EmptyMessage.is_retryable());

        let err = ChatError::Config {
            message: "BOARDCHAT_SUPABASE_URL is not set".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.recovery_hint().contains("BOARDCHAT_SUPABASE_KEY"));
        assert!(err.to_string().contains("BOARDCHAT_SUPABASE_URL"));
    }

    #[test]
    fn test_error_source() {
        use std::error::Error;

        let err: ChatError = StreamError::Stalled { elapsed_ms: 10 }.into();
        assert!(err.source().is_some());
        assert!(ChatError::EmptyMessage.source().is_none());
    }
}
