//! Result type alias for chat operations.

use super::chat_error::ChatError;

/// Type alias for Results using ChatError.
///
/// # Example
///
/// ```ignore
/// use boardchat::error::ChatResult;
///
/// fn endpoint(config: &ChatConfig) -> ChatResult<String> {
///     Ok(config.chat_url())
/// }
/// ```
pub type ChatResult<T> = Result<T, ChatError>;
