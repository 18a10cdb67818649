//! Chat client configuration.
//!
//! Values come from the environment, with builder methods for callers that
//! construct the configuration in code (tests, embedding applications).

use std::str::FromStr;
use std::time::Duration;

use crate::error::{ChatError, ChatResult};
use crate::sse::DEFAULT_MAX_REBUFFER_ATTEMPTS;

/// Env var holding the database-as-a-service project URL.
pub const ENV_SUPABASE_URL: &str = "BOARDCHAT_SUPABASE_URL";
/// Env var holding the publishable API key sent as the bearer token.
pub const ENV_SUPABASE_KEY: &str = "BOARDCHAT_SUPABASE_KEY";
/// Env var overriding the malformed-line retry bound.
pub const ENV_MAX_REBUFFER: &str = "BOARDCHAT_MAX_REBUFFER";
/// Env var setting a decode deadline in seconds.
pub const ENV_DEADLINE_SECS: &str = "BOARDCHAT_DEADLINE_SECS";

/// Path of the streaming chat function, relative to the project URL.
pub const CHAT_FUNCTION_PATH: &str = "/functions/v1/chat";

/// Configuration for talking to the chat endpoint.
///
/// # Example
///
/// ```ignore
/// use boardchat::config::ChatConfig;
///
/// let config = ChatConfig::new("https://abc.supabase.co", "publishable-key")
///     .with_max_rebuffer_attempts(4)
///     .with_deadline(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Project base URL, without a trailing slash
    pub base_url: String,
    /// Bearer token for the chat function
    pub api_key: String,
    /// Retries spent on a malformed line before it is dropped
    pub max_rebuffer_attempts: usize,
    /// Optional bound on how long one reply may take (unset = no bound)
    pub deadline: Option<Duration>,
}

impl ChatConfig {
    /// Create a configuration with default decode options.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_rebuffer_attempts: DEFAULT_MAX_REBUFFER_ATTEMPTS,
            deadline: None,
        }
    }

    /// Set the malformed-line retry bound.
    pub fn with_max_rebuffer_attempts(mut self, attempts: usize) -> Self {
        self.max_rebuffer_attempts = attempts;
        self
    }

    /// Set a decode deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Full URL of the streaming chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url, CHAT_FUNCTION_PATH)
    }

    /// Load configuration from environment variables.
    ///
    /// The URL and key are required; the numeric options fall back to their
    /// defaults when unset and are rejected when they do not parse.
    pub fn from_env() -> ChatResult<Self> {
        let base_url = required_var(ENV_SUPABASE_URL)?;
        let api_key = required_var(ENV_SUPABASE_KEY)?;

        let mut config = Self::new(base_url, api_key);

        if let Some(attempts) = numeric_var(ENV_MAX_REBUFFER)? {
            config = config.with_max_rebuffer_attempts(attempts);
        }
        if let Some(secs) = numeric_var::<u64>(ENV_DEADLINE_SECS)? {
            config = config.with_deadline(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

fn required_var(name: &str) -> ChatResult<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ChatError::Config {
            message: format!("{} is not set", name),
        }),
    }
}

/// Parse an optional unsigned env var straight into the field's type.
fn numeric_var<T: FromStr>(name: &str) -> ChatResult<Option<T>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>().map(Some).map_err(|_| ChatError::Config {
        message: format!("{} must be a non-negative integer, got '{}'", name, raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [ENV_SUPABASE_URL, ENV_SUPABASE_KEY, ENV_MAX_REBUFFER, ENV_DEADLINE_SECS] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_chat_url_strips_trailing_slash() {
        let config = ChatConfig::new("https://abc.supabase.co/", "key");
        assert_eq!(config.chat_url(), "https://abc.supabase.co/functions/v1/chat");
        assert_eq!(config.max_rebuffer_attempts, DEFAULT_MAX_REBUFFER_ATTEMPTS);
        assert_eq!(config.deadline, None);
    }

    #[test]
    fn test_builder_methods() {
        let config = ChatConfig::new("http://localhost:54321", "key")
            .with_max_rebuffer_attempts(0)
            .with_deadline(Duration::from_secs(5));
        assert_eq!(config.max_rebuffer_attempts, 0);
        assert_eq!(config.deadline, Some(Duration::from_secs(5)));
    }

    #[test]
    #[serial]
    fn test_from_env_requires_url_and_key() {
        clear_env();
        let err = ChatConfig::from_env().unwrap_err();
        assert!(matches!(&err, ChatError::Config { message } if message.contains(ENV_SUPABASE_URL)));

        std::env::set_var(ENV_SUPABASE_URL, "https://abc.supabase.co");
        let err = ChatConfig::from_env().unwrap_err();
        assert!(matches!(&err, ChatError::Config { message } if message.contains(ENV_SUPABASE_KEY)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_reads_options() {
        clear_env();
        std::env::set_var(ENV_SUPABASE_URL, "https://abc.supabase.co");
        std::env::set_var(ENV_SUPABASE_KEY, " key ");
        std::env::set_var(ENV_MAX_REBUFFER, "3");
        std::env::set_var(ENV_DEADLINE_SECS, "90");

        let config = ChatConfig::from_env().unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.max_rebuffer_attempts, 3);
        assert_eq!(config.deadline, Some(Duration::from_secs(90)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_invalid_numbers() {
        clear_env();
        std::env::set_var(ENV_SUPABASE_URL, "https://abc.supabase.co");
        std::env::set_var(ENV_SUPABASE_KEY, "key");
        std::env::set_var(ENV_DEADLINE_SECS, "soon");

        let err = ChatConfig::from_env().unwrap_err();
        assert!(matches!(&err, ChatError::Config { message } if message.contains(ENV_DEADLINE_SECS)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_max_rebuffer_parses_full_usize_range() {
        clear_env();
        std::env::set_var(ENV_SUPABASE_URL, "https://abc.supabase.co");
        std::env::set_var(ENV_SUPABASE_KEY, "key");
        std::env::set_var(ENV_MAX_REBUFFER, usize::MAX.to_string());

        let config = ChatConfig::from_env().unwrap();
        assert_eq!(config.max_rebuffer_attempts, usize::MAX);

        // One past usize::MAX must be rejected, not wrapped
        let too_big = (usize::MAX as u128 + 1).to_string();
        std::env::set_var(ENV_MAX_REBUFFER, &too_big);
        let err = ChatConfig::from_env().unwrap_err();
        assert!(matches!(&err, ChatError::Config { message } if message.contains(&too_big)));

        std::env::set_var(ENV_MAX_REBUFFER, "-1");
        let err = ChatConfig::from_env().unwrap_err();
        assert!(matches!(&err, ChatError::Config { message } if message.contains(ENV_MAX_REBUFFER)));
        clear_env();
    }
}
