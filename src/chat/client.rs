//! Client for the streaming chat function.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info};

use super::cancel::CancelToken;
use super::stream::{DecodeOptions, ReplyEvent, ReplyOutcome, ReplyStatus, ReplyStream};
use crate::config::ChatConfig;
use crate::error::{classify_http_error, ChatError, ChatResult};
use crate::models::{ChatRequest, Conversation};
use crate::traits::{Headers, HttpClient};

/// Sends a conversation to the chat endpoint and streams the reply back.
///
/// # Example
///
/// ```ignore
/// use boardchat::adapters::ReqwestHttpClient;
/// use boardchat::chat::{CancelToken, ChatClient};
/// use boardchat::models::Conversation;
///
/// let client = ChatClient::new(config, Arc::new(ReqwestHttpClient::new()));
/// let mut conversation = Conversation::new();
/// let outcome = client
///     .send(&mut conversation, "What is due today?", CancelToken::new(), |f| print!("{f}"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct ChatClient {
    config: ChatConfig,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("url", &self.config.chat_url())
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    pub fn new(config: ChatConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.api_key),
        );
        headers
    }

    /// Post the conversation and return a stream over the reply.
    ///
    /// Fails before streaming when the endpoint cannot be reached or answers
    /// with a non-success status.
    pub async fn stream_reply(
        &self,
        conversation: &Conversation,
        cancel: CancelToken,
    ) -> ChatResult<ReplyStream> {
        let url = self.config.chat_url();
        let body = serde_json::to_string(&ChatRequest::from_conversation(conversation))?;

        debug!(url = %url, messages = conversation.len(), "posting chat request");
        let stream = self
            .http
            .post_stream(&url, &body, &self.headers())
            .await
            .map_err(|err| ChatError::Network(classify_http_error(err, &url)))?;

        Ok(ReplyStream::new(stream, cancel, DecodeOptions::from(&self.config)))
    }

    /// Send one user message and stream the reply into `conversation`.
    ///
    /// The input is trimmed; empty input is rejected without a request. The
    /// user message stays in the conversation even if the request fails.
    /// Each fragment updates the trailing assistant message before it is
    /// handed to `on_delta`, so a failed or cancelled reply leaves its
    /// partial text in place.
    pub async fn send<F>(
        &self,
        conversation: &mut Conversation,
        input: &str,
        cancel: CancelToken,
        mut on_delta: F,
    ) -> ChatResult<ReplyOutcome>
    where
        F: FnMut(&str),
    {
        let input = input.trim();
        if input.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        conversation.push_user(input);
        let mut stream = self.stream_reply(conversation, cancel).await?;

        let mut reply = String::new();
        while let Some(event) = stream.next().await {
            match event {
                ReplyEvent::Delta(fragment) => {
                    reply.push_str(&fragment);
                    conversation.upsert_assistant(reply.as_str());
                    on_delta(&fragment);
                }
                ReplyEvent::Finished(outcome) => {
                    info!(
                        session_id = %stream.session_id(),
                        status = status_label(&outcome.status),
                        reply_len = outcome.reply.len(),
                        "reply finished"
                    );
                    return Ok(outcome);
                }
            }
        }

        Ok(ReplyOutcome {
            reply,
            status: ReplyStatus::Cancelled,
        })
    }
}

fn status_label(status: &ReplyStatus) -> &'static str {
    match status {
        ReplyStatus::Completed(_) => "completed",
        ReplyStatus::Cancelled => "cancelled",
        ReplyStatus::Failed(_) => "failed",
    }
}
