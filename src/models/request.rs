use serde::{Deserialize, Serialize};

use super::message::{ChatMessage, Conversation};

/// Request body for the streaming chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// Full history, ending with the message being answered
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Build a request from the conversation so far
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            messages: conversation.messages().to_vec(),
        }
    }
}
