mod message;
mod request;

pub use message::{ChatMessage, Conversation, MessageRole};
pub use request::ChatRequest;
