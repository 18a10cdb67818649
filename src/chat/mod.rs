//! Chat session layer.
//!
//! - [`ChatClient`] posts a conversation and hands the body to a reply stream
//! - [`ReplyStream`] drives the decoder and reports a single [`ReplyOutcome`]
//! - [`CancelToken`] cancels an in-flight reply cooperatively

mod cancel;
mod client;
mod stream;

pub use cancel::CancelToken;
pub use client::ChatClient;
pub use stream::{Completion, DecodeOptions, ReplyEvent, ReplyOutcome, ReplyStatus, ReplyStream};
