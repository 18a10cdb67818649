//! boardchat - streaming AI chat client for the task board
//!
//! The core is [`sse::ReplyDecoder`], which turns a chunked event-stream
//! body into assistant text fragments. [`chat`] drives it over an HTTP
//! response with cancellation, and [`cli`] wires it to a terminal.
//!
//! This library exposes modules for use in integration tests.

pub mod adapters;
pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod sse;
pub mod traits;
