//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - Streaming POST used by the chat client

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError};
