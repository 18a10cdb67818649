//! Mock implementations for testing.
//!
//! Test doubles for the trait abstractions, so the chat client can be
//! exercised without network access.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable chunk streams

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
