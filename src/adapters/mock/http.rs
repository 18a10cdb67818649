//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that returns predefined chunk
//! streams or errors, and tracks whether handed-out streams were released.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// Request body
    pub body: Option<String>,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return these chunks, then end of data
    Stream(Vec<Bytes>),
    /// Return these chunks, then a read error
    StreamThenError(Vec<Bytes>, HttpError),
    /// Return these chunks, then never produce another item
    StreamThenPending(Vec<Bytes>),
    /// Fail the request itself (no stream is handed out)
    Error(HttpError),
}

impl MockResponse {
    /// Chunk a body into pieces of `size` bytes.
    pub fn chunked(body: &str, size: usize) -> Self {
        let chunks = body
            .as_bytes()
            .chunks(size.max(1))
            .map(Bytes::copy_from_slice)
            .collect();
        MockResponse::Stream(chunks)
    }

    /// Deliver each string as one chunk.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(
            chunks
                .into_iter()
                .map(|chunk| Bytes::from(chunk.into()))
                .collect(),
        )
    }
}

/// Decrements the open-stream count when the stream is dropped.
struct ReleaseGuard {
    open: Arc<AtomicUsize>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

struct TrackedStream {
    inner: ByteStream,
    _guard: ReleaseGuard,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, HttpError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Mock HTTP client for testing.
///
/// # Example
///
/// ```ignore
/// use boardchat::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.set_response(
///     "https://example.supabase.co/functions/v1/chat",
///     MockResponse::chunks(["data: [DONE]\n"]),
/// );
///
/// let body = client.post_stream(url, "{}", &Headers::new()).await?;
/// assert_eq!(client.get_requests().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    /// Configured responses by URL
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Streams handed out and not yet dropped
    open_streams: Arc<AtomicUsize>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock that answers every URL with `response`.
    pub fn with_default(response: MockResponse) -> Self {
        let client = Self::new();
        client.set_default_response(response);
        client
    }

    /// Set a response for a specific URL (exact match).
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of body streams handed out and still alive.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers, body: Option<String>) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body,
        });
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        let responses = self.responses.lock().unwrap();
        if let Some(response) = responses.get(url) {
            return Some(response.clone());
        }

        let default = self.default_response.lock().unwrap();
        default.clone()
    }

    fn track(&self, inner: ByteStream) -> ByteStream {
        self.open_streams.fetch_add(1, Ordering::SeqCst);
        Box::pin(TrackedStream {
            inner,
            _guard: ReleaseGuard {
                open: self.open_streams.clone(),
            },
        })
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record_request("POST", url, headers, Some(body.to_string()));

        let inner: ByteStream = match self.get_response(url) {
            Some(MockResponse::Stream(chunks)) => stream::iter(chunks.into_iter().map(Ok)).boxed(),
            Some(MockResponse::StreamThenError(chunks, err)) => stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::once(async move { Err(err) }))
                .boxed(),
            Some(MockResponse::StreamThenPending(chunks)) => stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed(),
            Some(MockResponse::Error(err)) => return Err(err),
            None => return Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        };

        Ok(self.track(inner))
    }
}
