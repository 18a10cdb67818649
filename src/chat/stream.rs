//! Async reply session.
//!
//! [`ReplyStream`] pulls chunks from the transport, runs them through a
//! [`ReplyDecoder`] and yields [`ReplyEvent`]s: one `Delta` per fragment and
//! a single `Finished` carrying the [`ReplyOutcome`]. Awaiting the next chunk
//! is the only suspension point; it is raced against cancellation and the
//! optional deadline.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use tokio::time::{Instant, Sleep};
use tracing::{debug, info_span, warn, Instrument, Span};
use uuid::Uuid;

use super::cancel::CancelToken;
use crate::config::ChatConfig;
use crate::error::{ChatError, StreamError};
use crate::sse::{DecoderState, ReplyDecoder, DEFAULT_MAX_REBUFFER_ATTEMPTS};
use crate::traits::ByteStream;

/// Decoder settings for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Retries spent on a malformed line before it is dropped
    pub max_rebuffer_attempts: usize,
    /// Fail with `Stalled` if the reply has not ended by then
    pub deadline: Option<Duration>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_rebuffer_attempts: DEFAULT_MAX_REBUFFER_ATTEMPTS,
            deadline: None,
        }
    }
}

impl From<&ChatConfig> for DecodeOptions {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_rebuffer_attempts: config.max_rebuffer_attempts,
            deadline: config.deadline,
        }
    }
}

/// How a completed reply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The `[DONE]` sentinel arrived
    Sentinel,
    /// The transport reported end of data
    EndOfStream,
}

/// Terminal status of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyStatus {
    Completed(Completion),
    Cancelled,
    Failed(ChatError),
}

/// Final result of a session.
///
/// `reply` is exactly the text yielded as deltas, kept on every path.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyOutcome {
    pub reply: String,
    pub status: ReplyStatus,
}

impl ReplyOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ReplyStatus::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, ReplyStatus::Cancelled)
    }

    /// The failure, if the session failed.
    pub fn error(&self) -> Option<&ChatError> {
        match &self.status {
            ReplyStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Item yielded by a [`ReplyStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// One non-empty text fragment, in arrival order
    Delta(String),
    /// Last item of the stream
    Finished(ReplyOutcome),
}

/// A finite, non-restartable stream of reply events.
///
/// Yields `None` after `Finished`. The transport stream is dropped as soon
/// as the session reaches a terminal status, and also when this value is
/// dropped early.
pub struct ReplyStream {
    session_id: Uuid,
    inner: Pin<Box<dyn Stream<Item = ReplyEvent> + Send>>,
}

impl std::fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyStream")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl ReplyStream {
    /// Start a session over `body`.
    pub fn new(body: ByteStream, cancel: CancelToken, options: DecodeOptions) -> Self {
        let session_id = Uuid::new_v4();
        let span = info_span!("reply_stream", session_id = %session_id);
        span.in_scope(|| {
            debug!(
                max_rebuffer_attempts = options.max_rebuffer_attempts,
                deadline_ms = options.deadline.map(|d| d.as_millis() as u64),
                "reply session started"
            )
        });

        let session = Session {
            body: Some(body),
            decoder: ReplyDecoder::with_max_rebuffer_attempts(options.max_rebuffer_attempts),
            pending: VecDeque::new(),
            delivered: String::new(),
            cancel,
            deadline: options.deadline,
            timer: None,
            started: None,
            finished: false,
            span,
        };

        let inner = stream::unfold(session, |session| {
            let span = session.span.clone();
            next_event(session).instrument(span)
        });

        Self {
            session_id,
            inner: Box::pin(inner),
        }
    }

    /// Identifier carried by this session's tracing span.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Drive the session to its end, handing each fragment to `on_delta`.
    pub async fn collect_outcome<F>(mut self, mut on_delta: F) -> ReplyOutcome
    where
        F: FnMut(&str),
    {
        let mut reply = String::new();
        while let Some(event) = self.next().await {
            match event {
                ReplyEvent::Delta(fragment) => {
                    reply.push_str(&fragment);
                    on_delta(&fragment);
                }
                ReplyEvent::Finished(outcome) => return outcome,
            }
        }

        // Finished is always yielded before the end; keep what arrived anyway
        ReplyOutcome {
            reply,
            status: ReplyStatus::Cancelled,
        }
    }
}

impl Stream for ReplyStream {
    type Item = ReplyEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Mutable state threaded through the unfold loop.
struct Session {
    /// Released (set to `None`) on every terminal path
    body: Option<ByteStream>,
    decoder: ReplyDecoder,
    /// Fragments decoded but not yet yielded
    pending: VecDeque<String>,
    /// Concatenation of the fragments yielded so far
    delivered: String,
    cancel: CancelToken,
    deadline: Option<Duration>,
    /// Armed on the first poll so construction needs no runtime
    timer: Option<Pin<Box<Sleep>>>,
    started: Option<Instant>,
    finished: bool,
    span: Span,
}

/// What woke the session up while it waited for data.
enum Wake {
    Cancelled,
    Stalled,
    Chunk(Option<Result<bytes::Bytes, crate::traits::HttpError>>),
}

impl Session {
    fn conclude(mut self, status: ReplyStatus) -> (ReplyEvent, Session) {
        self.body = None;
        self.pending.clear();
        self.finished = true;

        match &status {
            ReplyStatus::Cancelled => self.decoder.cancel(),
            ReplyStatus::Failed(err) => {
                self.decoder.fail();
                warn!(code = err.error_code(), error = %err, "reply session failed");
            }
            ReplyStatus::Completed(_) => {}
        }

        debug!(
            state = self.decoder.state().as_str(),
            reply_len = self.delivered.len(),
            elapsed_ms = self.elapsed_ms(),
            "reply session ended"
        );

        let outcome = ReplyOutcome {
            reply: std::mem::take(&mut self.delivered),
            status,
        };
        (ReplyEvent::Finished(outcome), self)
    }

    /// Start the clock and arm the deadline timer, once.
    fn start_clock(&mut self) {
        if self.started.is_some() {
            return;
        }
        let started = Instant::now();
        self.started = Some(started);
        self.timer = self
            .deadline
            .map(|d| Box::pin(tokio::time::sleep_until(started + d)));
    }

    fn elapsed_ms(&self) -> u64 {
        self.started
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    fn end_of_stream_status(&self) -> ReplyStatus {
        let dropped = self.decoder.malformed_payloads();
        if dropped > 0 && self.decoder.reply().is_empty() {
            ReplyStatus::Failed(StreamError::MalformedPayload { dropped }.into())
        } else {
            ReplyStatus::Completed(Completion::EndOfStream)
        }
    }
}

async fn deadline_elapsed(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

async fn next_event(mut session: Session) -> Option<(ReplyEvent, Session)> {
    session.start_clock();
    loop {
        if session.finished {
            return None;
        }

        if session.cancel.is_cancelled() {
            return Some(session.conclude(ReplyStatus::Cancelled));
        }

        if let Some(fragment) = session.pending.pop_front() {
            session.delivered.push_str(&fragment);
            return Some((ReplyEvent::Delta(fragment), session));
        }

        match session.decoder.state() {
            DecoderState::CompletedBySentinel => {
                return Some(session.conclude(ReplyStatus::Completed(Completion::Sentinel)));
            }
            DecoderState::CompletedByEof => {
                let status = session.end_of_stream_status();
                return Some(session.conclude(status));
            }
            _ => {}
        }

        let Some(body) = session.body.as_mut() else {
            let err = StreamError::ConnectionLost {
                message: "transport already released".to_string(),
            };
            return Some(session.conclude(ReplyStatus::Failed(err.into())));
        };

        let wake = tokio::select! {
            biased;
            _ = session.cancel.cancelled() => Wake::Cancelled,
            _ = deadline_elapsed(&mut session.timer) => Wake::Stalled,
            chunk = body.next() => Wake::Chunk(chunk),
        };

        match wake {
            Wake::Cancelled => return Some(session.conclude(ReplyStatus::Cancelled)),
            Wake::Stalled => {
                let err = StreamError::Stalled {
                    elapsed_ms: session.elapsed_ms(),
                };
                return Some(session.conclude(ReplyStatus::Failed(err.into())));
            }
            Wake::Chunk(Some(Ok(chunk))) => {
                let fragments = session.decoder.feed(&chunk);
                session.pending.extend(fragments);
                if session.decoder.is_terminal() {
                    session.body = None;
                }
            }
            Wake::Chunk(Some(Err(err))) => {
                let err = StreamError::ConnectionLost {
                    message: err.to_string(),
                };
                return Some(session.conclude(ReplyStatus::Failed(err.into())));
            }
            Wake::Chunk(None) => {
                session.body = None;
                let fragments = session.decoder.finish();
                session.pending.extend(fragments);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::HttpError;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn body_of(chunks: &[&'static str]) -> ByteStream {
        let items: Vec<Result<Bytes, HttpError>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))).collect();
        Box::pin(stream::iter(items))
    }

    /// Body that records whether it was dropped.
    fn tracked<S>(inner: S, dropped: Arc<AtomicBool>) -> ByteStream
    where
        S: Stream<Item = Result<Bytes, HttpError>> + Send + 'static,
    {
        struct OnDrop(Arc<AtomicBool>);
        impl Drop for OnDrop {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }
        let guard = OnDrop(dropped);
        Box::pin(inner.map(move |item| {
            let _ = &guard;
            item
        }))
    }

    async fn collect(stream: ReplyStream) -> Vec<ReplyEvent> {
        stream.collect::<Vec<_>>().await
    }

    #[tokio::test]
    async fn test_two_chunk_reply() {
        let body = body_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\ndata: [DONE]\n",
        ]);
        let events = collect(ReplyStream::new(body, CancelToken::new(), DecodeOptions::default())).await;

        assert_eq!(
            events,
            vec![
                ReplyEvent::Delta("Hel".to_string()),
                ReplyEvent::Delta("lo".to_string()),
                ReplyEvent::Finished(ReplyOutcome {
                    reply: "Hello".to_string(),
                    status: ReplyStatus::Completed(Completion::Sentinel),
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_end_of_stream_without_sentinel() {
        let body = body_of(&["data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}"]);
        let outcome = ReplyStream::new(body, CancelToken::new(), DecodeOptions::default())
            .collect_outcome(|_| {})
            .await;

        assert_eq!(outcome.reply, "Hi");
        assert_eq!(outcome.status, ReplyStatus::Completed(Completion::EndOfStream));
    }

    #[tokio::test]
    async fn test_only_malformed_payloads_fails() {
        let body = body_of(&["data: {broken\n", "data: also broken\n"]);
        let outcome = ReplyStream::new(body, CancelToken::new(), DecodeOptions::default())
            .collect_outcome(|_| {})
            .await;

        assert_eq!(outcome.reply, "");
        assert_eq!(
            outcome.error(),
            Some(&ChatError::Stream(StreamError::MalformedPayload { dropped: 2 }))
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_after_content_still_completes() {
        let body = body_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
            "data: {broken\n",
        ]);
        let outcome = ReplyStream::new(body, CancelToken::new(), DecodeOptions::default())
            .collect_outcome(|_| {})
            .await;

        assert_eq!(outcome.reply, "ok");
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn test_transport_error_keeps_partial_reply() {
        let dropped = Arc::new(AtomicBool::new(false));
        let inner = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"par\"}}]}\n")),
            Err(HttpError::Io("connection reset".to_string())),
        ]);
        let body = tracked(inner, dropped.clone());

        let mut fragments = Vec::new();
        let outcome = ReplyStream::new(body, CancelToken::new(), DecodeOptions::default())
            .collect_outcome(|f| fragments.push(f.to_string()))
            .await;

        assert_eq!(fragments, vec!["par"]);
        assert_eq!(outcome.reply, "par");
        assert!(matches!(
            outcome.error(),
            Some(ChatError::Stream(StreamError::ConnectionLost { message })) if message.contains("reset")
        ));
        assert!(outcome.error().is_some_and(|e| e.is_transport()));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_chunk() {
        let dropped = Arc::new(AtomicBool::new(false));
        let inner = stream::iter(vec![Ok(Bytes::from_static(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
        ))])
        .chain(stream::pending());
        let body = tracked(inner, dropped.clone());

        let cancel = CancelToken::new();
        let mut stream = ReplyStream::new(body, cancel.clone(), DecodeOptions::default());

        assert_eq!(stream.next().await, Some(ReplyEvent::Delta("Hel".to_string())));

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        assert_eq!(
            stream.next().await,
            Some(ReplyEvent::Finished(ReplyOutcome {
                reply: "Hel".to_string(),
                status: ReplyStatus::Cancelled,
            }))
        );
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_cancel_suppresses_buffered_fragments() {
        let body = body_of(&[concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        )]);
        let cancel = CancelToken::new();
        let mut stream = ReplyStream::new(body, cancel.clone(), DecodeOptions::default());

        assert_eq!(stream.next().await, Some(ReplyEvent::Delta("a".to_string())));
        cancel.cancel();

        match stream.next().await {
            Some(ReplyEvent::Finished(outcome)) => {
                assert!(outcome.is_cancelled());
                assert_eq!(outcome.reply, "a");
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_cancel_before_first_poll() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let body = body_of(&["data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n"]);

        let events = collect(ReplyStream::new(body, cancel, DecodeOptions::default())).await;
        assert_eq!(
            events,
            vec![ReplyEvent::Finished(ReplyOutcome {
                reply: String::new(),
                status: ReplyStatus::Cancelled,
            })]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_reports_stall() {
        let dropped = Arc::new(AtomicBool::new(false));
        let body = tracked(stream::pending(), dropped.clone());
        let options = DecodeOptions {
            deadline: Some(Duration::from_secs(30)),
            ..DecodeOptions::default()
        };

        let outcome = ReplyStream::new(body, CancelToken::new(), options)
            .collect_outcome(|_| {})
            .await;

        assert!(matches!(
            outcome.error(),
            Some(ChatError::Stream(StreamError::Stalled { elapsed_ms })) if *elapsed_ms >= 30_000
        ));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_deadline_stream_built_outside_runtime() {
        let body = body_of(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
            "data: [DONE]\n",
        ]);
        let options = DecodeOptions {
            deadline: Some(Duration::from_secs(5)),
            ..DecodeOptions::default()
        };
        let stream = ReplyStream::new(body, CancelToken::new(), options);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome = runtime.block_on(stream.collect_outcome(|_| {}));

        assert_eq!(outcome.reply, "ok");
        assert_eq!(outcome.status, ReplyStatus::Completed(Completion::Sentinel));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_counts_from_first_poll() {
        let body = body_of(&["data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n"]);
        let options = DecodeOptions {
            deadline: Some(Duration::from_secs(1)),
            ..DecodeOptions::default()
        };
        let stream = ReplyStream::new(body, CancelToken::new(), options);

        tokio::time::advance(Duration::from_secs(10)).await;
        let outcome = stream.collect_outcome(|_| {}).await;

        assert_eq!(outcome.reply, "late");
        assert_eq!(outcome.status, ReplyStatus::Completed(Completion::EndOfStream));
    }

    #[tokio::test]
    async fn test_sentinel_releases_transport_without_reading_rest() {
        let dropped = Arc::new(AtomicBool::new(false));
        let inner = stream::iter(vec![Ok(Bytes::from_static(b"data: [DONE]\n"))]).chain(stream::pending());
        let body = tracked(inner, dropped.clone());

        let outcome = ReplyStream::new(body, CancelToken::new(), DecodeOptions::default())
            .collect_outcome(|_| {})
            .await;

        assert_eq!(outcome.status, ReplyStatus::Completed(Completion::Sentinel));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_decode_options_from_config() {
        let config = ChatConfig::new("http://localhost", "k")
            .with_max_rebuffer_attempts(2)
            .with_deadline(Duration::from_secs(9));
        assert_eq!(
            DecodeOptions::from(&config),
            DecodeOptions {
                max_rebuffer_attempts: 2,
                deadline: Some(Duration::from_secs(9)),
            }
        );
    }
}
