//! Incremental decoder for streamed chat replies
//!
//! Turns raw body chunks into assistant text fragments. Chunks may split
//! lines, the `data:` prefix, JSON payloads, or multi-byte UTF-8 sequences
//! anywhere; the fragments produced depend only on the bytes, never on where
//! the transport cut them.
//!
//! A `data:` line whose payload fails to parse is held at the head of the
//! buffer and retried on the next chunk. After `max_rebuffer_attempts`
//! retries, or once the stream has ended, it is dropped and counted as a
//! malformed payload.

use tracing::{debug, trace, warn};

use crate::sse::events::{PayloadError, ReplyPayload, SseLine};
use crate::sse::lines::{parse_sse_line, strip_carriage_return};
use crate::sse::payloads::parse_payload;

/// Default number of retries for a line whose payload does not parse.
pub const DEFAULT_MAX_REBUFFER_ATTEMPTS: usize = 8;

/// Lifecycle of one decoding session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No chunk has arrived yet
    AwaitingFirstChunk,
    /// At least one chunk arrived; more may follow
    Streaming,
    /// The `[DONE]` sentinel was seen
    CompletedBySentinel,
    /// The transport signalled end of data
    CompletedByEof,
    /// The consumer cancelled the session
    Cancelled,
    /// The session failed (transport error or deadline)
    Failed,
}

impl DecoderState {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            DecoderState::AwaitingFirstChunk | DecoderState::Streaming
        )
    }

    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            DecoderState::AwaitingFirstChunk => "awaiting_first_chunk",
            DecoderState::Streaming => "streaming",
            DecoderState::CompletedBySentinel => "completed_by_sentinel",
            DecoderState::CompletedByEof => "completed_by_eof",
            DecoderState::Cancelled => "cancelled",
            DecoderState::Failed => "failed",
        }
    }
}

/// Holds back the bytes of a multi-byte UTF-8 sequence cut by a chunk
/// boundary. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, chunk: &[u8], out: &mut String) {
        let mut joined = std::mem::take(&mut self.pending);
        let mut rest: &[u8] = if joined.is_empty() {
            chunk
        } else {
            joined.extend_from_slice(chunk);
            &joined
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + invalid..];
                        }
                        None => {
                            self.pending = rest[valid..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    /// End of input: an unfinished sequence becomes one replacement char.
    fn flush(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }

    fn len(&self) -> usize {
        self.pending.len()
    }
}

/// What a complete line means to the session.
enum LineOutcome {
    Skip,
    Sentinel,
    Fragment(String),
    Malformed(PayloadError),
}

/// What to do with the line at the head of the buffer.
enum Flow {
    Consume,
    Hold,
    Stop,
}

fn interpret_line(line: &str) -> LineOutcome {
    let payload = match parse_sse_line(line) {
        SseLine::Data(payload) => payload,
        SseLine::Empty | SseLine::Comment(_) | SseLine::Other(_) => return LineOutcome::Skip,
    };

    if payload.is_empty() {
        return LineOutcome::Skip;
    }

    match parse_payload(payload) {
        Ok(ReplyPayload::Done) => LineOutcome::Sentinel,
        Ok(ReplyPayload::Delta(record)) => match record.fragment() {
            Some(text) => LineOutcome::Fragment(text.to_string()),
            None => LineOutcome::Skip,
        },
        Err(err) => LineOutcome::Malformed(err),
    }
}

/// Stateful decoder for one streamed reply.
///
/// Feed it body chunks in arrival order with [`feed`](Self::feed) and call
/// [`finish`](Self::finish) when the transport reports end of data. Each call
/// returns the fragments that became available, in order.
#[derive(Debug)]
pub struct ReplyDecoder {
    utf8: Utf8Carry,
    /// Decoded text not yet resolved into complete lines
    buffer: String,
    /// Concatenation of every fragment emitted so far
    reply: String,
    state: DecoderState,
    max_rebuffer_attempts: usize,
    /// Retries spent on the line currently held at the head of the buffer
    rebuffer_attempts: usize,
    malformed_payloads: usize,
}

impl Default for ReplyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyDecoder {
    /// Create a decoder with the default retry bound.
    pub fn new() -> Self {
        Self::with_max_rebuffer_attempts(DEFAULT_MAX_REBUFFER_ATTEMPTS)
    }

    /// Create a decoder that retries a malformed line at most `attempts`
    /// times before dropping it. Zero drops it on the first failure.
    pub fn with_max_rebuffer_attempts(attempts: usize) -> Self {
        Self {
            utf8: Utf8Carry::default(),
            buffer: String::new(),
            reply: String::new(),
            state: DecoderState::AwaitingFirstChunk,
            max_rebuffer_attempts: attempts,
            rebuffer_attempts: 0,
            malformed_payloads: 0,
        }
    }

    /// Feed one transport chunk. Returns the fragments it completed.
    ///
    /// A terminal decoder ignores further input.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.state.is_terminal() {
            trace!(len = chunk.len(), state = self.state.as_str(), "ignoring chunk after terminal state");
            return Vec::new();
        }

        self.state = DecoderState::Streaming;
        self.utf8.decode(chunk, &mut self.buffer);
        self.drain_lines(false)
    }

    /// Signal end of data. Remaining lines are processed without further
    /// retries, including a final line with no terminator.
    pub fn finish(&mut self) -> Vec<String> {
        if self.state.is_terminal() {
            return Vec::new();
        }

        self.utf8.flush(&mut self.buffer);
        let mut fragments = self.drain_lines(true);

        if !self.state.is_terminal() && !self.buffer.is_empty() {
            let tail = std::mem::take(&mut self.buffer);
            let outcome = interpret_line(strip_carriage_return(&tail));
            self.apply(outcome, true, &mut fragments);
        }

        if !self.state.is_terminal() {
            self.state = DecoderState::CompletedByEof;
        }
        self.buffer.clear();

        debug!(
            reply_len = self.reply.len(),
            malformed = self.malformed_payloads,
            "decoder finished at end of stream"
        );
        fragments
    }

    /// Mark the session cancelled. No-op on a terminal decoder.
    pub fn cancel(&mut self) {
        self.terminate(DecoderState::Cancelled);
    }

    /// Mark the session failed. No-op on a terminal decoder.
    pub fn fail(&mut self) {
        self.terminate(DecoderState::Failed);
    }

    fn terminate(&mut self, state: DecoderState) {
        if !self.state.is_terminal() {
            self.state = state;
            self.buffer.clear();
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Whether the session reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The reply assembled so far.
    pub fn reply(&self) -> &str {
        &self.reply
    }

    /// Consume the decoder, returning the assembled reply.
    pub fn into_reply(self) -> String {
        self.reply
    }

    /// Number of `data:` lines dropped because their payload never parsed.
    pub fn malformed_payloads(&self) -> usize {
        self.malformed_payloads
    }

    /// Bytes and characters still waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.utf8.len()
    }

    fn drain_lines(&mut self, at_eof: bool) -> Vec<String> {
        let mut fragments = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let outcome = interpret_line(strip_carriage_return(&self.buffer[..newline]));
            match self.apply(outcome, at_eof, &mut fragments) {
                Flow::Consume => {
                    self.buffer.drain(..=newline);
                }
                Flow::Hold => break,
                Flow::Stop => {
                    self.buffer.clear();
                    break;
                }
            }
        }

        fragments
    }

    fn apply(&mut self, outcome: LineOutcome, at_eof: bool, fragments: &mut Vec<String>) -> Flow {
        match outcome {
            LineOutcome::Skip => Flow::Consume,
            LineOutcome::Sentinel => {
                debug!(reply_len = self.reply.len(), "received [DONE] sentinel");
                self.state = DecoderState::CompletedBySentinel;
                Flow::Stop
            }
            LineOutcome::Fragment(text) => {
                self.rebuffer_attempts = 0;
                self.reply.push_str(&text);
                fragments.push(text);
                Flow::Consume
            }
            LineOutcome::Malformed(err) => {
                if at_eof || self.rebuffer_attempts >= self.max_rebuffer_attempts {
                    warn!(
                        attempts = self.rebuffer_attempts,
                        error = %err,
                        "dropping data line with malformed payload"
                    );
                    self.rebuffer_attempts = 0;
                    self.malformed_payloads += 1;
                    Flow::Consume
                } else {
                    self.rebuffer_attempts += 1;
                    debug!(
                        attempt = self.rebuffer_attempts,
                        error = %err,
                        "payload did not parse, holding line for next chunk"
                    );
                    Flow::Hold
                }
            }
        }
    }
}
