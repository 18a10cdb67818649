//! SSE (Server-Sent Events) reply decoding
//!
//! Decodes the chat endpoint's streaming response body. The body is a
//! sequence of `\n`-terminated lines:
//! - `: <anything>` - comment/keep-alive (ignored)
//! - empty line - ignored
//! - `data: <payload>` - a JSON delta record, or the `[DONE]` sentinel
//!
//! # Module structure
//! - `events` - Line and payload types (SseLine, ReplyPayload, DeltaRecord)
//! - `lines` - Line classification
//! - `payloads` - Payload parsing
//! - `decoder` - The incremental ReplyDecoder

mod decoder;
mod events;
mod lines;
mod payloads;

pub use decoder::{DecoderState, ReplyDecoder, DEFAULT_MAX_REBUFFER_ATTEMPTS};
pub use events::{DeltaRecord, PayloadError, ReplyPayload, SseLine, DONE_SENTINEL};
pub use lines::{parse_sse_line, strip_carriage_return};
pub use payloads::parse_payload;
