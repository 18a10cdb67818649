//! SSE line and payload types
//!
//! Contains the classified line shapes of a chat completion stream and the
//! typed payloads carried by its `data:` lines.

use thiserror::Error;

/// Literal payload that marks the end of the logical stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A single line of the response body, classified by shape.
///
/// Borrowed from the decoder's buffer; the line terminator is already gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Blank (or whitespace-only) line
    Empty,
    /// `: keep-alive` style comment, with the marker removed
    Comment(&'a str),
    /// `data:` line, with the prefix removed and the payload trimmed
    Data(&'a str),
    /// Anything else (`event:`, `id:`, `retry:`, garbage)
    Other(&'a str),
}

/// Typed payload of a `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPayload {
    /// The `[DONE]` sentinel
    Done,
    /// A structured delta record
    Delta(DeltaRecord),
}

/// Incremental piece of the assistant reply, as read from
/// `choices[0].delta.content`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeltaRecord {
    /// Text fragment, if the record carried one
    pub content: Option<String>,
}

impl DeltaRecord {
    /// Create a record carrying a text fragment.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
        }
    }

    /// The fragment to emit, if any. Empty strings are not fragments.
    pub fn fragment(&self) -> Option<&str> {
        self.content.as_deref().filter(|text| !text.is_empty())
    }
}

/// Errors from parsing a `data:` payload.
///
/// Both variants are treated as transient by the decoder: the line is held
/// and retried when more input arrives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The JSON ended before the value was complete
    #[error("incomplete JSON payload: {0}")]
    Incomplete(String),
    /// The payload is not valid JSON
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_eof() {
            PayloadError::Incomplete(err.to_string())
        } else {
            PayloadError::InvalidJson(err.to_string())
        }
    }
}
