//! Payload deserialization for `data:` lines
//!
//! The server speaks the OpenAI chat-completions chunk format:
//! `{"choices":[{"delta":{"content":"..."}}]}`. Only the first choice's
//! delta content is read; every other field is ignored.

use serde_json::Value;

use crate::sse::events::{DeltaRecord, PayloadError, ReplyPayload, DONE_SENTINEL};

/// JSON pointer to the text fragment inside a delta record.
const CONTENT_POINTER: &str = "/choices/0/delta/content";

/// Parse a trimmed `data:` payload into the sentinel or a delta record.
///
/// Any syntactically valid JSON is accepted. A record without the expected
/// shape (no `choices`, an empty array, a non-string `content`) yields a
/// `DeltaRecord` with no content rather than an error.
pub fn parse_payload(payload: &str) -> Result<ReplyPayload, PayloadError> {
    if payload == DONE_SENTINEL {
        return Ok(ReplyPayload::Done);
    }

    let value: Value = serde_json::from_str(payload)?;
    let content = value
        .pointer(CONTENT_POINTER)
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ReplyPayload::Delta(DeltaRecord { content }))
}
