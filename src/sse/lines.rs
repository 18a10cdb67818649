//! Line classification for the response body.

use crate::sse::events::SseLine;

/// Prefix of an event-data line, including its separating space.
const DATA_PREFIX: &str = "data: ";

/// Classify a single line (without its terminator).
///
/// Only lines starting with `data: ` carry a payload, which is trimmed on
/// both sides. `data:x` without the space is not a data line.
pub fn parse_sse_line(line: &str) -> SseLine<'_> {
    if let Some(comment) = line.strip_prefix(':') {
        return SseLine::Comment(comment.trim());
    }

    if line.trim().is_empty() {
        return SseLine::Empty;
    }

    if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
        return SseLine::Data(rest.trim());
    }

    SseLine::Other(line)
}

/// Remove one trailing carriage return, if present.
pub fn strip_carriage_return(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
