//! Response sanitizer with a backslash-repair fallback.
//!
//! Models asked for LaTeX inside JSON strings often forget to double the
//! backslashes (`"$\widehat{A}$"`), which makes the whole array invalid.
//! Decoding runs in two passes:
//!
//! 1. Parse the raw text as a JSON array of [`LessonPlanRecord`].
//! 2. On failure, escape every backslash that does not start a legal JSON
//!    escape and parse again.
//!
//! Parsing is all-or-nothing per pass; there is no partial-record recovery.

use thiserror::Error;
use tracing::{error, warn};

use super::record::LessonPlanRecord;

/// Characters that may legally follow a backslash inside a JSON string.
const ESCAPE_CONTINUATIONS: [char; 9] = ['/', '"', '\\', 'b', 'f', 'n', 'r', 't', 'u'];

/// A successfully decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub records: Vec<LessonPlanRecord>,
    /// `true` when the repair pass was needed.
    pub repaired: bool,
}

/// Both decode passes failed.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("response is not a valid lesson plan array ({original}); repair pass also failed ({repaired})")]
    Malformed {
        original: serde_json::Error,
        repaired: serde_json::Error,
    },
}

/// Escape backslashes that do not begin a legal JSON escape sequence.
///
/// Scans left to right. A backslash followed by one of `/ " \ b f n r t u`
/// is copied together with its continuation character, so an existing `\\`
/// pair stays a pair. Every other backslash is doubled.
///
/// This deliberately differs from a per-character lookahead, which would
/// treat the second backslash of `\\w` as stray and escape it.
pub fn escape_stray_backslashes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 16);
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next) if ESCAPE_CONTINUATIONS.contains(&next) => {
                out.push('\\');
                out.push(next);
                chars.next();
            }
            _ => out.push_str("\\\\"),
        }
    }

    out
}

/// Decode a raw model response into records.
///
/// Blank input decodes to an empty record list.
pub fn decode_records(raw: &str) -> Result<Decoded, DecodeError> {
    if raw.trim().is_empty() {
        return Ok(Decoded {
            records: Vec::new(),
            repaired: false,
        });
    }

    let original = match serde_json::from_str::<Vec<LessonPlanRecord>>(raw) {
        Ok(records) => {
            return Ok(Decoded {
                records,
                repaired: false,
            });
        }
        Err(e) => e,
    };

    warn!(error = %original, "response JSON did not parse, retrying with escaped backslashes");
    let repaired_text = escape_stray_backslashes(raw);
    match serde_json::from_str::<Vec<LessonPlanRecord>>(&repaired_text) {
        Ok(records) => Ok(Decoded {
            records,
            repaired: true,
        }),
        Err(repaired) => Err(DecodeError::Malformed { original, repaired }),
    }
}

/// Lossy variant of [`decode_records`]: a response that cannot be decoded
/// becomes an empty list instead of an error.
pub fn sanitize_response(raw: &str) -> Vec<LessonPlanRecord> {
    match decode_records(raw) {
        Ok(decoded) => decoded.records,
        Err(e) => {
            error!(error = %e, response_len = raw.len(), "discarding undecodable response");
            Vec::new()
        }
    }
}
