//! Event Interpreter
//!
//! Maps one decoded [`Frame`] to exactly one [`Delta`].
//!
//! Only frames that start with `data:` carry events. The payload after the
//! marker is JSON:
//!
//! ```text
//! data: {"response": "partial text"}
//! data: {"done": true}
//! data: [DONE]
//! ```
//!
//! A payload that does not parse is ignored instead of failing the stream.
//! Upstream chunking can cut a payload in half, so this is expected during
//! normal delivery.

use serde_json::Value;

use super::frame::Frame;

/// Marker that introduces an event payload
pub const DATA_MARKER: &str = "data:";

/// Sentinel payload that terminates the stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// Effect of one frame on the assistant message being assembled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta {
    /// Append text to the in-progress assistant message
    Append(String),
    /// The server signalled the end of the response
    End,
    /// Nothing to apply (unrecognised or malformed frame)
    Ignore,
}

/// Interpret a complete frame
///
/// A payload carrying both text and a `done` flag yields the text; the stream
/// closing right after finalizes the message anyway.
#[must_use]
pub fn interpret(frame: &Frame) -> Delta {
    let Some(payload) = data_payload(frame.as_str()) else {
        return Delta::Ignore;
    };

    if payload.trim() == DONE_SENTINEL {
        return Delta::End;
    }

    let value = match serde_json::from_str::<Value>(&payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!(error = %e, "Ignoring malformed event payload");
            return Delta::Ignore;
        }
    };

    if let Some(text) = value
        .get("response")
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
    {
        return Delta::Append(text.to_owned());
    }

    if value
        .get("done")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Delta::End;
    }

    Delta::Ignore
}

/// Extract the payload of a `data:` frame
///
/// Returns `None` unless the frame starts with the marker. Several `data:`
/// lines in one frame are joined with newlines; other fields are skipped.
fn data_payload(frame: &str) -> Option<String> {
    if !frame.starts_with(DATA_MARKER) {
        return None;
    }

    let lines: Vec<&str> = frame
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_MARKER))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    Some(lines.join("\n"))
}
