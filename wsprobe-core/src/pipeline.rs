//! Outbound and inbound message transformation.
//!
//! Outbound drafts are parsed strictly and re-serialized with four-space
//! indentation before they go out, so stray trailing characters never reach
//! the server. Drafts that are not JSON are held back for an explicit
//! raw-send confirmation.
//!
//! Inbound payloads that parse as JSON are pretty-printed with nested
//! strings shown verbatim (see [`crate::markers`]); anything else is shown
//! as-is.

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::markers::render_readable;

/// Indentation used for every pretty-printed payload.
const INDENT: &[u8] = b"    ";

/// Width of the `//====` banner that separates log entries.
const BANNER_WIDTH: usize = 199;

/// What the outbound pipeline decided to do with a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// The draft parsed; send this canonical text.
    Json(String),
    /// The draft parsed to a falsy value (`null`, `false`, `0`, `""`).
    Empty,
    /// The draft is not JSON; sending it requires confirmation.
    NotJson {
        /// Parser error describing why the draft was rejected.
        reason: String,
    },
}

/// Serialize `value` with four-space indentation, keeping key order.
///
/// # Errors
///
/// Returns a serialization error if the value cannot be printed.
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(<serde_json::Error as serde::ser::Error>::custom)
}

/// Whether a parsed value would count as "nothing" in a boolean context.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Decide how an (already template-substituted) draft should be sent.
#[must_use]
pub fn prepare_outbound(text: &str) -> Outbound {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            return Outbound::NotJson {
                reason: e.to_string(),
            };
        }
    };

    if is_falsy(&value) {
        return Outbound::Empty;
    }

    match to_pretty_string(&value) {
        Ok(pretty) => Outbound::Json(pretty),
        Err(e) => Outbound::NotJson {
            reason: e.to_string(),
        },
    }
}

/// Make a received payload readable.
///
/// JSON is pretty-printed with nested strings unescaped; anything else,
/// including JSON that fails to re-serialize, is returned unchanged.
#[must_use]
pub fn format_inbound(payload: &str) -> String {
    serde_json::from_str::<Value>(payload)
        .and_then(render_readable)
        .unwrap_or_else(|e| {
            tracing::trace!(error = %e, "received payload shown as plain text");
            payload.to_string()
        })
}

/// Render one log entry: banner, timestamp comment, blank line, body.
#[must_use]
pub fn format_log_entry(timestamp: &str, body: &str) -> String {
    let banner = "=".repeat(BANNER_WIDTH);
    format!("\n//{banner}\n// [{timestamp}]:\n\n{body}\n\n")
}
