//! Marker substitution for readable rendering of received JSON.
//!
//! Pretty-printing a JSON value escapes control characters and quotes inside
//! strings, so a payload carrying a multi-line string shows up as one long
//! line full of `\n`. To render such strings as they were meant to be read,
//! every string nested inside an object or array is swapped for a unique
//! marker token `{%<n>%}` before serialization, and the markers are replaced
//! by the original text afterwards.
//!
//! Object keys and a bare top-level string are left alone. Any marker-like
//! text already present in an object key reserves that id for the pass, so
//! the replacement scan can never rewrite a key.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use serde_json::Value;

use crate::pipeline::to_pretty_string;

/// Marker ids are drawn from `0..MARKER_RANGE` while the table is small.
const MARKER_RANGE: u64 = 1000;

/// Mapping from marker id to the original string it stands in for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkerTable {
    markers: HashMap<u64, String>,
    reserved: HashSet<u64>,
}

impl MarkerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of markers in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Original string for the marker with the given id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&str> {
        self.markers.get(&id).map(String::as_str)
    }

    /// Iterate over `(token, original)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (String, &str)> {
        self.markers
            .iter()
            .map(|(id, original)| (marker_token(*id), original.as_str()))
    }

    /// Register `original` under a fresh random id and return its token.
    ///
    /// Ids are unique within the table. The draw range grows with the table
    /// so that at least half of it is always free.
    fn insert<R: Rng>(&mut self, original: String, rng: &mut R) -> String {
        let taken = self.markers.len().saturating_add(self.reserved.len());
        let used = u64::try_from(taken).unwrap_or(u64::MAX);
        let bound = MARKER_RANGE.max(used.saturating_mul(2).saturating_add(1));

        let mut id = rng.random_range(0..bound);
        while self.markers.contains_key(&id) || self.reserved.contains(&id) {
            id = rng.random_range(0..bound);
        }

        self.markers.insert(id, original);
        marker_token(id)
    }
}

/// Token text for marker `id`.
#[must_use]
pub fn marker_token(id: u64) -> String {
    format!("{{%{id}%}}")
}

/// A value whose nested strings have been swapped for marker tokens.
#[derive(Debug, Clone)]
pub struct Marked {
    /// The value with markers in place of strings.
    pub message: Value,
    /// Marker id to original string.
    pub markers: MarkerTable,
}

/// Replace every string nested in `message` with a marker token.
#[must_use]
pub fn mark_for_replacement(message: Value) -> Marked {
    mark_with_rng(message, &mut rand::rng())
}

/// [`mark_for_replacement`] with an explicit random source.
pub fn mark_with_rng<R: Rng>(mut message: Value, rng: &mut R) -> Marked {
    let mut markers = MarkerTable::new();
    reserve_key_tokens(&message, &mut markers.reserved);
    mark_children(&mut message, &mut markers, rng);
    Marked { message, markers }
}

/// Collect the ids of marker-like tokens appearing in any object key.
fn reserve_key_tokens(value: &Value, reserved: &mut HashSet<u64>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let mut rest = key.as_str();
                while let Some(start) = rest.find("{%") {
                    let candidate = &rest[start + 2..];
                    if let Some((id, len)) = parse_token(candidate) {
                        reserved.insert(id);
                        rest = &candidate[len..];
                    } else {
                        rest = candidate;
                    }
                }
                reserve_key_tokens(child, reserved);
            }
        }
        Value::Array(items) => {
            for child in items {
                reserve_key_tokens(child, reserved);
            }
        }
        _ => {}
    }
}

/// Parse `<digits>%}` at the start of `candidate` (the text after `{%`).
///
/// Returns the id and the number of bytes consumed.
fn parse_token(candidate: &str) -> Option<(u64, usize)> {
    let digits = candidate.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !candidate[digits..].starts_with("%}") {
        return None;
    }
    let id = candidate[..digits].parse::<u64>().ok()?;
    Some((id, digits + 2))
}

fn mark_children<R: Rng>(value: &mut Value, markers: &mut MarkerTable, rng: &mut R) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                mark_child(child, markers, rng);
            }
        }
        Value::Array(items) => {
            for child in items {
                mark_child(child, markers, rng);
            }
        }
        _ => {}
    }
}

fn mark_child<R: Rng>(child: &mut Value, markers: &mut MarkerTable, rng: &mut R) {
    if let Value::String(text) = child {
        let original = std::mem::take(text);
        *text = markers.insert(original, rng);
    } else {
        mark_children(child, markers, rng);
    }
}

/// Replace every marker token in `text` with its original string.
///
/// The scan runs once from left to right and never looks at substituted
/// text again, so originals that happen to contain marker-like sequences
/// come through untouched. Tokens not in the table are kept as they are.
#[must_use]
pub fn replace_markers(text: &str, markers: &MarkerTable) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{%") {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 2..];

        let replaced = parse_token(candidate)
            .and_then(|(id, len)| markers.get(id).map(|original| (original, len)));

        if let Some((original, len)) = replaced {
            out.push_str(original);
            rest = &candidate[len..];
        } else {
            out.push_str("{%");
            rest = candidate;
        }
    }

    out.push_str(rest);
    out
}

/// Pretty-print `value` with nested strings shown verbatim.
///
/// # Errors
///
/// Returns a serialization error if the value cannot be printed.
pub fn render_readable(value: Value) -> Result<String, serde_json::Error> {
    let Marked { message, markers } = mark_for_replacement(value);
    let pretty = to_pretty_string(&message)?;
    Ok(replace_markers(&pretty, &markers))
}
