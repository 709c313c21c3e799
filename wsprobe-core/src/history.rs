//! Bounded history of received messages.
//!
//! Each received message is stored under `saved_message:<timestamp>`, where
//! the timestamp is RFC 3339 with nanosecond precision. Reading parses the
//! timestamps back and sorts oldest first. After every insertion the oldest
//! entries are evicted until at most `cap` remain, so the store never holds
//! more than `cap` messages. When the store runs out of space the oldest
//! messages give way to the newest.

use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};

use crate::store::{KeyValueStore, SAVED_MESSAGE_PREFIX, StoreError};

/// Default number of received messages kept in the store.
pub const MAXIMUM_SAVED_MESSAGES: usize = 15;

/// A received message read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedMessage {
    /// When the message arrived.
    pub timestamp: DateTime<FixedOffset>,
    /// The formatted body as it was shown in the log.
    pub body: String,
    /// The store key the message lives under.
    pub key: String,
}

/// Store key for a message received at `timestamp`.
#[must_use]
pub fn message_key(timestamp: &DateTime<FixedOffset>) -> String {
    format!(
        "{SAVED_MESSAGE_PREFIX}{}",
        timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

/// Read every saved message, oldest first.
///
/// Keys under the history prefix whose timestamp does not parse are
/// skipped.
pub fn read_saved_messages<S: KeyValueStore + ?Sized>(store: &S) -> Vec<SavedMessage> {
    let mut messages: Vec<SavedMessage> = store
        .keys()
        .into_iter()
        .filter_map(|key| {
            let raw = key.strip_prefix(SAVED_MESSAGE_PREFIX)?;
            let timestamp = match DateTime::parse_from_rfc3339(raw) {
                Ok(ts) => ts,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping history entry with bad timestamp");
                    return None;
                }
            };
            let body = store.get(&key)?;
            Some(SavedMessage {
                timestamp,
                body,
                key,
            })
        })
        .collect();

    messages.sort_by_key(|m| m.timestamp);
    messages
}

/// Store a message received at `timestamp`, keeping at most `cap` entries.
///
/// The oldest entries are evicted first to make room under the cap. If the
/// store then rejects the write for lack of space, older entries keep being
/// evicted until the new message fits or nothing older is left.
///
/// # Errors
///
/// Returns [`StoreError`] if the message cannot be written even with every
/// older entry gone, or if an old entry cannot be removed.
pub fn store_message<S: KeyValueStore + ?Sized>(
    store: &mut S,
    timestamp: &DateTime<FixedOffset>,
    body: &str,
    cap: usize,
) -> Result<(), StoreError> {
    let key = message_key(timestamp);
    let mut saved: VecDeque<SavedMessage> = read_saved_messages(store)
        .into_iter()
        .filter(|m| m.key != key)
        .collect();

    while saved.len() >= cap {
        let Some(old) = saved.pop_front() else { break };
        evict(store, &old)?;
    }
    if cap == 0 {
        return store.remove(&key);
    }

    loop {
        match store.set(&key, body) {
            Ok(()) => return Ok(()),
            Err(e @ StoreError::QuotaExceeded { .. }) => {
                let Some(old) = saved.pop_front() else {
                    return Err(e);
                };
                tracing::debug!(error = %e, "store full; making room for new message");
                evict(store, &old)?;
            }
            Err(e) => return Err(e),
        }
    }
}

fn evict<S: KeyValueStore + ?Sized>(store: &mut S, old: &SavedMessage) -> Result<(), StoreError> {
    tracing::debug!(key = %old.key, "evicting saved message");
    store.remove(&old.key)
}

/// Render `timestamp` in local time with a chrono format string.
///
/// An invalid format string falls back to RFC 3339 instead of panicking.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<FixedOffset>, format: &str) -> String {
    use std::fmt::Write;

    let local = timestamp.with_timezone(&Local);
    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_err() {
        return local.to_rfc3339_opts(SecondsFormat::Secs, false);
    }
    out
}
