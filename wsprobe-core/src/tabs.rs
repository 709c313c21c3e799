//! User-created text buffers and `%%id%%` template substitution.
//!
//! A tab has a display name and an id derived from it that is safe to use
//! as a template placeholder. The outgoing draft may reference any tab as
//! `%%id%%`; before sending, placeholders are replaced with the live tab
//! content, or with content persisted from an earlier run.

use std::fmt;

use crate::store::{KeyValueStore, SAVED_TABS_KEY, StoreError, TAB_CONTENT_PREFIX};

/// Errors from tab registry operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TabError {
    /// Another live tab already has the same id.
    #[error("There is already a tab named {name}")]
    DuplicateTab {
        /// Display name that was requested.
        name: String,
    },

    /// The name sanitizes to an empty id.
    #[error("A tab needs a name")]
    InvalidTabName,

    /// No editor is registered under this name.
    #[error("There is no editor named '{0}'")]
    UnknownEditor(String),
}

/// Identifier of a user tab: only `[A-Za-z0-9_]`, never starting with a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(String);

impl TabId {
    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `%%id%%` placeholder for this tab.
    #[must_use]
    pub fn placeholder(&self) -> String {
        placeholder(&self.0)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn placeholder(id: &str) -> String {
    format!("%%{id}%%")
}

/// Derive a tab id from a display name.
///
/// A leading ASCII digit and every character outside `[A-Za-z0-9_]` become
/// `_`, one underscore per character.
#[must_use]
pub fn sanitize_tab_id(name: &str) -> TabId {
    let id = name
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let leading_digit = i == 0 && c.is_ascii_digit();
            if leading_digit || !(c.is_ascii_alphanumeric() || c == '_') {
                '_'
            } else {
                c
            }
        })
        .collect();
    TabId(id)
}

/// Which editor a command targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EditorRole {
    /// The outgoing message draft.
    Sender,
    /// The read-only log of received messages.
    Receiver,
    /// A user-created tab.
    Tab(TabId),
}

/// A live user tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabBuffer {
    /// Sanitized identifier.
    pub id: TabId,
    /// Name as the user typed it.
    pub display_name: String,
    /// Current text.
    pub content: String,
}

/// Live tabs in creation order.
#[derive(Debug, Default, Clone)]
pub struct TabRegistry {
    tabs: Vec<TabBuffer>,
}

impl TabRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tab with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &TabId) -> bool {
        self.tabs.iter().any(|t| &t.id == id)
    }

    /// Look up a tab.
    #[must_use]
    pub fn get(&self, id: &TabId) -> Option<&TabBuffer> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    /// Look up a tab for editing.
    pub fn get_mut(&mut self, id: &TabId) -> Option<&mut TabBuffer> {
        self.tabs.iter_mut().find(|t| &t.id == id)
    }

    /// Add a tab.
    ///
    /// # Errors
    ///
    /// Returns [`TabError::DuplicateTab`] if the id is taken and
    /// [`TabError::InvalidTabName`] if the id is empty.
    pub fn insert(&mut self, tab: TabBuffer) -> Result<(), TabError> {
        if tab.id.is_empty() {
            return Err(TabError::InvalidTabName);
        }
        if self.contains(&tab.id) {
            return Err(TabError::DuplicateTab {
                name: tab.display_name,
            });
        }
        self.tabs.push(tab);
        Ok(())
    }

    /// Remove a tab, returning it.
    pub fn remove(&mut self, id: &TabId) -> Option<TabBuffer> {
        let index = self.tabs.iter().position(|t| &t.id == id)?;
        Some(self.tabs.remove(index))
    }

    /// Iterate over tabs in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &TabBuffer> {
        self.tabs.iter()
    }

    /// Number of live tabs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Whether there are no live tabs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Store key holding the content of tab `id`.
#[must_use]
pub fn tab_content_key(id: &str) -> String {
    format!("{TAB_CONTENT_PREFIX}{id}")
}

fn read_tab_list<S: KeyValueStore + ?Sized>(store: &S) -> Vec<String> {
    store
        .get(SAVED_TABS_KEY)
        .map(|list| {
            list.split(',')
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Names in the known-tabs list that still have content.
///
/// The pruned list is written back so stale names do not accumulate.
///
/// # Errors
///
/// Returns [`StoreError`] if the pruned list cannot be written.
pub fn saved_tabs<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<Vec<String>, StoreError> {
    let valid: Vec<String> = read_tab_list(store)
        .into_iter()
        .filter(|name| store.contains(&tab_content_key(name)))
        .collect();
    store.set(SAVED_TABS_KEY, &valid.join(","))?;
    Ok(valid)
}

/// Add `name` to the known-tabs list.
///
/// Already-listed names leave the list untouched. Otherwise the list is
/// rebuilt as `name` followed by every listed name that still has content.
///
/// # Errors
///
/// Returns [`StoreError`] if the list cannot be written.
pub fn record_tab<S: KeyValueStore + ?Sized>(store: &mut S, name: &str) -> Result<(), StoreError> {
    let listed = read_tab_list(store);
    if listed.iter().any(|n| n == name) {
        return Ok(());
    }

    let valid: Vec<String> = std::iter::once(name.to_string())
        .chain(
            listed
                .into_iter()
                .filter(|n| store.contains(&tab_content_key(n))),
        )
        .collect();
    store.set(SAVED_TABS_KEY, &valid.join(","))
}

/// Remove `name` from the known-tabs list.
///
/// # Errors
///
/// Returns [`StoreError`] if the list cannot be written.
pub fn forget_tab<S: KeyValueStore + ?Sized>(store: &mut S, name: &str) -> Result<(), StoreError> {
    let remaining: Vec<String> = read_tab_list(store)
        .into_iter()
        .filter(|n| n != name)
        .collect();
    store.set(SAVED_TABS_KEY, &remaining.join(","))
}

/// Replace `%%id%%` placeholders in `draft`.
///
/// Live tabs are applied first, in creation order. Then every persisted tab
/// whose id is not a live tab is applied with its stored content.
#[must_use]
pub fn substitute_templates<S: KeyValueStore + ?Sized>(
    draft: &str,
    tabs: &TabRegistry,
    store: &S,
) -> String {
    let mut text = draft.to_string();

    for tab in tabs.iter() {
        let token = tab.id.placeholder();
        if text.contains(&token) {
            text = text.replace(&token, &tab.content);
        }
    }

    for key in store.keys() {
        let Some(id) = key.strip_prefix(TAB_CONTENT_PREFIX) else {
            continue;
        };
        if tabs.iter().any(|t| t.id.as_str() == id) {
            continue;
        }
        let token = placeholder(id);
        if text.contains(&token)
            && let Some(content) = store.get(&key)
        {
            text = text.replace(&token, &content);
        }
    }

    text
}
