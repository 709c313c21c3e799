//! Application state and key handling.
//!
//! [`App`] wraps a [`Session`] with the state that only matters on screen:
//! focus, cursors, scroll position and the add-tab popup. Every key maps to
//! at most one session command; errors from those commands end up in the
//! session's notices, so key handling never fails.

use std::collections::HashMap;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use wsprobe_core::session::{SendOutcome, Session};
use wsprobe_core::store::KeyValueStore;
use wsprobe_core::tabs::EditorRole;
use wsprobe_core::transport::{ConnectionId, Connector, TransportEvent};

use crate::editor::EditBuffer;

/// Lines moved by `PgUp`/`PgDn` in the output view.
const PAGE_LINES: usize = 10;

/// Which input receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// The address bar.
    Address,
    /// The active buffer (default).
    Editor,
}

/// State of the add-tab popup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddTabPopup {
    /// Name typed so far.
    pub name: String,
    /// Previously saved tab names.
    pub suggestions: Vec<String>,
    /// Highlighted suggestion, if any.
    pub selected: Option<usize>,
}

impl AddTabPopup {
    /// Name the popup would create a tab with.
    #[must_use]
    pub fn chosen_name(&self) -> &str {
        self.selected
            .and_then(|i| self.suggestions.get(i))
            .map_or(self.name.as_str(), String::as_str)
    }
}

/// Main application state.
pub struct App<S: KeyValueStore, C: Connector> {
    /// The tester session.
    pub session: Session<S, C>,
    /// Which input is focused.
    pub focus: Focus,
    /// Open add-tab popup.
    pub add_tab: Option<AddTabPopup>,
    /// Cursor (byte offset) in the address bar.
    pub address_cursor: usize,
    /// Output view scroll, in lines up from the bottom.
    pub output_scroll: usize,
    /// Whether the app should quit.
    pub should_quit: bool,
    cursors: HashMap<EditorRole, usize>,
}

impl<S: KeyValueStore, C: Connector> App<S, C> {
    /// Create the app around `session`.
    #[must_use]
    pub fn new(session: Session<S, C>) -> Self {
        let focus = if session.address().is_empty() {
            Focus::Address
        } else {
            Focus::Editor
        };
        Self {
            address_cursor: session.address().len(),
            session,
            focus,
            add_tab: None,
            output_scroll: 0,
            should_quit: false,
            cursors: HashMap::new(),
        }
    }

    /// Cursor (byte offset) in the editor for `role`.
    #[must_use]
    pub fn cursor(&self, role: &EditorRole) -> usize {
        self.cursors.get(role).copied().unwrap_or(0)
    }

    /// Apply an event reported by the transport.
    pub fn apply_transport_event(&mut self, id: ConnectionId, event: TransportEvent) {
        self.session
            .handle_event(id, event, Local::now().fixed_offset());
    }

    // -----------------------------------------------------------------------
    // Key dispatch
    // -----------------------------------------------------------------------

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && matches!(key.code, KeyCode::Char('c' | 'q')) {
            self.should_quit = true;
            return;
        }

        if self.add_tab.is_some() {
            self.handle_add_tab_key(key);
            return;
        }
        if self.session.pending_raw().is_some() {
            self.handle_confirm_key(key);
            return;
        }
        if self.handle_global_key(key, ctrl) {
            return;
        }

        match self.focus {
            Focus::Address => self.handle_address_key(key),
            Focus::Editor => match self.session.view().role() {
                EditorRole::Receiver => self.handle_output_key(key),
                role => self.handle_editor_key(&role, key),
            },
        }
    }

    /// Shortcuts available everywhere. Returns whether `key` was consumed.
    fn handle_global_key(&mut self, key: KeyEvent, ctrl: bool) -> bool {
        let role = self.session.view().role();
        match key.code {
            KeyCode::Char('l') if ctrl => {
                self.focus = Focus::Address;
                self.address_cursor = self.session.address().len();
            }
            KeyCode::Char('s') if ctrl => self.send(),
            KeyCode::Char('n') if ctrl => self.open_add_tab(),
            KeyCode::Char('w') if ctrl => {
                if self.session.save(&role).is_ok() {
                    tracing::info!(editor = ?role, "saved");
                }
            }
            KeyCode::Char('d') if ctrl => {
                if let EditorRole::Tab(id) = role
                    && self.session.delete_tab(&id).is_ok()
                {
                    self.cursors.remove(&EditorRole::Tab(id));
                }
            }
            KeyCode::Char('k') if ctrl => {
                let _ = self.session.commit(&role);
            }
            KeyCode::F(2) => self.connect(),
            KeyCode::F(3) => {
                let _ = self.session.disconnect();
            }
            KeyCode::F(11) => self.session.toggle_fullscreen(),
            KeyCode::Tab => self.session.cycle_view(true),
            KeyCode::BackTab => self.session.cycle_view(false),
            KeyCode::Esc => {
                if !self.session.exit_fullscreen() {
                    if self.focus == Focus::Address {
                        self.focus = Focus::Editor;
                    } else {
                        self.session.dismiss_notices();
                    }
                }
            }
            _ => return false,
        }
        true
    }

    fn handle_address_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Enter {
            self.connect();
            return;
        }

        let mut address = self.session.address().to_string();
        let mut cursor = self.address_cursor;
        let changed = edit_line(&mut address, &mut cursor, key);
        self.address_cursor = cursor;
        if changed {
            self.session.set_address(&address);
        }
    }

    fn handle_editor_key(&mut self, role: &EditorRole, key: KeyEvent) {
        let Ok(text) = self.session.editor(role) else {
            return;
        };
        let mut text = text.to_string();
        let cursor = self.cursors.entry(role.clone()).or_insert(0);

        let mut buf = EditBuffer::new(&mut text, cursor);
        let changed = match key.code {
            KeyCode::Enter => {
                buf.insert('\n');
                true
            }
            KeyCode::Up => {
                buf.up();
                false
            }
            KeyCode::Down => {
                buf.down();
                false
            }
            _ => apply_line_key(&mut buf, key),
        };

        if changed {
            self.store_edit(role, &text);
        }
    }

    fn store_edit(&mut self, role: &EditorRole, text: &str) {
        match role {
            EditorRole::Sender => self.session.set_draft(text),
            EditorRole::Tab(id) => {
                let _ = self.session.edit_tab(id, text);
            }
            EditorRole::Receiver => {}
        }
    }

    /// Handle text pasted into the terminal.
    ///
    /// The whole paste is applied as a single edit. Line breaks are kept in
    /// editors and dropped from single-line inputs.
    pub fn handle_paste(&mut self, pasted: &str) {
        let text = pasted.replace("\r\n", "\n").replace('\r', "\n");
        let single_line = || text.chars().filter(|c| !c.is_control()).collect::<String>();

        if let Some(popup) = self.add_tab.as_mut() {
            popup.selected = None;
            popup.name.push_str(&single_line());
            return;
        }
        if self.session.pending_raw().is_some() {
            return;
        }

        match self.focus {
            Focus::Address => {
                let mut address = self.session.address().to_string();
                EditBuffer::new(&mut address, &mut self.address_cursor).insert_str(&single_line());
                self.session.set_address(&address);
            }
            Focus::Editor => {
                let role = self.session.view().role();
                let Ok(current) = self.session.editor(&role) else {
                    return;
                };
                if role == EditorRole::Receiver {
                    return;
                }
                let mut content = current.to_string();
                let cursor = self.cursors.entry(role.clone()).or_insert(0);
                EditBuffer::new(&mut content, cursor).insert_str(&text);
                self.store_edit(&role, &content);
            }
        }
    }

    fn handle_output_key(&mut self, key: KeyEvent) {
        self.output_scroll = match key.code {
            KeyCode::Up => self.output_scroll.saturating_add(1),
            KeyCode::Down => self.output_scroll.saturating_sub(1),
            KeyCode::PageUp => self.output_scroll.saturating_add(PAGE_LINES),
            KeyCode::PageDown => self.output_scroll.saturating_sub(PAGE_LINES),
            KeyCode::Home => usize::MAX,
            KeyCode::End => 0,
            _ => return,
        };
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => {
                if let Ok(Some(text)) = self.session.send_raw() {
                    tracing::debug!(bytes = text.len(), "raw frame sent");
                    self.output_scroll = 0;
                }
            }
            KeyCode::Char('n' | 'N') | KeyCode::Esc => self.session.cancel_raw(),
            _ => {}
        }
    }

    fn handle_add_tab_key(&mut self, key: KeyEvent) {
        let Some(popup) = self.add_tab.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.add_tab = None,
            KeyCode::Enter => {
                let name = popup.chosen_name().to_string();
                if self.session.add_tab(&name, None).is_ok() {
                    self.add_tab = None;
                    self.focus = Focus::Editor;
                }
            }
            KeyCode::Down if !popup.suggestions.is_empty() => {
                let last = popup.suggestions.len() - 1;
                popup.selected = Some(popup.selected.map_or(0, |i| (i + 1).min(last)));
            }
            KeyCode::Up => {
                popup.selected = popup.selected.and_then(|i| i.checked_sub(1));
            }
            KeyCode::Backspace => {
                popup.selected = None;
                popup.name.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                popup.selected = None;
                popup.name.push(c);
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn connect(&mut self) {
        if self.session.connect().is_ok() {
            self.focus = Focus::Editor;
            self.output_scroll = 0;
        }
    }

    fn send(&mut self) {
        match self.session.send() {
            Ok(SendOutcome::Sent(text)) => {
                tracing::debug!(bytes = text.len(), "frame sent");
                self.output_scroll = 0;
            }
            Ok(SendOutcome::ConfirmRaw { reason }) => {
                tracing::debug!(reason = %reason, "waiting for raw-send confirmation");
            }
            Err(e) => tracing::debug!(error = %e, "send refused"),
        }
    }

    fn open_add_tab(&mut self) {
        let suggestions = self.session.previous_tabs();
        self.add_tab = Some(AddTabPopup {
            suggestions,
            ..AddTabPopup::default()
        });
    }
}

/// Apply a single-line editing key. Returns whether the text changed.
fn apply_line_key(buf: &mut EditBuffer<'_>, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            buf.insert(c);
            true
        }
        KeyCode::Backspace => buf.backspace(),
        KeyCode::Delete => buf.delete(),
        KeyCode::Left => {
            buf.left();
            false
        }
        KeyCode::Right => {
            buf.right();
            false
        }
        KeyCode::Home => {
            buf.home();
            false
        }
        KeyCode::End => {
            buf.end();
            false
        }
        _ => false,
    }
}

fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    let mut buf = EditBuffer::new(text, cursor);
    apply_line_key(&mut buf, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsprobe_core::connection::ConnectionState;
    use wsprobe_core::session::{SessionConfig, View};
    use wsprobe_core::store::MemoryStore;
    use wsprobe_core::tabs;
    use wsprobe_core::transport::recording::RecordingConnector;

    type TestApp = App<MemoryStore, RecordingConnector>;

    fn app() -> (TestApp, RecordingConnector) {
        let connector = RecordingConnector::new();
        let wire = connector.clone();
        let session = Session::new(MemoryStore::new(), connector, SessionConfig::default());
        (App::new(session), wire)
    }

    fn press(app: &mut TestApp, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut TestApp, c: char) {
        app.handle_key_event(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut TestApp, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn connected_app() -> (TestApp, RecordingConnector) {
        let (mut app, wire) = app();
        type_text(&mut app, "ws://echo");
        press(&mut app, KeyCode::Enter);
        app.apply_transport_event(ConnectionId::new(1), TransportEvent::Opened);
        app.session.set_view(View::Input).unwrap();
        (app, wire)
    }

    #[test]
    fn starts_in_address_bar_without_saved_address() {
        let (app, _wire) = app();
        assert_eq!(app.focus, Focus::Address);
    }

    #[test]
    fn typing_an_address_and_enter_connects() {
        let (app, wire) = connected_app();
        assert_eq!(app.session.address(), "ws://echo");
        assert_eq!(app.focus, Focus::Editor);
        assert_eq!(app.session.connection_state(), ConnectionState::Open);
        assert_eq!(wire.ops().len(), 1);
    }

    #[test]
    fn ctrl_s_sends_the_draft() {
        let (mut app, wire) = connected_app();
        type_text(&mut app, "[1,2]");
        ctrl(&mut app, 's');
        assert_eq!(wire.sent(), vec!["[\n    1,\n    2\n]".to_string()]);
    }

    #[test]
    fn raw_send_needs_confirmation() {
        let (mut app, wire) = connected_app();
        type_text(&mut app, "hello");
        ctrl(&mut app, 's');
        assert!(app.session.pending_raw().is_some());

        // Other keys are swallowed while confirming.
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.session.draft(), "hello");

        press(&mut app, KeyCode::Char('y'));
        assert_eq!(wire.sent(), vec!["hello".to_string()]);
        assert!(app.session.pending_raw().is_none());
    }

    #[test]
    fn raw_send_can_be_declined() {
        let (mut app, wire) = connected_app();
        type_text(&mut app, "hello");
        ctrl(&mut app, 's');
        press(&mut app, KeyCode::Esc);
        assert!(wire.sent().is_empty());
        assert!(app.session.pending_raw().is_none());
    }

    #[test]
    fn enter_in_the_draft_inserts_a_newline() {
        let (mut app, _wire) = connected_app();
        type_text(&mut app, "{");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "}");
        assert_eq!(app.session.draft(), "{\n}");
        assert_eq!(app.cursor(&EditorRole::Sender), 3);
    }

    #[test]
    fn add_tab_popup_creates_and_selects_a_tab() {
        let (mut app, _wire) = app();
        app.focus = Focus::Editor;
        ctrl(&mut app, 'n');
        assert!(app.add_tab.is_some());

        type_text(&mut app, "My Tab");
        press(&mut app, KeyCode::Enter);
        assert!(app.add_tab.is_none());

        let id = tabs::sanitize_tab_id("My Tab");
        assert_eq!(app.session.view(), &View::Tab(id.clone()));
        type_text(&mut app, "body");
        assert_eq!(app.session.editor(&EditorRole::Tab(id)).unwrap(), "body");
    }

    #[test]
    fn duplicate_tab_keeps_popup_open() {
        let (mut app, _wire) = app();
        app.session.add_tab("dup", None).unwrap();
        ctrl(&mut app, 'n');
        type_text(&mut app, "dup");
        press(&mut app, KeyCode::Enter);

        assert!(app.add_tab.is_some());
        assert_eq!(
            app.session.notices().error.as_deref(),
            Some("There is already a tab named dup")
        );
    }

    #[test]
    fn add_tab_offers_saved_names() {
        let (mut app, _wire) = app();
        let id = app.session.add_tab("saved", Some("x")).unwrap();
        app.session.save(&EditorRole::Tab(id.clone())).unwrap();
        app.session.delete_tab(&id).unwrap();
        app.session.add_tab("kept", Some("y")).unwrap();
        app.session
            .save(&EditorRole::Tab(tabs::sanitize_tab_id("kept")))
            .unwrap();

        ctrl(&mut app, 'n');
        let popup = app.add_tab.as_ref().unwrap();
        assert_eq!(popup.suggestions, vec!["kept".to_string()]);

        press(&mut app, KeyCode::Down);
        assert_eq!(app.add_tab.as_ref().unwrap().chosen_name(), "kept");
    }

    #[test]
    fn ctrl_d_deletes_only_tabs() {
        let (mut app, _wire) = app();
        app.focus = Focus::Editor;
        app.session.add_tab("t", None).unwrap();
        ctrl(&mut app, 'd');
        assert!(app.session.tabs().is_empty());
        assert_eq!(app.session.view(), &View::Input);

        ctrl(&mut app, 'd');
        assert_eq!(app.session.view(), &View::Input);
    }

    #[test]
    fn output_view_is_read_only_and_scrolls() {
        let (mut app, _wire) = connected_app();
        app.session.set_view(View::Output).unwrap();
        let before = app.session.log().to_string();

        type_text(&mut app, "abc");
        assert_eq!(app.session.log(), before);

        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.output_scroll, 1 + PAGE_LINES);
        press(&mut app, KeyCode::End);
        assert_eq!(app.output_scroll, 0);
    }

    #[test]
    fn esc_leaves_fullscreen_before_dismissing_notices() {
        let (mut app, _wire) = app();
        app.focus = Focus::Editor;
        let _ = app.session.disconnect();
        assert!(app.session.notices().error.is_some());

        app.handle_key_event(KeyEvent::new(KeyCode::F(11), KeyModifiers::NONE));
        assert!(app.session.is_fullscreen());

        press(&mut app, KeyCode::Esc);
        assert!(!app.session.is_fullscreen());
        assert!(app.session.notices().error.is_some());

        press(&mut app, KeyCode::Esc);
        assert!(app.session.notices().error.is_none());
    }

    #[test]
    fn f3_disconnects() {
        let (mut app, wire) = connected_app();
        press(&mut app, KeyCode::F(3));
        assert_eq!(app.session.connection_state(), ConnectionState::Absent);
        assert_eq!(wire.ops().len(), 3);
    }

    #[test]
    fn paste_lands_in_the_draft_as_one_edit() {
        let (mut app, _wire) = connected_app();
        type_text(&mut app, "[]");
        app.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        app.handle_paste("1,\r\n2");

        assert_eq!(app.session.draft(), "[1,\n2]");
        assert_eq!(app.cursor(&EditorRole::Sender), 5);
    }

    #[test]
    fn paste_into_address_drops_line_breaks() {
        let (mut app, _wire) = app();
        app.handle_paste("ws://host\n:9000/ws\n");
        assert_eq!(app.session.address(), "ws://host:9000/ws");
        assert_eq!(app.address_cursor, "ws://host:9000/ws".len());
    }

    #[test]
    fn paste_is_ignored_in_output_and_while_confirming() {
        let (mut app, _wire) = connected_app();
        app.session.set_view(View::Output).unwrap();
        let before = app.session.log().to_string();
        app.handle_paste("noise");
        assert_eq!(app.session.log(), before);

        app.session.set_view(View::Input).unwrap();
        type_text(&mut app, "x");
        ctrl(&mut app, 's');
        app.handle_paste("more");
        assert_eq!(app.session.draft(), "x");
    }

    #[test]
    fn paste_names_a_new_tab() {
        let (mut app, _wire) = app();
        ctrl(&mut app, 'n');
        app.handle_paste("pasted\nname");
        assert_eq!(app.add_tab.as_ref().unwrap().name, "pastedname");
    }

    #[test]
    fn ctrl_q_quits() {
        let (mut app, _wire) = app();
        ctrl(&mut app, 'q');
        assert!(app.should_quit);
    }
}
