//! Integration tests for the tester session.
//!
//! Drives a [`Session`] through whole user flows against the recording
//! transport and an in-memory store:
//!
//! 1. Only one connection at a time; disconnect without one is a no-op.
//! 2. Drafts go out in canonical four-space form, or raw after confirmation.
//! 3. Received messages are logged readably and the history stays capped.
//! 4. Tab placeholders are substituted from live and persisted tabs.

use chrono::{DateTime, Duration, FixedOffset};

use wsprobe_core::connection::ConnectionState;
use wsprobe_core::history::{self, MAXIMUM_SAVED_MESSAGES};
use wsprobe_core::session::{SendOutcome, Session, SessionConfig, SessionError, View};
use wsprobe_core::store::{ADDRESS_KEY, KeyValueStore, MemoryStore};
use wsprobe_core::tabs::{self, EditorRole, TabError};
use wsprobe_core::transport::recording::{RecordingConnector, TransportOp};
use wsprobe_core::transport::{ConnectionId, TransportEvent};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type TestSession = Session<MemoryStore, RecordingConnector>;

fn base_time() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-05-04T09:30:00+02:00").unwrap()
}

/// A session with an empty store plus a wire onto its transport log.
fn new_session() -> (TestSession, RecordingConnector) {
    let connector = RecordingConnector::new();
    let wire = connector.clone();
    (
        Session::new(MemoryStore::new(), connector, SessionConfig::default()),
        wire,
    )
}

/// Connect to `address` and deliver the `Opened` event.
fn open(session: &mut TestSession, address: &str) -> ConnectionId {
    session.set_address(address);
    let id = session.connect().unwrap();
    session.handle_event(id, TransportEvent::Opened, base_time());
    assert_eq!(session.connection_state(), ConnectionState::Open);
    id
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

#[test]
fn second_connect_while_live_is_rejected() {
    let (mut session, wire) = new_session();
    let id = open(&mut session, "ws://first.example/ws");

    session.set_address("ws://second.example/ws");
    let err = session.connect().unwrap_err();
    assert!(matches!(err, SessionError::AlreadyConnected));

    assert_eq!(session.connection_state(), ConnectionState::Open);
    assert_eq!(session.connected_address(), Some("ws://first.example/ws"));
    assert_eq!(
        wire.ops(),
        vec![TransportOp::Open {
            address: "ws://first.example/ws".to_string(),
            id
        }]
    );
}

#[test]
fn second_connect_while_connecting_is_rejected() {
    let (mut session, wire) = new_session();
    session.set_address("ws://slow.example");
    session.connect().unwrap();

    assert!(matches!(
        session.connect(),
        Err(SessionError::AlreadyConnected)
    ));
    assert_eq!(wire.ops().len(), 1);
}

#[test]
fn disconnect_without_connection_does_nothing() {
    let (mut session, wire) = new_session();

    let err = session.disconnect().unwrap_err();
    assert!(matches!(err, SessionError::NothingToDisconnect));
    assert_eq!(
        session.notices().error.as_deref(),
        Some("There is not an open socket to disconnect from.")
    );
    assert!(wire.ops().is_empty());
}

#[test]
fn reconnect_after_disconnect_uses_a_fresh_connection() {
    let (mut session, wire) = new_session();
    let first = open(&mut session, "ws://a");
    session.disconnect().unwrap();
    let second = open(&mut session, "ws://a");
    assert_ne!(first, second);

    session.set_draft("{\"n\": 1}");
    session.send().unwrap();

    let ops = wire.ops();
    assert_eq!(
        ops.last(),
        Some(&TransportOp::Send {
            id: second,
            text: "{\n    \"n\": 1\n}".to_string()
        })
    );
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[test]
fn json_draft_is_sent_in_canonical_form() {
    let (mut session, wire) = new_session();
    open(&mut session, "ws://echo");
    session.set_draft("{\"a\":\"hello\\nworld\"}");

    let outcome = session.send().unwrap();
    let expected = "{\n    \"a\": \"hello\\nworld\"\n}".to_string();
    assert_eq!(outcome, SendOutcome::Sent(expected.clone()));
    assert_eq!(wire.sent(), vec![expected]);
    assert_eq!(session.view(), &View::Output);
}

#[test]
fn non_json_draft_waits_for_confirmation() {
    let (mut session, wire) = new_session();
    open(&mut session, "ws://echo");
    session.set_draft("{a: 1}");

    let outcome = session.send().unwrap();
    assert!(matches!(outcome, SendOutcome::ConfirmRaw { .. }));
    assert!(session.pending_raw().is_some());
    assert!(wire.sent().is_empty());

    let sent = session.send_raw().unwrap();
    assert_eq!(sent.as_deref(), Some("{a: 1}"));
    assert_eq!(wire.sent(), vec!["{a: 1}".to_string()]);
    assert!(session.pending_raw().is_none());
}

#[test]
fn send_without_connection_reports_the_error() {
    let (mut session, wire) = new_session();
    session.set_draft("{}");

    assert!(matches!(session.send(), Err(SessionError::NotConnected)));
    assert_eq!(
        session.notices().error.as_deref(),
        Some(
            "Data cannot be sent through a socket - there is no active connection. Connect and try again."
        )
    );
    assert!(matches!(session.send_raw(), Err(SessionError::NotConnected)));
    assert!(wire.sent().is_empty());
}

#[test]
fn placeholders_are_substituted_before_sending() {
    let (mut session, wire) = new_session();
    let id = session.add_tab("instructions", None).unwrap();
    session.edit_tab(&id, "do X").unwrap();

    open(&mut session, "ws://echo");
    session.set_draft("{\"task\": \"%%instructions%%\"}");
    session.send().unwrap();

    assert_eq!(wire.sent(), vec!["{\n    \"task\": \"do X\"\n}".to_string()]);
}

#[test]
fn persisted_tabs_fill_placeholders_without_a_live_tab() {
    let mut store = MemoryStore::new();
    store
        .set(&tabs::tab_content_key("footer"), "signed")
        .unwrap();
    let connector = RecordingConnector::new();
    let wire = connector.clone();
    let mut session = Session::restore(store, connector, SessionConfig::default());

    open(&mut session, "ws://echo");
    session.set_draft("\"%%footer%% %%unknown%%\"");
    session.send().unwrap();

    assert_eq!(wire.sent(), vec!["\"signed %%unknown%%\"".to_string()]);
}

// ---------------------------------------------------------------------------
// Receiving and history
// ---------------------------------------------------------------------------

#[test]
fn received_json_is_rendered_readably() {
    let (mut session, _wire) = new_session();
    let id = open(&mut session, "ws://echo");

    session.handle_event(
        id,
        TransportEvent::Message(r#"{"text":"line one\nline two"}"#.to_string()),
        base_time(),
    );
    assert!(
        session
            .log()
            .contains("{\n    \"text\": \"line one\nline two\"\n}")
    );
}

#[test]
fn received_text_is_logged_verbatim() {
    let (mut session, _wire) = new_session();
    let id = open(&mut session, "ws://echo");
    session.handle_event(id, TransportEvent::Message("pong".to_string()), base_time());

    assert!(session.log().contains("\n\npong\n\n"));
}

#[test]
fn history_keeps_the_newest_messages() {
    let (mut session, _wire) = new_session();
    let id = open(&mut session, "ws://echo");

    for i in 0..20 {
        session.handle_event(
            id,
            TransportEvent::Message(format!("message {i}")),
            base_time() + Duration::seconds(i),
        );
    }

    let saved = history::read_saved_messages(session.store());
    assert_eq!(saved.len(), MAXIMUM_SAVED_MESSAGES);
    let bodies: Vec<String> = saved.into_iter().map(|m| m.body).collect();
    let expected: Vec<String> = (5..20).map(|i| format!("message {i}")).collect();
    assert_eq!(bodies, expected);
}

#[test]
fn restored_session_shows_saved_history() {
    let (mut session, _wire) = new_session();
    let id = open(&mut session, "ws://echo");
    session.handle_event(id, TransportEvent::Message("first".to_string()), base_time());
    session.handle_event(
        id,
        TransportEvent::Message("second".to_string()),
        base_time() + Duration::seconds(1),
    );

    let mut store = MemoryStore::new();
    for key in session.store().keys() {
        let value = session.store().get(&key).unwrap();
        store.set(&key, &value).unwrap();
    }
    let restored = Session::restore(store, RecordingConnector::new(), SessionConfig::default());

    assert_eq!(restored.address(), "ws://echo");
    let log = restored.log();
    let first = log.find("first").unwrap();
    let second = log.find("second").unwrap();
    assert!(first < second);
    assert_eq!(restored.connection_state(), ConnectionState::Absent);
    assert_eq!(
        restored.store().get(ADDRESS_KEY).as_deref(),
        Some("ws://echo")
    );
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[test]
fn tab_names_are_sanitized() {
    let (mut session, _wire) = new_session();
    let id = session.add_tab("My Tab #1", None).unwrap();

    assert!(!id.as_str().is_empty());
    assert!(
        id.as_str()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    );
    assert_eq!(session.tabs().get(&id).unwrap().display_name, "My Tab #1");
}

#[test]
fn names_that_sanitize_alike_collide() {
    let (mut session, _wire) = new_session();
    session.add_tab("a!b", None).unwrap();

    let err = session.add_tab("a?b", None).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Tab(TabError::DuplicateTab { ref name }) if name == "a?b"
    ));
    assert_eq!(
        session.notices().error.as_deref(),
        Some("There is already a tab named a?b")
    );
    assert_eq!(session.tabs().len(), 1);
}

#[test]
fn unknown_editor_is_reported_by_name() {
    let (session, _wire) = new_session();
    let ghost = EditorRole::Tab(tabs::sanitize_tab_id("ghost"));
    let err = session.editor(&ghost).unwrap_err();
    assert_eq!(err.to_string(), "There is no editor named 'ghost'");
}

#[test]
fn saved_tabs_are_suggested_in_a_later_session() {
    let (mut session, _wire) = new_session();
    let id = session.add_tab("payload", Some("{\"x\": 1}")).unwrap();
    session.save(&EditorRole::Tab(id)).unwrap();

    let mut store = MemoryStore::new();
    for key in session.store().keys() {
        let value = session.store().get(&key).unwrap();
        store.set(&key, &value).unwrap();
    }
    let mut later = Session::restore(store, RecordingConnector::new(), SessionConfig::default());
    assert_eq!(later.previous_tabs(), vec!["payload".to_string()]);

    let id = later.add_tab("payload", None).unwrap();
    assert_eq!(
        later.editor(&EditorRole::Tab(id)).unwrap(),
        "{\"x\": 1}"
    );
}
