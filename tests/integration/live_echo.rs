//! Integration tests against a real WebSocket server.
//!
//! Starts the echo server in-process, then drives a [`Session`] over the
//! tokio-tungstenite connector exactly as the TUI loop does: commands go in
//! through the session, events come back on the connector's channel and are
//! applied in arrival order.

use std::time::Duration;

use tokio::sync::mpsc;

use wsprobe::net::{self, NetConfig, NetEvent, WsConnector};
use wsprobe_core::connection::ConnectionState;
use wsprobe_core::session::{SendOutcome, Session, SessionConfig, View};
use wsprobe_core::store::MemoryStore;
use wsprobe_core::transport::TransportEvent;
use wsprobe_echo::server::{self, EchoOptions};

type LiveSession = Session<MemoryStore, WsConnector>;

const WAIT: Duration = Duration::from_secs(5);

async fn start_echo(options: EchoOptions) -> String {
    let (addr, _handle) = server::start_server("127.0.0.1:0", options).await.unwrap();
    format!("ws://{addr}/ws")
}

fn new_session() -> (LiveSession, mpsc::Receiver<NetEvent>) {
    let (connector, events) = WsConnector::new(NetConfig {
        connect_timeout: Some(WAIT),
        ..NetConfig::default()
    });
    (
        Session::new(MemoryStore::new(), connector, SessionConfig::default()),
        events,
    )
}

/// Apply transport events until `done` holds for the session.
async fn pump_until(
    session: &mut LiveSession,
    events: &mut mpsc::Receiver<NetEvent>,
    done: impl Fn(&LiveSession) -> bool,
) {
    tokio::time::timeout(WAIT, async {
        while !done(session) {
            let NetEvent { connection, event } = events.recv().await.unwrap();
            session.handle_event(connection, event, chrono::Local::now().fixed_offset());
        }
    })
    .await
    .unwrap();
}

async fn connect(session: &mut LiveSession, events: &mut mpsc::Receiver<NetEvent>, url: &str) {
    session.set_address(url);
    session.connect().unwrap();
    assert_eq!(session.connection_state(), ConnectionState::Connecting);
    pump_until(session, events, |s| s.connection_state() == ConnectionState::Open).await;
    assert_eq!(session.view(), &View::Output);
}

#[tokio::test]
async fn connect_send_and_receive_echo() {
    let url = start_echo(EchoOptions::default()).await;
    let (mut session, mut events) = new_session();
    connect(&mut session, &mut events, &url).await;
    assert_eq!(session.connected_address(), Some(url.as_str()));

    session.set_draft(r#"{"greeting":"hello"}"#);
    let outcome = session.send().unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Sent("{\n    \"greeting\": \"hello\"\n}".to_string())
    );

    pump_until(&mut session, &mut events, |s| s.log().contains("hello")).await;
    assert!(session.log().contains("\"greeting\": \"hello\""));
    assert!(!session.store().is_empty());
}

#[tokio::test]
async fn raw_text_round_trips_after_confirmation() {
    let url = start_echo(EchoOptions::default()).await;
    let (mut session, mut events) = new_session();
    connect(&mut session, &mut events, &url).await;

    session.set_draft("ping, not json");
    assert!(matches!(
        session.send().unwrap(),
        SendOutcome::ConfirmRaw { .. }
    ));
    assert_eq!(
        session.send_raw().unwrap(),
        Some("ping, not json".to_string())
    );

    pump_until(&mut session, &mut events, |s| s.log().contains("ping, not json")).await;
}

#[tokio::test]
async fn wrapped_echo_is_logged_as_json() {
    let url = start_echo(EchoOptions { wrap: true }).await;
    let (mut session, mut events) = new_session();
    connect(&mut session, &mut events, &url).await;

    session.set_draft("[1, 2, 3]");
    session.send().unwrap();

    pump_until(&mut session, &mut events, |s| s.log().contains("received_at")).await;
    assert!(session.log().contains("\"echo\":"));
}

#[tokio::test]
async fn disconnect_closes_the_socket() {
    let url = start_echo(EchoOptions::default()).await;
    let (mut session, mut events) = new_session();
    connect(&mut session, &mut events, &url).await;

    let id = session.connection_id().unwrap();
    session.disconnect().unwrap();
    assert_eq!(session.connection_state(), ConnectionState::Absent);
    assert!(session.notices().warning.is_some());

    // The connection task still reports its end; the session ignores it.
    assert!(net::wait_for_close(&mut events, id, WAIT).await);
    session.handle_event(
        id,
        TransportEvent::Closed { reason: None },
        chrono::Local::now().fixed_offset(),
    );
    assert_eq!(session.connection_state(), ConnectionState::Absent);

    // A fresh connection works after the old one is gone.
    connect(&mut session, &mut events, &url).await;
}

#[tokio::test]
async fn unreachable_server_reports_error_and_allows_retry() {
    let (mut session, mut events) = new_session();
    session.set_address("ws://127.0.0.1:1/ws");
    session.connect().unwrap();

    pump_until(&mut session, &mut events, |s| !s.connection_state().is_live()).await;
    assert!(session.notices().error.is_some());

    let url = start_echo(EchoOptions::default()).await;
    connect(&mut session, &mut events, &url).await;
}

#[tokio::test]
async fn malformed_address_is_rejected_immediately() {
    let (mut session, _events) = new_session();
    session.set_address("http://not-a-socket");
    assert!(session.connect().is_err());
    assert!(!session.connection_state().is_live());
    assert!(session.notices().error.is_some());
}
