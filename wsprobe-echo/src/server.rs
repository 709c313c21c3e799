//! Echo server core: the `/ws` route and the per-connection echo loop.
//!
//! Text frames are sent back unchanged, or wrapped as
//! `{"echo": <text>, "received_at": <unix ms>}` when [`EchoOptions::wrap`]
//! is set. Binary frames are echoed as-is.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;

/// Per-server echo behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoOptions {
    /// Wrap each echoed text frame in a JSON envelope.
    pub wrap: bool,
}

/// Build the reply for one received text frame.
#[must_use]
pub fn echo_reply(text: &str, options: EchoOptions, received_at_ms: i64) -> String {
    if options.wrap {
        serde_json::json!({ "echo": text, "received_at": received_at_ms }).to_string()
    } else {
        text.to_string()
    }
}

/// Handles an upgraded WebSocket connection until the client goes away.
pub async fn handle_socket(socket: WebSocket, peer: SocketAddr, options: Arc<EchoOptions>) {
    let (mut sender, mut receiver) = socket.split();
    tracing::info!(%peer, "client connected");

    while let Some(frame) = receiver.next().await {
        let reply = match frame {
            Ok(Message::Text(text)) => {
                let now = chrono::Utc::now().timestamp_millis();
                tracing::debug!(%peer, len = text.len(), "echoing text frame");
                Message::Text(echo_reply(text.as_str(), *options, now).into())
            }
            Ok(Message::Binary(data)) => Message::Binary(data),
            Ok(Message::Close(frame)) => {
                tracing::info!(%peer, ?frame, "received close frame");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "websocket read failed");
                break;
            }
        };

        if let Err(e) = sender.send(reply).await {
            tracing::warn!(%peer, error = %e, "websocket write failed");
            break;
        }
    }

    tracing::info!(%peer, "client disconnected");
}

/// Starts the echo server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
    options: EchoOptions,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(Arc::new(options));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        let service = app.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, service).await {
            tracing::error!(error = %e, "echo server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::ConnectInfo(peer): axum::extract::ConnectInfo<SocketAddr>,
    axum::extract::State(options): axum::extract::State<Arc<EchoOptions>>,
) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite;

    type Client =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn connect(options: EchoOptions) -> (Client, JoinHandle<()>) {
        let (addr, handle) = start_server("127.0.0.1:0", options).await.unwrap();
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap();
        (ws, handle)
    }

    async fn next_text(ws: &mut Client) -> String {
        loop {
            match ws.next().await.unwrap().unwrap() {
                tungstenite::Message::Text(text) => return text.as_str().to_string(),
                tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => {}
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    #[test]
    fn plain_reply_is_the_input() {
        assert_eq!(echo_reply("{\"a\":1}", EchoOptions::default(), 0), "{\"a\":1}");
    }

    #[test]
    fn wrapped_reply_is_an_envelope() {
        let reply = echo_reply("hi", EchoOptions { wrap: true }, 1_700_000_000_000);
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["echo"], "hi");
        assert_eq!(value["received_at"], 1_700_000_000_000_i64);
    }

    #[tokio::test]
    async fn echoes_text_frames_in_order() {
        let (mut ws, handle) = connect(EchoOptions::default()).await;

        ws.send(tungstenite::Message::text("first")).await.unwrap();
        ws.send(tungstenite::Message::text("second")).await.unwrap();

        assert_eq!(next_text(&mut ws).await, "first");
        assert_eq!(next_text(&mut ws).await, "second");
        handle.abort();
    }

    #[tokio::test]
    async fn wraps_text_frames_when_asked() {
        let (mut ws, handle) = connect(EchoOptions { wrap: true }).await;

        ws.send(tungstenite::Message::text("{\"a\":1}")).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();

        assert_eq!(value["echo"], "{\"a\":1}");
        assert!(value["received_at"].as_i64().unwrap() > 0);
        handle.abort();
    }

    #[tokio::test]
    async fn closes_when_the_client_closes() {
        let (mut ws, handle) = connect(EchoOptions::default()).await;

        ws.close(None).await.unwrap();
        let rest: Vec<_> = ws.collect().await;
        assert!(
            rest.iter()
                .all(|m| matches!(m, Ok(tungstenite::Message::Close(_)) | Err(_)))
        );
        handle.abort();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let result = start_server("not-an-address", EchoOptions::default()).await;
        assert!(result.is_err());
    }
}
