//! `wsprobe`: terminal-native WebSocket testing tool.
//!
//! Launches the TUI. Configuration via CLI flags, environment variables, or
//! config file (`~/.config/wsprobe/config.toml`).
//!
//! ```bash
//! # Start with the last used address and draft
//! cargo run --bin wsprobe
//!
//! # Start with a given address
//! cargo run --bin wsprobe -- --address ws://127.0.0.1:9000/ws
//!
//! # Or via environment variables
//! WSPROBE_ADDRESS=ws://127.0.0.1:9000/ws WSPROBE_LOG=debug cargo run
//! ```

use std::io;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use wsprobe::app::App;
use wsprobe::config::{CliArgs, ClientConfig};
use wsprobe::net::{self, NetEvent, WsConnector};
use wsprobe::ui;
use wsprobe_core::session::Session;
use wsprobe_core::store::{FileStore, KeyValueStore, MemoryStore};
use wsprobe_core::transport::{ConnectionId, Connector};

/// How long a connection closed on quit may take to send its last frames.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file, never stdout, since ratatui owns the terminal.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("wsprobe starting");

    let (connector, mut events) = WsConnector::new(config.to_net_config());
    let quota = Some(config.quota_bytes);
    let result = match &config.store_path {
        Some(path) => {
            let store = FileStore::open(path, quota).map_err(io::Error::other)?;
            tracing::info!(path = %store.path().display(), "using persistence file");
            run(store, connector, &mut events, &config)
        }
        None => {
            tracing::warn!("no data directory; nothing will be persisted");
            let store = MemoryStore::with_quota(config.quota_bytes);
            run(store, connector, &mut events, &config)
        }
    };

    // Let a connection closed on quit flush its notice and close frame.
    if let Ok(Some(id)) = result
        && !net::wait_for_close(&mut events, id, CLOSE_GRACE).await
    {
        tracing::warn!(%id, "connection did not finish closing before exit");
    }

    tracing::info!("wsprobe exiting");
    result.map(|_| ())
}

/// Build the session, set up the terminal, run the app and restore the terminal.
///
/// Returns the connection that was closed on quit, if any.
fn run<S: KeyValueStore, C: Connector>(
    store: S,
    connector: C,
    events: &mut mpsc::Receiver<NetEvent>,
    config: &ClientConfig,
) -> io::Result<Option<ConnectionId>> {
    let mut session = Session::restore(store, connector, config.to_session_config());
    if let Some(address) = &config.address {
        session.set_address(address);
    }
    let mut app = App::new(session);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, events, config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("wsprobe.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
///
/// Each tick draws, applies every pending transport event in arrival order,
/// then waits up to the poll timeout for one terminal event.
fn run_app<S: KeyValueStore, C: Connector>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S, C>,
    events: &mut mpsc::Receiver<NetEvent>,
    config: &ClientConfig,
) -> io::Result<Option<ConnectionId>> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        while let Ok(NetEvent { connection, event }) = events.try_recv() {
            app.apply_transport_event(connection, event);
        }

        if event::poll(config.poll_timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key_event(key),
                Event::Paste(text) => app.handle_paste(&text),
                _ => {}
            }
        }

        if app.should_quit {
            let closing = app
                .session
                .connection_id()
                .filter(|_| app.session.connection_state().is_live());
            if closing.is_some() {
                let _ = app.session.disconnect();
            }
            return Ok(closing);
        }
    }
}
