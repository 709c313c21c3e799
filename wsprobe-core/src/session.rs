//! Session state and the user-facing commands.
//!
//! A [`Session`] owns everything one tester window works with: the
//! persistence store, the connector, the single connection, the draft, the
//! user tabs, the received-message log and the notices shown to the user.
//! Every user action is a method here; the terminal layer only maps keys to
//! these methods and draws the result.
//!
//! Errors from user actions are returned to the caller *and* placed in the
//! error notice, mirroring a dismissible error banner. Failures to persist
//! background data (history, per-keystroke saves) are only logged.

use chrono::{DateTime, FixedOffset};

use crate::connection::{Affordances, ConnectionState};
use crate::history::{self, MAXIMUM_SAVED_MESSAGES};
use crate::pipeline::{self, Outbound};
use crate::store::{ADDRESS_KEY, INPUT_KEY, KeyValueStore, StoreError};
use crate::tabs::{self, EditorRole, TabBuffer, TabError, TabId, TabRegistry};
use crate::transport::{ConnectionId, Connector, Transport, TransportError, TransportEvent};

/// Frame sent to the server right before a user-initiated close.
pub const DISCONNECT_NOTICE: &str = "\"disconnect\"";

/// Errors surfaced to the user.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Connect was requested with an empty address.
    #[error("No websocket address was supplied.")]
    InvalidAddress,

    /// Connect was requested while a connection is live.
    #[error("Socket already connected - disconnect before trying to connect to a new one")]
    AlreadyConnected,

    /// Disconnect was requested without a live connection.
    #[error("There is not an open socket to disconnect from.")]
    NothingToDisconnect,

    /// Send was requested without an open connection.
    #[error(
        "Data cannot be sent through a socket - there is no active connection. Connect and try again."
    )]
    NotConnected,

    /// The connector refused to start the connection.
    #[error("{0}")]
    TransportConstructionFailed(TransportError),

    /// The transport failed while sending.
    #[error("Could not send data: {0}")]
    TransportRuntimeError(TransportError),

    /// The draft parsed to a value that carries nothing.
    #[error("Data could not be deserialized - nothing was sent to the server")]
    NothingToSend,

    /// A tab operation failed.
    #[error(transparent)]
    Tab(#[from] TabError),

    /// The receiver log cannot be edited or saved.
    #[error("The output log is read-only")]
    ReadOnlyEditor,

    /// A user-requested save failed.
    #[error("Could not save: {0}")]
    Persistence(#[from] StoreError),
}

/// Result of a send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// This text went out.
    Sent(String),
    /// The draft is not JSON; [`Session::send_raw`] sends it anyway.
    ConfirmRaw {
        /// Why the draft was rejected.
        reason: String,
    },
}

/// Which buffer is shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum View {
    /// The outgoing draft.
    Input,
    /// The received-message log.
    Output,
    /// A user tab.
    Tab(TabId),
}

impl View {
    /// Editor shown by this view.
    #[must_use]
    pub fn role(&self) -> EditorRole {
        match self {
            Self::Input => EditorRole::Sender,
            Self::Output => EditorRole::Receiver,
            Self::Tab(id) => EditorRole::Tab(id.clone()),
        }
    }
}

/// Error and warning banners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notices {
    /// Current error, if any.
    pub error: Option<String>,
    /// Current warning, if any.
    pub warning: Option<String>,
}

impl Notices {
    /// Clear both banners.
    pub fn clear(&mut self) {
        self.error = None;
        self.warning = None;
    }

    /// Show `error` and hide the warning.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.warning = None;
    }

    /// Show `warning` and hide the error.
    pub fn set_warning(&mut self, warning: impl Into<String>) {
        self.warning = Some(warning.into());
        self.error = None;
    }

    /// Whether any banner is shown.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.error.is_none() && self.warning.is_none()
    }
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of received messages kept in the store.
    pub max_saved_messages: usize,
    /// chrono format for log timestamps.
    pub timestamp_format: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_saved_messages: MAXIMUM_SAVED_MESSAGES,
            timestamp_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
        }
    }
}

/// The one connection a session may hold.
#[derive(Debug)]
struct Connection<H> {
    id: ConnectionId,
    address: String,
    state: ConnectionState,
    handle: H,
}

/// All state of one tester window.
pub struct Session<S: KeyValueStore, C: Connector> {
    store: S,
    connector: C,
    config: SessionConfig,
    connection: Option<Connection<C::Handle>>,
    next_connection_id: ConnectionId,
    address: String,
    draft: String,
    tabs: TabRegistry,
    log: String,
    view: View,
    fullscreen: bool,
    notices: Notices,
    pending_raw: Option<String>,
}

impl<S: KeyValueStore, C: Connector> Session<S, C> {
    /// Create an empty session.
    pub fn new(store: S, connector: C, config: SessionConfig) -> Self {
        Self {
            store,
            connector,
            config,
            connection: None,
            next_connection_id: ConnectionId::new(1),
            address: String::new(),
            draft: String::new(),
            tabs: TabRegistry::new(),
            log: String::new(),
            view: View::Input,
            fullscreen: false,
            notices: Notices::default(),
            pending_raw: None,
        }
    }

    /// Create a session and load the last address, draft and history.
    pub fn restore(store: S, connector: C, config: SessionConfig) -> Self {
        let mut session = Self::new(store, connector, config);
        session.address = session.store.get(ADDRESS_KEY).unwrap_or_default();
        session.draft = session.store.get(INPUT_KEY).unwrap_or_default();

        let saved = history::read_saved_messages(&session.store);
        tracing::debug!(messages = saved.len(), "restored message history");
        for message in saved {
            let stamp = history::format_timestamp(&message.timestamp, &session.config.timestamp_format);
            session
                .log
                .push_str(&pipeline::format_log_entry(&stamp, &message.body));
        }
        session
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Address in the address bar.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Outgoing draft.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Received-message log.
    #[must_use]
    pub fn log(&self) -> &str {
        &self.log
    }

    /// Live tabs.
    #[must_use]
    pub const fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    /// Active view.
    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    /// Whether the active buffer fills the screen.
    #[must_use]
    pub const fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Error and warning banners.
    #[must_use]
    pub const fn notices(&self) -> &Notices {
        &self.notices
    }

    /// Parse error of a draft awaiting raw-send confirmation.
    #[must_use]
    pub fn pending_raw(&self) -> Option<&str> {
        self.pending_raw.as_deref()
    }

    /// State of the current connection.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Absent, |c| c.state)
    }

    /// Id of the current connection, if any.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection.as_ref().map(|c| c.id)
    }

    /// Address of the current connection, if any.
    #[must_use]
    pub fn connected_address(&self) -> Option<&str> {
        self.connection.as_ref().map(|c| c.address.as_str())
    }

    /// Which connection commands are available.
    #[must_use]
    pub fn affordances(&self) -> Affordances {
        self.connection_state().affordances()
    }

    /// The persistence store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The connector.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Text of an editor.
    ///
    /// # Errors
    ///
    /// Returns [`TabError::UnknownEditor`] for a tab that does not exist.
    pub fn editor(&self, role: &EditorRole) -> Result<&str, SessionError> {
        match role {
            EditorRole::Sender => Ok(&self.draft),
            EditorRole::Receiver => Ok(&self.log),
            EditorRole::Tab(id) => self
                .tabs
                .get(id)
                .map(|t| t.content.as_str())
                .ok_or_else(|| TabError::UnknownEditor(id.to_string()).into()),
        }
    }

    /// Views in tab-strip order.
    #[must_use]
    pub fn views(&self) -> Vec<View> {
        [View::Input, View::Output]
            .into_iter()
            .chain(self.tabs.iter().map(|t| View::Tab(t.id.clone())))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Replace the address and persist it.
    pub fn set_address(&mut self, address: &str) {
        address.clone_into(&mut self.address);
        self.persist_quietly(ADDRESS_KEY, address);
    }

    /// Replace the draft and persist it.
    pub fn set_draft(&mut self, draft: &str) {
        draft.clone_into(&mut self.draft);
        self.persist_quietly(INPUT_KEY, draft);
    }

    /// Replace a tab's content and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`TabError::UnknownEditor`] if the tab does not exist.
    pub fn edit_tab(&mut self, id: &TabId, content: &str) -> Result<(), SessionError> {
        let Some(tab) = self.tabs.get_mut(id) else {
            return self.report(Err(TabError::UnknownEditor(id.to_string()).into()));
        };
        content.clone_into(&mut tab.content);

        self.persist_quietly(&tabs::tab_content_key(id.as_str()), content);
        if let Err(e) = tabs::record_tab(&mut self.store, id.as_str()) {
            tracing::warn!(tab = %id, error = %e, "could not record tab");
        }
        Ok(())
    }

    fn persist_quietly(&mut self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "could not persist value");
        }
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Open a connection to the current address.
    ///
    /// # Errors
    ///
    /// - [`SessionError::AlreadyConnected`] if a connection is live.
    /// - [`SessionError::InvalidAddress`] if the address is empty.
    /// - [`SessionError::TransportConstructionFailed`] if the connector
    ///   refuses the address.
    pub fn connect(&mut self) -> Result<ConnectionId, SessionError> {
        if self.connection_state().is_live() {
            tracing::info!("connect ignored: already connected");
            return self.report(Err(SessionError::AlreadyConnected));
        }

        let address = self.address.trim().to_string();
        if address.is_empty() {
            return self.report(Err(SessionError::InvalidAddress));
        }
        self.notices.clear();

        let id = self.next_connection_id;
        self.next_connection_id = id.next();

        match self.connector.open(&address, id) {
            Ok(handle) => {
                tracing::info!(%id, address = %address, "connecting");
                self.log.clear();
                self.connection = Some(Connection {
                    id,
                    address,
                    state: ConnectionState::Connecting,
                    handle,
                });
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "could not start connection");
                self.connection = None;
                self.report(Err(SessionError::TransportConstructionFailed(e)))
            }
        }
    }

    /// Close the live connection.
    ///
    /// A `"disconnect"` frame is sent first on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NothingToDisconnect`] if no connection is
    /// live. No transport operation happens in that case.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        let Some(mut connection) = self.connection.take_if(|c| c.state.is_live()) else {
            return self.report(Err(SessionError::NothingToDisconnect));
        };

        if let Err(e) = connection.handle.send(DISCONNECT_NOTICE) {
            tracing::debug!(id = %connection.id, error = %e, "disconnect notice not sent");
        }
        connection.handle.close();
        tracing::info!(id = %connection.id, address = %connection.address, "connection closed by user");

        self.notices
            .set_warning("Connection closed. Press F2 to reconnect.");
        Ok(())
    }

    /// Apply an event reported by the transport.
    ///
    /// Events for anything but the current connection are dropped.
    pub fn handle_event(
        &mut self,
        id: ConnectionId,
        event: TransportEvent,
        now: DateTime<FixedOffset>,
    ) {
        let Some(connection) = self.connection.as_mut().filter(|c| c.id == id) else {
            tracing::debug!(%id, ?event, "dropping event for stale connection");
            return;
        };
        connection.state = connection.state.on_event(&event);

        match event {
            TransportEvent::Opened => {
                tracing::info!(%id, "connection open");
                self.notices.clear();
                self.view = View::Output;
            }
            TransportEvent::Message(payload) => self.receive(&payload, now),
            TransportEvent::Error(message) => {
                tracing::warn!(%id, error = %message, "transport error");
                self.notices.error = Some(message);
            }
            TransportEvent::Closed { reason } => {
                tracing::info!(%id, reason = ?reason, "connection closed by peer");
                self.notices.warning = Some(reason.map_or_else(
                    || "Connection closed.".to_string(),
                    |r| format!("Connection closed: {r}"),
                ));
                self.view = View::Output;
            }
        }
    }

    fn receive(&mut self, payload: &str, now: DateTime<FixedOffset>) {
        let body = pipeline::format_inbound(payload);
        let stamp = history::format_timestamp(&now, &self.config.timestamp_format);
        self.log.push_str(&pipeline::format_log_entry(&stamp, &body));

        if let Err(e) =
            history::store_message(&mut self.store, &now, &body, self.config.max_saved_messages)
        {
            tracing::warn!(error = %e, "received message shown but not saved");
        }
    }

    // -----------------------------------------------------------------------
    // Sending
    // -----------------------------------------------------------------------

    fn substituted_draft(&self) -> String {
        tabs::substitute_templates(&self.draft, &self.tabs, &self.store)
    }

    fn open_handle(&mut self) -> Result<&mut C::Handle, SessionError> {
        self.connection
            .as_mut()
            .filter(|c| c.state == ConnectionState::Open)
            .map(|c| &mut c.handle)
            .ok_or(SessionError::NotConnected)
    }

    /// Send the draft as canonical JSON.
    ///
    /// Placeholders are substituted first. A draft that is not JSON is not
    /// sent; instead a raw-send confirmation is queued and returned.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotConnected`] without an open connection.
    /// - [`SessionError::NothingToSend`] if the draft parses to a falsy value.
    /// - [`SessionError::TransportRuntimeError`] if the frame cannot be queued.
    pub fn send(&mut self) -> Result<SendOutcome, SessionError> {
        if self.connection_state() != ConnectionState::Open {
            return self.report(Err(SessionError::NotConnected));
        }

        let text = self.substituted_draft();
        let result = match pipeline::prepare_outbound(&text) {
            Outbound::Json(pretty) => self.transmit(&pretty).map(|()| SendOutcome::Sent(pretty)),
            Outbound::Empty => Err(SessionError::NothingToSend),
            Outbound::NotJson { reason } => {
                tracing::debug!(reason = %reason, "draft is not JSON; asking for confirmation");
                self.pending_raw = Some(reason.clone());
                Ok(SendOutcome::ConfirmRaw { reason })
            }
        };
        self.report(result)
    }

    /// Send the draft verbatim after a confirmation.
    ///
    /// Returns the text sent, or `None` if the draft was empty.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotConnected`] without an open connection.
    /// - [`SessionError::TransportRuntimeError`] if the frame cannot be queued.
    pub fn send_raw(&mut self) -> Result<Option<String>, SessionError> {
        self.pending_raw = None;
        if self.connection_state() != ConnectionState::Open {
            return self.report(Err(SessionError::NotConnected));
        }

        let text = self.substituted_draft();
        if text.is_empty() {
            return Ok(None);
        }
        let result = self.transmit(&text).map(|()| Some(text));
        self.report(result)
    }

    /// Drop a pending raw-send confirmation.
    pub fn cancel_raw(&mut self) {
        self.pending_raw = None;
    }

    fn transmit(&mut self, text: &str) -> Result<(), SessionError> {
        self.open_handle()?
            .send(text)
            .map_err(SessionError::TransportRuntimeError)?;
        tracing::debug!(bytes = text.len(), "frame sent");
        self.view = View::Output;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tabs
    // -----------------------------------------------------------------------

    /// Create a tab and make it the active view.
    ///
    /// The tab starts with `initial` if given and non-empty, otherwise with
    /// whatever was persisted for its id.
    ///
    /// # Errors
    ///
    /// - [`TabError::InvalidTabName`] if the name sanitizes to nothing.
    /// - [`TabError::DuplicateTab`] if a live tab has the same id.
    pub fn add_tab(&mut self, name: &str, initial: Option<&str>) -> Result<TabId, SessionError> {
        let id = tabs::sanitize_tab_id(name);
        let content = match initial {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => self
                .store
                .get(&tabs::tab_content_key(id.as_str()))
                .unwrap_or_default(),
        };

        let tab = TabBuffer {
            id: id.clone(),
            display_name: name.to_string(),
            content,
        };
        if let Err(e) = self.tabs.insert(tab) {
            return self.report(Err(e.into()));
        }

        tracing::info!(tab = %id, name, "tab added");
        self.view = View::Tab(id.clone());
        Ok(id)
    }

    /// Remove a tab along with its persisted content.
    ///
    /// # Errors
    ///
    /// - [`TabError::UnknownEditor`] if the tab does not exist.
    /// - [`SessionError::Persistence`] if the store cannot be updated.
    pub fn delete_tab(&mut self, id: &TabId) -> Result<(), SessionError> {
        if self.tabs.remove(id).is_none() {
            return self.report(Err(TabError::UnknownEditor(id.to_string()).into()));
        }
        if self.view == View::Tab(id.clone()) {
            self.view = View::Input;
        }

        let result = self
            .store
            .remove(&tabs::tab_content_key(id.as_str()))
            .and_then(|()| tabs::forget_tab(&mut self.store, id.as_str()))
            .map_err(SessionError::from);
        tracing::info!(tab = %id, "tab deleted");
        self.report(result)
    }

    /// Persist an editor's content.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ReadOnlyEditor`] for the receiver.
    /// - [`TabError::UnknownEditor`] for a tab that does not exist.
    /// - [`SessionError::Persistence`] if the store rejects the write.
    pub fn save(&mut self, role: &EditorRole) -> Result<(), SessionError> {
        let result = match role {
            EditorRole::Sender => self
                .store
                .set(INPUT_KEY, &self.draft)
                .map_err(SessionError::from),
            EditorRole::Receiver => Err(SessionError::ReadOnlyEditor),
            EditorRole::Tab(id) => match self.tabs.get(id) {
                None => Err(TabError::UnknownEditor(id.to_string()).into()),
                Some(tab) => {
                    let content = tab.content.clone();
                    self.store
                        .set(&tabs::tab_content_key(id.as_str()), &content)
                        .and_then(|()| tabs::record_tab(&mut self.store, id.as_str()))
                        .map_err(SessionError::from)
                }
            },
        };
        self.report(result)
    }

    /// Commit an editor's content for use elsewhere.
    ///
    /// There is nothing to inject scripts into in a terminal, so this only
    /// checks that the editor exists and notes the request in the log file.
    ///
    /// # Errors
    ///
    /// Returns [`TabError::UnknownEditor`] for a tab that does not exist.
    pub fn commit(&mut self, role: &EditorRole) -> Result<(), SessionError> {
        if let Err(e) = self.editor(role) {
            return self.report(Err(e));
        }
        tracing::warn!(editor = ?role, "commit is not supported in the terminal; nothing changed");
        Ok(())
    }

    /// Previously saved tab names, for suggestions when adding a tab.
    pub fn previous_tabs(&mut self) -> Vec<String> {
        tabs::saved_tabs(&mut self.store).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "could not read saved tabs");
            Vec::new()
        })
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    /// Switch to `view`.
    ///
    /// # Errors
    ///
    /// Returns [`TabError::UnknownEditor`] for a tab that does not exist.
    pub fn set_view(&mut self, view: View) -> Result<(), SessionError> {
        if let View::Tab(id) = &view
            && !self.tabs.contains(id)
        {
            return self.report(Err(TabError::UnknownEditor(id.to_string()).into()));
        }
        self.view = view;
        Ok(())
    }

    /// Move to the next (or previous) view in tab-strip order.
    pub fn cycle_view(&mut self, forward: bool) {
        let views = self.views();
        let current = views.iter().position(|v| *v == self.view).unwrap_or(0);
        let len = views.len();
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.view = views[next].clone();
    }

    /// Toggle fullscreen for the active buffer.
    pub const fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
    }

    /// Leave fullscreen. Returns whether it was on.
    pub const fn exit_fullscreen(&mut self) -> bool {
        let was = self.fullscreen;
        self.fullscreen = false;
        was
    }

    /// Hide both banners.
    pub fn dismiss_notices(&mut self) {
        self.notices.clear();
    }

    fn report<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            self.notices.set_error(e.to_string());
        }
        result
    }
}
