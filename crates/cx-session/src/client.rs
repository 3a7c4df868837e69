//! Session client handle
//!
//! [`SessionClient`] is what a UI holds. It validates requests on the
//! caller's side and forwards everything else to the driver task, which
//! reports back through the [`SessionEvent`] receiver.

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use cx_core::config::ClientConfig;
use cx_core::{ClientError, ConnectionState};
use cx_protocol::Lang;

use crate::connection::{
    Command, ConnectionManager, Connector, ReconnectPolicy, WebSocketConnector,
};
use crate::engine::SessionEngine;
use crate::event::SessionEvent;
use crate::history::Turn;
use crate::request::RequestDescriptor;

/// Handle to a running session
///
/// Dropping the handle or calling [`dispose`](Self::dispose) stops the
/// driver, closes the socket and cancels any pending reconnect.
#[derive(Debug)]
pub struct SessionClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
}

impl SessionClient {
    /// Connect to the backend named in `config` over WebSocket
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: &ClientConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_connector(config, WebSocketConnector::from_config(config))
    }

    /// Run a session over a custom connector
    pub fn with_connector<C: Connector>(
        config: &ClientConfig,
        connector: C,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let cancel = CancellationToken::new();

        let manager = ConnectionManager::new(
            connector,
            SessionEngine::from_config(config),
            ReconnectPolicy::from_config(config),
            command_rx,
            event_tx,
            state_tx,
            cancel.clone(),
        );
        tokio::spawn(manager.run());

        let client = Self {
            commands: command_tx,
            state: state_rx,
            cancel,
        };
        (client, event_rx)
    }

    /// Submit a request
    ///
    /// Chat requests without text fail here; blank text is accepted and
    /// ignored. Everything else is delivered once the socket is open.
    pub fn submit(&self, descriptor: RequestDescriptor) -> Result<(), ClientError> {
        descriptor.validate()?;
        self.send(Command::Submit(descriptor))
    }

    /// Open a connection if none is open or opening
    pub fn start(&self) -> Result<(), ClientError> {
        self.send(Command::Start)
    }

    /// Language stamped on subsequent requests
    pub fn set_lang(&self, lang: Lang) -> Result<(), ClientError> {
        self.send(Command::SetLang(lang))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn connected(&self) -> bool {
        self.state().is_open()
    }

    /// Wait until the socket is open
    pub async fn wait_until_connected(&self) -> Result<(), ClientError> {
        let mut state = self.state.clone();
        state
            .wait_for(ConnectionState::is_open)
            .await
            .map(|_| ())
            .map_err(|_| ClientError::Disposed)
    }

    /// Snapshot of the conversation log, including forgotten turns
    pub async fn history(&self) -> Result<Vec<Turn>, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::History(reply))?;
        rx.await.map_err(|_| ClientError::Disposed)
    }

    /// Stop the session
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            tracing::debug!("Disposing session client");
            self.cancel.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn send(&self, command: Command) -> Result<(), ClientError> {
        if self.cancel.is_cancelled() {
            return Err(ClientError::Disposed);
        }
        self.commands
            .send(command)
            .map_err(|_| ClientError::Disposed)
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
