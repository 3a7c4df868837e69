//! Connection driver task
//!
//! Runs the single task that owns the [`SessionEngine`] and the socket.
//! Handle commands, inbound frames, connect completions and reconnect
//! timers are all processed here, one at a time.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use cx_core::{ConnectionError, ConnectionState};
use cx_protocol::{decode_frame, encode_request, Lang};

use super::reconnect::ReconnectPolicy;
use super::transport::{Connector, Transport};
use crate::engine::SessionEngine;
use crate::event::SessionEvent;
use crate::history::Turn;
use crate::request::RequestDescriptor;

type ConnectFuture<T> = BoxFuture<'static, Result<T, ConnectionError>>;

/// Requests from the client handle to the driver
#[derive(Debug)]
pub(crate) enum Command {
    /// Open a connection unless one is open or opening
    Start,
    /// Submit an already validated request
    Submit(RequestDescriptor),
    SetLang(Lang),
    /// Snapshot of the conversation log
    History(oneshot::Sender<Vec<Turn>>),
}

/// Owns the socket and the session state
pub(crate) struct ConnectionManager<C: Connector> {
    connector: Arc<C>,
    engine: SessionEngine,
    policy: ReconnectPolicy,
    transport: Option<C::Transport>,
    connecting: Option<ConnectFuture<C::Transport>>,
    retry_at: Option<Instant>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl<C: Connector> ConnectionManager<C> {
    pub(crate) fn new(
        connector: C,
        engine: SessionEngine,
        policy: ReconnectPolicy,
        commands: mpsc::UnboundedReceiver<Command>,
        events: mpsc::UnboundedSender<SessionEvent>,
        state: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            engine,
            policy,
            transport: None,
            connecting: None,
            retry_at: None,
            commands,
            events,
            state,
            cancel,
        }
    }

    /// Drive the session until cancelled or every handle is dropped
    pub(crate) async fn run(mut self) {
        self.start();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Session cancelled");
                    break;
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        tracing::debug!("All session handles dropped");
                        break;
                    }
                },

                result = pending_connect(&mut self.connecting) => {
                    self.connecting = None;
                    match result {
                        Ok(transport) => self.on_open(transport).await,
                        Err(e) => {
                            tracing::warn!("Connection attempt failed: {}", e);
                            self.on_close().await;
                        }
                    }
                }

                frame = next_frame(&mut self.transport) => match frame {
                    Some(Ok(text)) => self.on_text(&text),
                    Some(Err(e)) => {
                        tracing::warn!("Socket error: {}", e);
                        self.on_close().await;
                    }
                    None => {
                        tracing::info!("Socket closed by server");
                        self.on_close().await;
                    }
                },

                _ = retry_elapsed(self.retry_at) => {
                    self.retry_at = None;
                    self.start();
                }
            }
        }

        self.shutdown().await;
    }

    /// Begin a connection attempt unless the socket is open or opening
    fn start(&mut self) {
        if self.transport.is_some() || self.connecting.is_some() {
            tracing::trace!("Connection already open or opening");
            return;
        }

        self.retry_at = None;
        self.engine.on_connecting();
        self.publish();

        let connector = Arc::clone(&self.connector);
        self.connecting = Some(Box::pin(async move { connector.connect().await }));
    }

    async fn on_open(&mut self, transport: C::Transport) {
        tracing::info!(
            attempts = self.policy.attempts(),
            "Connected to session backend"
        );
        self.policy.reset();
        self.transport = Some(transport);
        self.engine.on_open();
        self.flush().await;
        self.publish();
    }

    /// Close path shared by failed attempts, server closes and socket errors
    async fn on_close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.engine.on_close();
        self.publish();

        if self.cancel.is_cancelled() {
            return;
        }
        let delay = self.policy.next_delay();
        tracing::info!(
            attempt = self.policy.attempts(),
            "Reconnecting in {:?}",
            delay
        );
        self.retry_at = Some(Instant::now() + delay);
    }

    fn on_text(&mut self, text: &str) {
        match decode_frame(text) {
            Ok(frame) => self.engine.handle_frame(frame),
            Err(e) => tracing::warn!("Dropping malformed frame: {}", e),
        }
        self.publish();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Submit(descriptor) => {
                if let Err(e) = self.engine.submit(descriptor) {
                    tracing::warn!("Rejected request: {}", e);
                }
                self.flush().await;
                self.publish();
            }
            Command::SetLang(lang) => self.engine.set_lang(lang),
            Command::History(reply) => {
                let _ = reply.send(self.engine.conversation().turns().to_vec());
            }
        }
    }

    /// Write everything the engine queued for the socket
    async fn flush(&mut self) {
        let outbox = self.engine.take_outbox();
        if outbox.is_empty() {
            return;
        }

        let Some(transport) = self.transport.as_mut() else {
            self.engine.on_send_failed(outbox);
            return;
        };

        for (index, request) in outbox.iter().enumerate() {
            let text = match encode_request(request) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(action = %request.action, "Failed to encode request: {}", e);
                    continue;
                }
            };

            tracing::debug!(action = %request.action, "Sending request");
            if let Err(e) = transport.send(text).await {
                tracing::warn!("Failed to send request: {}", e);
                self.engine.on_send_failed(outbox[index..].to_vec());
                self.on_close().await;
                return;
            }
        }
    }

    /// Forward engine notifications and the connection state to the handle
    fn publish(&mut self) {
        for event in self.engine.drain_events() {
            if self.events.send(event).is_err() {
                tracing::trace!("Event receiver dropped");
            }
        }
        self.state.send_replace(self.engine.connection_state());
    }

    async fn shutdown(&mut self) {
        self.connecting = None;
        self.retry_at = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

async fn pending_connect<T>(
    connecting: &mut Option<ConnectFuture<T>>,
) -> Result<T, ConnectionError> {
    match connecting {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_frame<T: Transport>(
    transport: &mut Option<T>,
) -> Option<Result<String, ConnectionError>> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

async fn retry_elapsed(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
