//! cx-session: Conversation session engine for the Cindex backend
//!
//! The session client sits between a UI and a WebSocket connection to the
//! language-model backend. It keeps the conversation log, decides which
//! turns are sent as context, queues requests while the socket is down,
//! and turns the backend's streamed frames into [`SessionEvent`]s.

pub mod client;
pub mod connection;
pub mod engine;
pub mod event;
pub mod history;
pub mod queue;
pub mod request;
pub mod turn;

pub use client::SessionClient;
pub use connection::{
    Connector, ReconnectPolicy, Transport, WebSocketConnector, WebSocketTransport,
};
pub use engine::SessionEngine;
pub use event::SessionEvent;
pub use history::{Conversation, Turn};
pub use queue::{OutboundQueue, WorkingMessage};
pub use request::RequestDescriptor;
pub use turn::{TurnMachine, TurnState};
