//! Connection management
//!
//! The manager owns one socket at a time, reconnects after a fixed delay
//! when it closes, and feeds frames and lifecycle changes into the
//! [`SessionEngine`](crate::engine::SessionEngine).

mod manager;
mod reconnect;
mod transport;

pub(crate) use manager::{Command, ConnectionManager};
pub use reconnect::ReconnectPolicy;
pub use transport::{Connector, Transport, WebSocketConnector, WebSocketTransport};
