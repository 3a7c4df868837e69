//! Notifications emitted to the UI

use cx_protocol::{Directive, InboundFrame};
use serde_json::{Map, Value};

use crate::history::Turn;

/// Events produced by the session client, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Socket opened and queued requests were flushed
    Connected,
    /// Socket closed or a connection attempt failed
    Disconnected,
    /// Backend began streaming an assistant turn
    StreamStarted { action: Option<String> },
    /// Streamed text appended to the current assistant turn
    Delta { text: String },
    /// A turn ended, either by `responseEnd` or by a new submission
    ///
    /// `turn` is `None` when the backend never started streaming.
    TurnFinished {
        turn: Option<Turn>,
        interrupted: bool,
    },
    /// Stream end carried a completion tag
    ActionFinished {
        action: String,
        payload: Map<String, Value>,
    },
    /// Directive the UI should act on right away
    Directive(Directive),
    /// Frame with neither stream content nor a directive
    Message(InboundFrame),
    /// Connection dropped mid-stream; the partial turn was flagged `forget`
    /// and the request will be retried on reconnect
    TurnAbandoned { partial: Turn },
}
