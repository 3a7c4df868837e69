//! Outbound request queue
//!
//! Requests submitted while the socket is not open wait here until the
//! connection manager flushes them. Whether a new request replaces or joins
//! the waiting ones is chosen per call.

use std::collections::VecDeque;

use cx_protocol::Request;

/// The request currently awaiting or streaming a reply
///
/// Streamed text is not kept here; it accumulates in the assistant entry of
/// the conversation log.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingMessage {
    pub request: Request,
}

impl WorkingMessage {
    pub fn new(request: Request) -> Self {
        Self { request }
    }
}

/// Requests waiting for the connection to open
#[derive(Debug, Clone, Default)]
pub struct OutboundQueue {
    pending: VecDeque<Request>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request
    ///
    /// With `keep_existing` the request is appended. Without it, anything
    /// still waiting is discarded and only this request remains.
    pub fn enqueue(&mut self, request: Request, keep_existing: bool) {
        if !keep_existing {
            if !self.pending.is_empty() {
                tracing::debug!("Dropping {} unsent request(s)", self.pending.len());
            }
            self.pending.clear();
        }
        self.pending.push_back(request);
    }

    /// Put requests back at the head of the queue, keeping their order
    pub fn restore_front(&mut self, requests: Vec<Request>) {
        for request in requests.into_iter().rev() {
            self.pending.push_front(request);
        }
    }

    /// Take every waiting request in FIFO order
    pub fn drain(&mut self) -> VecDeque<Request> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.pending.iter()
    }
}
