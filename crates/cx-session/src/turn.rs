//! Turn state machine
//!
//! Tracks whether the backend is streaming a reply and which log entry the
//! streamed text belongs to.

use crate::history::{Conversation, Turn};

/// Whether a backend reply is outstanding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnState {
    #[default]
    Idle,
    Responding,
}

/// Drives one request/response turn against the conversation log
#[derive(Debug, Default)]
pub struct TurnMachine {
    state: TurnState,
    /// Log index of the assistant turn receiving deltas
    assistant: Option<usize>,
}

impl TurnMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_responding(&self) -> bool {
        self.state == TurnState::Responding
    }

    /// Index of the assistant turn currently streaming
    pub fn assistant_index(&self) -> Option<usize> {
        self.assistant
    }

    /// A request went out; wait for its reply
    pub fn begin(&mut self) {
        self.state = TurnState::Responding;
        self.assistant = None;
    }

    /// Start a fresh assistant turn in the log
    pub fn start_stream(&mut self, log: &mut Conversation) -> usize {
        if let Some(previous) = self.assistant.and_then(|i| log.get_mut(i)) {
            trim_in_place(&mut previous.content);
        }
        let index = log.push(Turn::assistant(""));
        self.assistant = Some(index);
        index
    }

    /// Append streamed text; returns false when no stream has started
    pub fn append(&mut self, log: &mut Conversation, text: &str) -> bool {
        match self.assistant.and_then(|i| log.get_mut(i)) {
            Some(turn) => {
                turn.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Finalize the turn and return to `Idle`
    ///
    /// The assistant turn is trimmed and inherits `forget` from the most
    /// recent user turn. Returns the finalized turn, or `None` if the backend
    /// never started streaming.
    pub fn finish(&mut self, log: &mut Conversation) -> Option<Turn> {
        self.state = TurnState::Idle;
        let index = self.assistant.take()?;
        let inherit = log
            .last_user_index()
            .and_then(|i| log.get(i))
            .is_some_and(|user| user.forget);

        let turn = log.get_mut(index)?;
        trim_in_place(&mut turn.content);
        if inherit {
            turn.forget = true;
        }
        Some(turn.clone())
    }

    /// Drop the partially streamed assistant turn after the connection was
    /// lost; it is flagged `forget` and the machine keeps waiting for the
    /// retried request.
    pub fn abandon(&mut self, log: &mut Conversation) -> Option<Turn> {
        let index = self.assistant.take()?;
        let turn = log.get_mut(index)?;
        turn.forget = true;
        Some(turn.clone())
    }
}

fn trim_in_place(content: &mut String) {
    let trimmed = content.trim();
    if trimmed.len() != content.len() {
        *content = trimmed.to_string();
    }
}
