//! Conversation log and context construction
//!
//! The log is append-only. The only mutation allowed on an existing entry
//! is setting its `forget` flag, which hides it from every later context
//! without removing it from what the UI shows. The assistant turn that is
//! currently streaming is the one exception: its content grows until the
//! turn is finalized.

use cx_protocol::{ChatMessage, Role};

/// One role-tagged message in the conversation log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Excluded from outbound context when set
    pub forget: bool,
}

impl Turn {
    /// Create a turn; `forget` always starts cleared
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            forget: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Wire representation (drops the `forget` flag)
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}

/// Ordered conversation log
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its index
    pub fn push(&mut self, turn: Turn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// All turns, forgotten ones included
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Turn> {
        self.turns.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Index of the most recent user turn
    pub fn last_user_index(&self) -> Option<usize> {
        self.turns.iter().rposition(|t| t.role == Role::User)
    }

    /// Flag a turn so it is never sent as context again
    ///
    /// Returns false if the index is out of range.
    pub fn forget(&mut self, index: usize) -> bool {
        match self.turns.get_mut(index) {
            Some(turn) => {
                turn.forget = true;
                true
            }
            None => false,
        }
    }

    /// Flag the most recent user turn; returns its index
    pub fn forget_last_user(&mut self) -> Option<usize> {
        let index = self.last_user_index()?;
        self.forget(index);
        Some(index)
    }

    /// Turns eligible to be sent as context, in log order
    pub fn context(&self) -> impl Iterator<Item = &Turn> {
        self.turns
            .iter()
            .enumerate()
            .filter(|(index, turn)| is_sendable(*index, turn))
            .map(|(_, turn)| turn)
    }

    /// Context for an outgoing request: eligible prior turns followed by
    /// `new_turn`, if any
    pub fn build_context(&self, new_turn: Option<&Turn>) -> Vec<ChatMessage> {
        self.context()
            .chain(new_turn)
            .map(Turn::to_message)
            .collect()
    }
}

/// A leading empty assistant entry is a placeholder left by a greeting that
/// never produced text; sending it would give the backend a degenerate first
/// message.
fn is_sendable(index: usize, turn: &Turn) -> bool {
    if turn.forget {
        return false;
    }
    !(index == 0 && turn.role == Role::Assistant && turn.content.is_empty())
}
