//! Request types for the Cindex protocol
//!
//! This module defines the outbound half of the protocol: the single JSON
//! frame a client sends to start a backend turn. Inbound frames live in
//! `frame.rs`.
//!
//! # Message Flow
//!
//! Typical sequence for one turn:
//!
//! 1. Client sends a `Request` (`action` + conversation context)
//! 2. Backend optionally sends a directive frame (`responseAction`)
//! 3. Backend sends `responseStart`, a run of `response` deltas, then `responseEnd`
//! 4. Sending a new `Request` before `responseEnd` interrupts the running turn

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Language the backend should answer in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Zh,
}

impl Lang {
    /// Parse a wire language code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            _ => None,
        }
    }

    /// Wire language code
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Zh => "zh",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UI page the request originates from
///
/// The backend routes chat intents differently depending on whether an
/// image is open in the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Blank,
    Editor,
}

/// Action requested from the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestAction {
    /// Free-form chat turn carrying user text
    #[default]
    Chat,
    /// Greeting generated when the UI first loads
    Welcome,
    /// Acknowledge that an image was opened (uses `fileName`)
    ImageOpened,
    /// Describe the opened image unprompted (uses `images`)
    AutoImageDesc,
}

impl RequestAction {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestAction::Chat => "Chat",
            RequestAction::Welcome => "Welcome",
            RequestAction::ImageOpened => "ImageOpened",
            RequestAction::AutoImageDesc => "AutoImageDesc",
        }
    }

    /// Whether this action carries user text and extends the conversation log
    pub fn is_chat(&self) -> bool {
        matches!(self, RequestAction::Chat)
    }
}

impl fmt::Display for RequestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged entry as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Conversation context attached to a request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatDetails {
    /// Page the user is on
    pub page: Page,
    /// Prior turns followed by the new one
    pub messages: Vec<ChatMessage>,
    /// Editor setup of the open image (brightness, crop, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<Map<String, Value>>,
}

/// A request frame sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub action: RequestAction,
    pub lang: Lang,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ChatDetails>,
    /// Opaque encoded image data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Request {
    /// Create a request with no details or attachments
    pub fn new(action: RequestAction, lang: Lang) -> Self {
        Self {
            action,
            lang,
            details: None,
            images: None,
            file_name: None,
        }
    }

    /// The last message of the attached context, if any
    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.details.as_ref().and_then(|d| d.messages.last())
    }
}
