//! Inbound frames from the backend
//!
//! Every field is optional and any subset may appear in one frame. Fields
//! this crate does not model (directive payloads such as `setup` or `lang`)
//! are kept verbatim in [`InboundFrame::extra`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Directive name the backend sends when it could not interpret the last
/// user message
pub const NOT_UNDERSTAND: &str = "notUnderstand";

/// A frame received from the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    /// Marks the beginning of a stream
    #[serde(default, skip_serializing_if = "is_false")]
    pub response_start: bool,
    /// Text delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Marks the end of a stream
    #[serde(default, skip_serializing_if = "is_false")]
    pub response_end: bool,
    /// Echo of the originating action; `null` for plain chat turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Directive name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_action: Option<String>,
    /// Directive-specific payload fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl InboundFrame {
    /// Whether the frame carries any part of a stream
    pub fn is_streaming(&self) -> bool {
        self.response_start || self.response.is_some() || self.response_end
    }

    /// The directive carried by this frame, if any
    pub fn directive(&self) -> Option<Directive> {
        self.response_action.as_deref().map(|name| Directive {
            kind: DirectiveKind::from(name),
            payload: self.extra.clone(),
        })
    }
}

/// Known directive names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Ask the UI to open a file picker
    OpenFile,
    /// Ask the UI to save the current image
    SaveFile,
    /// New editor setup in the `setup` payload field
    EditImage,
    /// Backend switched its language; new code in the `lang` payload field
    SwitchLang,
    /// Last user message was not understood
    NotUnderstand,
    /// Any other directive
    Other(String),
}

impl DirectiveKind {
    /// Wire name of the directive
    pub fn as_str(&self) -> &str {
        match self {
            DirectiveKind::OpenFile => "openFile",
            DirectiveKind::SaveFile => "saveFile",
            DirectiveKind::EditImage => "editImage",
            DirectiveKind::SwitchLang => "switchLang",
            DirectiveKind::NotUnderstand => NOT_UNDERSTAND,
            DirectiveKind::Other(name) => name,
        }
    }
}

impl From<&str> for DirectiveKind {
    fn from(name: &str) -> Self {
        match name {
            "openFile" => Self::OpenFile,
            "saveFile" => Self::SaveFile,
            "editImage" => Self::EditImage,
            "switchLang" => Self::SwitchLang,
            NOT_UNDERSTAND => Self::NotUnderstand,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured, non-conversational instruction from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub payload: Map<String, Value>,
}

impl Directive {
    /// Language code carried by a `switchLang` directive
    pub fn lang(&self) -> Option<&str> {
        self.payload.get("lang").and_then(Value::as_str)
    }

    /// Editor setup carried by an `editImage` directive
    pub fn setup(&self) -> Option<&Map<String, Value>> {
        self.payload.get("setup").and_then(Value::as_object)
    }
}
