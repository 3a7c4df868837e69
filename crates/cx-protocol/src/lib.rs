//! cx-protocol: Wire protocol for the Cindex conversation socket
//!
//! This crate defines the JSON frames exchanged between a session client
//! and the language-model backend over a WebSocket connection.

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{decode_frame, encode_request};
pub use error::ProtocolError;
pub use frame::{Directive, DirectiveKind, InboundFrame};
pub use message::{ChatDetails, ChatMessage, Lang, Page, Request, RequestAction, Role};
