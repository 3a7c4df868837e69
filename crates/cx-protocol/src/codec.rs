//! JSON text codec for socket frames
//!
//! Each WebSocket text message carries exactly one JSON object, so there is
//! no framing beyond the transport's own message boundaries.

use crate::error::ProtocolError;
use crate::frame::InboundFrame;
use crate::message::Request;

/// Serialize a request into a text frame
pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    serde_json::to_string(request).map_err(ProtocolError::Encode)
}

/// Parse a text frame received from the backend
pub fn decode_frame(text: &str) -> Result<InboundFrame, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Decode)
}
