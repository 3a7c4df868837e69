//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Request could not be serialized
    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// Inbound text was not a JSON object matching the frame shape
    #[error("Malformed inbound frame: {0}")]
    Decode(#[source] serde_json::Error),
}
