//! Core error types for Cindex Link

use std::path::PathBuf;
use thiserror::Error;

/// Transport-level failures
///
/// These never reach callers of the session client; the connection manager
/// absorbs them and schedules a reconnect.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Could not establish the socket
    #[error("Connection to {url} failed: {reason}")]
    ConnectFailed { url: String, reason: String },

    /// Connect attempt exceeded the configured timeout
    #[error("Connection to {0} timed out")]
    Timeout(String),

    /// Writing a frame failed
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Reading from the socket failed
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The socket is already closed
    #[error("Connection closed")]
    Closed,
}

/// Errors caused by misuse of the session client
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClientError {
    /// A chat request was built without any message text
    #[error("Chat request has no message content")]
    EmptyChatRequest,

    /// The client was disposed
    #[error("Session client has been disposed")]
    Disposed,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
