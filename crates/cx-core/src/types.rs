//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the backend socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No socket exists
    #[default]
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// Socket is open and frames can be sent
    Open,
}

impl ConnectionState {
    /// Whether frames can be transmitted right now
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Open), "open");
        assert_eq!(
            format!("{}", ConnectionState::Disconnected),
            "disconnected"
        );
    }

    #[test]
    fn test_only_open_is_open() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(!ConnectionState::default().is_open());
    }
}
