//! Session client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use cx_protocol::{Lang, Page};

use super::serde_utils::duration_secs;

/// Default backend address
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8082";

/// Fixed delay between a socket closing and the next connection attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Configuration for the session client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the backend
    pub server_url: String,

    /// Language sent with every request until the backend switches it
    pub lang: Lang,

    /// Page reported with requests that don't specify one
    pub page: Page,

    /// Delay before reconnecting after the socket closes.
    ///
    /// The delay never grows; a backend that stays down is retried at this
    /// interval forever. Values below 100 ms or above one day are clamped
    /// when the session starts.
    #[serde(with = "duration_secs")]
    pub reconnect_delay: Duration,

    /// Upper bound on a single connection attempt
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            lang: Lang::En,
            page: Page::Blank,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at the given backend URL
    pub fn with_url(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, "ws://localhost:8082");
        assert_eq!(config.reconnect_delay, Duration::from_secs(3));
        assert_eq!(config.lang, Lang::En);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            server_url = "ws://10.0.0.5:9000"
            lang = "zh"
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url, "ws://10.0.0.5:9000");
        assert_eq!(config.lang, Lang::Zh);
        assert_eq!(config.page, Page::Blank);
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
    }

    #[test]
    fn test_fractional_reconnect_delay() {
        let config: ClientConfig = toml::from_str("reconnect_delay = 0.5").unwrap();
        assert_eq!(config.reconnect_delay, Duration::from_millis(500));
    }
}
