//! Socket transport
//!
//! [`Connector`] and [`Transport`] abstract the text-frame socket so the
//! manager can run against a real WebSocket or an in-memory pair in tests.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use cx_core::config::ClientConfig;
use cx_core::ConnectionError;

/// Opens new transports
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport + 'static;

    /// Attempt a single connection
    async fn connect(&self) -> Result<Self::Transport, ConnectionError>;
}

/// A bidirectional stream of text frames
#[async_trait]
pub trait Transport: Send {
    /// Write one text frame
    async fn send(&mut self, text: String) -> Result<(), ConnectionError>;

    /// Next text frame; `None` once the peer closed the socket
    async fn recv(&mut self) -> Option<Result<String, ConnectionError>>;

    /// Close the socket, ignoring errors
    async fn close(&mut self);
}

/// Connects to the backend over WebSocket
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.server_url.clone(), config.connect_timeout)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self) -> Result<WebSocketTransport, ConnectionError> {
        tracing::debug!("Connecting to {}", self.url);
        let (stream, _response) = tokio::time::timeout(self.timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ConnectionError::Timeout(self.url.clone()))?
            .map_err(|e| ConnectionError::ConnectFailed {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(WebSocketTransport { stream })
    }
}

/// An open WebSocket to the backend
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ConnectionError::SendFailed(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!("Server closed the socket: {:?}", frame);
                    return None;
                }
                // pings are answered by tungstenite; binary frames are not part of the protocol
                Ok(_) => continue,
                Err(e) => return Some(Err(ConnectionError::ReceiveFailed(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Error closing socket: {}", e);
        }
    }
}
