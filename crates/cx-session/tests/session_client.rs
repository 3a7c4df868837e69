//! End-to-end tests for the session client over an in-memory socket

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;

use cx_core::config::ClientConfig;
use cx_core::{ClientError, ConnectionError, ConnectionState};
use cx_protocol::RequestAction;
use cx_session::{Connector, RequestDescriptor, SessionClient, SessionEvent, Transport, Turn};

const EVENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Server side of one accepted in-memory connection
struct ServerEnd {
    rx: mpsc::UnboundedReceiver<String>,
    tx: mpsc::UnboundedSender<Result<String, ConnectionError>>,
}

impl ServerEnd {
    async fn recv_json(&mut self) -> Value {
        let text = tokio::time::timeout(EVENT_TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for request")
            .expect("client closed the socket");
        serde_json::from_str(&text).unwrap()
    }

    fn send_json(&self, value: Value) {
        self.tx.send(Ok(value.to_string())).unwrap();
    }

    /// Make the client's next read fail
    fn break_socket(&self) {
        self.tx
            .send(Err(ConnectionError::ReceiveFailed(
                "connection reset by peer".to_string(),
            )))
            .unwrap();
    }

    /// Stream a whole reply: start, one delta per chunk, end
    fn stream(&self, chunks: &[&str]) {
        self.send_json(json!({"responseStart": true, "action": null}));
        for chunk in chunks {
            self.send_json(json!({"response": chunk, "action": null}));
        }
        self.send_json(json!({"responseEnd": true, "action": null}));
    }
}

struct MemoryTransport {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<Result<String, ConnectionError>>,
    /// Every write fails, as on a half-closed socket
    fail_sends: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.fail_sends {
            return Err(ConnectionError::SendFailed("broken pipe".to_string()));
        }
        self.tx.send(text).map_err(|_| ConnectionError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<String, ConnectionError>> {
        self.rx.recv().await
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

#[derive(Clone)]
struct MemoryConnector {
    accepted: mpsc::UnboundedSender<ServerEnd>,
    refuse: Arc<AtomicBool>,
    /// Number of upcoming connections whose writes fail
    failing_sends: Arc<AtomicUsize>,
    attempts: Arc<AtomicUsize>,
    attempt_times: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl Connector for MemoryConnector {
    type Transport = MemoryTransport;

    async fn connect(&self) -> Result<MemoryTransport, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.attempt_times.lock().unwrap().push(Instant::now());

        if self.refuse.load(Ordering::SeqCst) {
            return Err(ConnectionError::ConnectFailed {
                url: "memory://backend".to_string(),
                reason: "refused".to_string(),
            });
        }

        let fail_sends = self
            .failing_sends
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let (to_server, server_rx) = mpsc::unbounded_channel();
        let (server_tx, from_server) = mpsc::unbounded_channel();
        self.accepted
            .send(ServerEnd {
                rx: server_rx,
                tx: server_tx,
            })
            .map_err(|_| ConnectionError::Closed)?;

        Ok(MemoryTransport {
            tx: to_server,
            rx: from_server,
            fail_sends,
        })
    }
}

struct Harness {
    client: SessionClient,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    accepted: mpsc::UnboundedReceiver<ServerEnd>,
    connector: MemoryConnector,
}

impl Harness {
    fn new(refuse: bool) -> Self {
        Self::with_options(ClientConfig::default(), refuse, 0)
    }

    fn with_options(config: ClientConfig, refuse: bool, failing_sends: usize) -> Self {
        let (accepted_tx, accepted) = mpsc::unbounded_channel();
        let connector = MemoryConnector {
            accepted: accepted_tx,
            refuse: Arc::new(AtomicBool::new(refuse)),
            failing_sends: Arc::new(AtomicUsize::new(failing_sends)),
            attempts: Arc::new(AtomicUsize::new(0)),
            attempt_times: Arc::new(Mutex::new(Vec::new())),
        };
        let (client, events) =
            SessionClient::with_connector(&config, connector.clone());

        Self {
            client,
            events,
            accepted,
            connector,
        }
    }

    async fn accept(&mut self) -> ServerEnd {
        tokio::time::timeout(EVENT_TIMEOUT, self.accepted.recv())
            .await
            .expect("timed out waiting for connection")
            .expect("connector dropped")
    }

    async fn next_event(&mut self) -> SessionEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Skip events until one matches
    async fn wait_for(&mut self, matches: impl Fn(&SessionEvent) -> bool) -> SessionEvent {
        loop {
            let event = self.next_event().await;
            if matches(&event) {
                return event;
            }
        }
    }

    fn allow_connections(&self) {
        self.connector.refuse.store(false, Ordering::SeqCst);
    }

    fn attempts(&self) -> usize {
        self.connector.attempts.load(Ordering::SeqCst)
    }
}

fn message_texts(request: &Value) -> Vec<String> {
    request["details"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_hello_is_sent_once_connected() {
    let mut harness = Harness::new(false);
    harness.client.submit(RequestDescriptor::chat("Hello")).unwrap();

    let mut server = harness.accept().await;
    let request = server.recv_json().await;
    assert_eq!(request["action"], "Chat");
    assert_eq!(request["lang"], "en");
    assert_eq!(
        request["details"]["messages"],
        json!([{"role": "user", "content": "Hello"}])
    );

    harness.wait_for(|e| *e == SessionEvent::Connected).await;
    assert!(harness.client.connected());
    assert_eq!(harness.client.state(), ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_streamed_reply_lands_in_history() {
    let mut harness = Harness::new(false);
    let mut server = harness.accept().await;
    harness.client.wait_until_connected().await.unwrap();

    harness.client.submit(RequestDescriptor::chat("Hi")).unwrap();
    server.recv_json().await;
    server.stream(&["  Hello", " there "]);

    let finished = harness
        .wait_for(|e| matches!(e, SessionEvent::TurnFinished { .. }))
        .await;
    assert_eq!(
        finished,
        SessionEvent::TurnFinished {
            turn: Some(Turn::assistant("Hello there")),
            interrupted: false,
        }
    );

    let history = harness.client.history().await.unwrap();
    assert_eq!(history, vec![Turn::user("Hi"), Turn::assistant("Hello there")]);
}

#[tokio::test(start_paused = true)]
async fn test_offline_submissions_keep_only_latest() {
    let mut harness = Harness::new(true);
    for text in ["one", "two", "three"] {
        harness.client.submit(RequestDescriptor::chat(text)).unwrap();
    }
    harness.allow_connections();

    let mut server = harness.accept().await;
    let request = server.recv_json().await;
    assert_eq!(message_texts(&request).last().unwrap(), "three");

    harness.wait_for(|e| *e == SessionEvent::Connected).await;
    assert!(server.rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_offline_submissions_with_keep_existing_arrive_in_order() {
    let mut harness = Harness::new(true);
    for file in ["a.jpg", "b.jpg", "c.jpg"] {
        harness
            .client
            .submit(
                RequestDescriptor::action(RequestAction::ImageOpened)
                    .with_file_name(file)
                    .keep_existing(),
            )
            .unwrap();
    }
    harness.allow_connections();

    let mut server = harness.accept().await;
    let mut received = Vec::new();
    for _ in 0..3 {
        let request = server.recv_json().await;
        assert_eq!(request["action"], "ImageOpened");
        received.push(request["fileName"].as_str().unwrap().to_string());
    }
    assert_eq!(received, vec!["a.jpg", "b.jpg", "c.jpg"]);
}

#[tokio::test(start_paused = true)]
async fn test_interruption_finishes_previous_turn_exactly_once() {
    let mut harness = Harness::new(false);
    let mut server = harness.accept().await;
    harness.client.wait_until_connected().await.unwrap();

    harness.client.submit(RequestDescriptor::chat("first")).unwrap();
    server.recv_json().await;
    server.send_json(json!({"responseStart": true}));
    server.send_json(json!({"response": "partial "}));
    harness
        .wait_for(|e| matches!(e, SessionEvent::Delta { .. }))
        .await;

    harness.client.submit(RequestDescriptor::chat("second")).unwrap();
    let request = server.recv_json().await;
    assert_eq!(message_texts(&request), vec!["first", "partial", "second"]);

    assert_eq!(
        harness.next_event().await,
        SessionEvent::TurnFinished {
            turn: Some(Turn::assistant("partial")),
            interrupted: true,
        }
    );

    server.stream(&["done"]);
    let finished = harness
        .wait_for(|e| matches!(e, SessionEvent::TurnFinished { .. }))
        .await;
    assert!(matches!(
        finished,
        SessionEvent::TurnFinished { interrupted: false, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_not_understood_turn_drops_out_of_context() {
    let mut harness = Harness::new(false);
    let mut server = harness.accept().await;
    harness.client.wait_until_connected().await.unwrap();

    harness.client.submit(RequestDescriptor::chat("X")).unwrap();
    server.recv_json().await;
    server.send_json(json!({"responseAction": "notUnderstand"}));
    server.stream(&["Sorry?"]);
    harness
        .wait_for(|e| matches!(e, SessionEvent::TurnFinished { .. }))
        .await;

    harness.client.submit(RequestDescriptor::chat("Y")).unwrap();
    let request = server.recv_json().await;
    assert_eq!(message_texts(&request), vec!["Y"]);

    let history = harness.client.history().await.unwrap();
    assert_eq!(history.len(), 3);
    assert!(history[0].forget);
    assert!(history[1].forget);
    assert!(!history[2].forget);
}

#[tokio::test(start_paused = true)]
async fn test_directive_is_forwarded() {
    let mut harness = Harness::new(false);
    let mut server = harness.accept().await;
    harness.client.wait_until_connected().await.unwrap();

    harness
        .client
        .submit(RequestDescriptor::chat("make it brighter"))
        .unwrap();
    server.recv_json().await;
    server.send_json(json!({"responseAction": "editImage", "setup": {"brightness": 20}}));

    let event = harness
        .wait_for(|e| matches!(e, SessionEvent::Directive(_)))
        .await;
    let SessionEvent::Directive(directive) = event else {
        unreachable!()
    };
    assert_eq!(directive.kind.as_str(), "editImage");
    assert_eq!(directive.setup().unwrap()["brightness"], 20);
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_three_seconds_after_close() {
    let mut harness = Harness::new(false);
    let server = harness.accept().await;
    harness.wait_for(|e| *e == SessionEvent::Connected).await;

    drop(server);
    harness.wait_for(|e| *e == SessionEvent::Disconnected).await;
    let closed_at = Instant::now();

    let _server = harness.accept().await;
    harness.wait_for(|e| *e == SessionEvent::Connected).await;

    let elapsed = closed_at.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "reconnected after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "reconnected after {elapsed:?}");
    assert_eq!(harness.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_socket_error_closes_and_reconnects() {
    let mut harness = Harness::new(false);
    let server = harness.accept().await;
    harness.wait_for(|e| *e == SessionEvent::Connected).await;

    server.break_socket();
    harness.wait_for(|e| *e == SessionEvent::Disconnected).await;
    let closed_at = Instant::now();
    assert!(server.tx.is_closed());
    assert!(!harness.client.connected());

    let _server = harness.accept().await;
    harness.wait_for(|e| *e == SessionEvent::Connected).await;

    let elapsed = closed_at.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "reconnected after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "reconnected after {elapsed:?}");
    assert_eq!(harness.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_is_delivered_on_next_connection() {
    let mut harness = Harness::with_options(ClientConfig::default(), false, 1);
    harness.client.submit(RequestDescriptor::chat("Hello")).unwrap();

    let mut first = harness.accept().await;
    let mut connection_events = Vec::new();
    while connection_events.len() < 3 {
        let event = harness.next_event().await;
        if matches!(event, SessionEvent::Connected | SessionEvent::Disconnected) {
            connection_events.push(event);
        }
    }
    assert_eq!(
        connection_events,
        vec![
            SessionEvent::Connected,
            SessionEvent::Disconnected,
            SessionEvent::Connected,
        ]
    );
    assert!(first.rx.try_recv().is_err());

    let mut second = harness.accept().await;
    let request = second.recv_json().await;
    assert_eq!(request["action"], "Chat");
    assert_eq!(message_texts(&request), vec!["Hello"]);
    assert_eq!(harness.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_huge_reconnect_delay_keeps_driver_alive() {
    let config = ClientConfig {
        reconnect_delay: Duration::from_secs_f64(1e19),
        ..Default::default()
    };
    let mut harness = Harness::with_options(config, false, 0);
    let server = harness.accept().await;
    harness.wait_for(|e| *e == SessionEvent::Connected).await;

    drop(server);
    harness.wait_for(|e| *e == SessionEvent::Disconnected).await;

    harness.client.submit(RequestDescriptor::chat("still there")).unwrap();
    assert_eq!(
        harness.client.history().await.unwrap(),
        vec![Turn::user("still there")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_retries_forever_at_fixed_interval() {
    let harness = Harness::new(true);
    tokio::time::sleep(Duration::from_secs(31)).await;

    assert!(harness.attempts() >= 10, "only {} attempts", harness.attempts());
    let times = harness.connector.attempt_times.lock().unwrap().clone();
    for pair in times.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_secs(3), "gap {gap:?}");
        assert!(gap < Duration::from_millis(3100), "gap {gap:?}");
    }
    assert!(!harness.client.connected());
}

#[tokio::test(start_paused = true)]
async fn test_request_retried_after_mid_stream_disconnect() {
    let mut harness = Harness::new(false);
    let mut server = harness.accept().await;
    harness.client.wait_until_connected().await.unwrap();

    harness
        .client
        .submit(RequestDescriptor::chat("describe it"))
        .unwrap();
    let original = server.recv_json().await;
    server.send_json(json!({"responseStart": true}));
    server.send_json(json!({"response": "It is"}));
    harness
        .wait_for(|e| matches!(e, SessionEvent::Delta { .. }))
        .await;
    drop(server);

    let abandoned = harness
        .wait_for(|e| matches!(e, SessionEvent::TurnAbandoned { .. }))
        .await;
    let SessionEvent::TurnAbandoned { partial } = abandoned else {
        unreachable!()
    };
    assert_eq!(partial.content, "It is");
    assert!(partial.forget);

    let mut server = harness.accept().await;
    assert_eq!(server.recv_json().await, original);
}

#[tokio::test(start_paused = true)]
async fn test_blank_text_sends_nothing() {
    let mut harness = Harness::new(false);
    let mut server = harness.accept().await;
    harness.client.wait_until_connected().await.unwrap();

    harness.client.submit(RequestDescriptor::chat("")).unwrap();
    harness.client.submit(RequestDescriptor::chat(" \n ")).unwrap();

    assert!(harness.client.history().await.unwrap().is_empty());
    assert!(server.rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_chat_without_text_is_rejected() {
    let harness = Harness::new(false);
    let result = harness
        .client
        .submit(RequestDescriptor::action(RequestAction::Chat));
    assert_eq!(result, Err(ClientError::EmptyChatRequest));
}

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_reconnecting() {
    let harness = Harness::new(true);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let attempts = harness.attempts();

    harness.client.dispose();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(harness.attempts(), attempts);
    assert!(harness.client.is_disposed());
    assert_eq!(
        harness.client.submit(RequestDescriptor::chat("late")),
        Err(ClientError::Disposed)
    );
    assert_eq!(
        harness.client.history().await,
        Err(ClientError::Disposed)
    );
}
