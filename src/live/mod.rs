//! Live Update Client
//!
//! Holds at most one authenticated socket to the backend and fans inbound
//! events out to listeners and the broadcast bus.
//!
//! Lifecycle:
//! - `connect()` moves Disconnected -> Connecting; a no-op while a socket
//!   is connecting or open
//! - a successful open moves to Connected and resets the attempt counter
//! - an unexpected close (or failed open) bumps the counter and schedules
//!   a reconnect; reaching the maximum moves to Failed and dispatches a
//!   single `ConnectionFailed`
//! - `disconnect()` is the only clean close and never reconnects

mod health;
mod listeners;
mod transport;

pub use health::spawn_health_check;
pub use listeners::{Listener, ListenerId, ListenerRegistry};
pub use transport::{Connector, Frame, SocketChannel, TungsteniteConnector};

use pos_events::{Envelope, EventKind, LiveEvent, OutboundMessage, SubscribeMessage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::bus::SharedBus;
use crate::config::LiveConfig;
use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("websocket connect failed: {0}")]
    Connect(String),
    #[error("invalid websocket url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Gave up reconnecting
    Failed,
}

#[derive(Debug, Clone)]
pub struct LiveOptions {
    /// Socket endpoint without the token, e.g. ws://host/ws/admin
    pub endpoint: Url,
    /// Channels named in the subscribe message; empty sends none
    pub channels: Vec<String>,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl LiveOptions {
    pub fn new(ws_base_url: &str, socket_path: &str) -> Result<Self, LiveError> {
        let endpoint = Url::parse(&format!(
            "{}/{}",
            ws_base_url.trim_end_matches('/'),
            socket_path.trim_start_matches('/')
        ))?;
        Ok(Self {
            endpoint,
            channels: Vec::new(),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(3),
        })
    }

    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_config(mut self, config: &LiveConfig) -> Self {
        self.max_reconnect_attempts = config.max_reconnect_attempts;
        self.reconnect_delay = Duration::from_millis(config.reconnect_delay_ms);
        self
    }

    fn url_with_token(&self, token: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }
}

struct ClientInner {
    state: ConnectionState,
    attempts: u32,
    outbound: Option<mpsc::UnboundedSender<String>>,
    /// Cancelled by `disconnect()`; covers the open socket and any pending retry
    session: CancellationToken,
}

struct Shared {
    options: LiveOptions,
    session: SessionStore,
    connector: Arc<dyn Connector>,
    bus: SharedBus,
    listeners: Mutex<ListenerRegistry>,
    inner: Mutex<ClientInner>,
    shutdown: CancellationToken,
}

/// Cheap-to-clone handle to one live connection.
#[derive(Clone)]
pub struct LiveUpdateClient {
    shared: Arc<Shared>,
}

impl LiveUpdateClient {
    pub fn new(
        options: LiveOptions,
        session: SessionStore,
        connector: Arc<dyn Connector>,
        bus: SharedBus,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                session,
                connector,
                bus,
                listeners: Mutex::new(ListenerRegistry::default()),
                inner: Mutex::new(ClientInner {
                    state: ConnectionState::Disconnected,
                    attempts: 0,
                    outbound: None,
                    session: CancellationToken::new(),
                }),
                shutdown,
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, ClientInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, ListenerRegistry> {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Consecutive failed attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.inner().attempts
    }

    pub fn bus(&self) -> &SharedBus {
        &self.shared.bus
    }

    /// Open the socket unless one is already connecting or open.
    ///
    /// Returns true if a connection attempt was started. Without a session
    /// token nothing happens; redirecting to login is the caller's job.
    pub fn connect(&self) -> bool {
        if self.shared.shutdown.is_cancelled() {
            return false;
        }
        let Some(token) = self.shared.session.token() else {
            warn!("No session token, live updates not connecting");
            return false;
        };
        let url = self.shared.options.url_with_token(&token);

        let session = {
            let mut inner = self.inner();
            match inner.state {
                ConnectionState::Connecting | ConnectionState::Connected => {
                    debug!(state = ?inner.state, "Live connect ignored");
                    return false;
                }
                ConnectionState::Failed => {
                    info!("Restarting live updates after failure");
                    inner.attempts = 0;
                }
                ConnectionState::Disconnected => {}
            }
            inner.state = ConnectionState::Connecting;
            if inner.session.is_cancelled() {
                inner.session = CancellationToken::new();
            }
            inner.session.clone()
        };

        debug!(endpoint = %self.shared.options.endpoint, "Live socket connecting");
        let client = self.clone();
        tokio::spawn(async move {
            client.run_session(url, session).await;
        });
        true
    }

    /// Application-initiated clean close. Cancels any pending reconnect.
    pub fn disconnect(&self) {
        let mut inner = self.inner();
        inner.session.cancel();
        inner.outbound = None;
        if inner.state != ConnectionState::Failed {
            inner.state = ConnectionState::Disconnected;
        }
        info!("Live updates disconnected");
    }

    /// Transmit only while connected; otherwise the message is dropped.
    pub fn send(&self, message: impl Into<OutboundMessage>) -> bool {
        let message = message.into();
        let inner = self.inner();
        let Some(outbound) = inner
            .outbound
            .as_ref()
            .filter(|_| inner.state == ConnectionState::Connected)
        else {
            warn!(state = ?inner.state, "Live socket not open, message dropped");
            return false;
        };
        match serde_json::to_string(&message) {
            Ok(text) => outbound.send(text).is_ok(),
            Err(e) => {
                warn!("Could not encode outbound message: {}", e);
                false
            }
        }
    }

    pub fn add_event_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&LiveEvent) + Send + Sync + 'static,
    {
        self.listeners().add(kind, Arc::new(listener))
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.listeners().remove(id)
    }

    /// Run every listener for the event's kind, then publish it on the bus.
    pub fn dispatch(&self, event: LiveEvent) {
        let listeners = self.listeners().matching(event.kind);
        debug!(kind = %event.kind, listeners = listeners.len(), "Dispatching live event");
        for listener in listeners {
            listener(&event);
        }
        self.shared.bus.publish(event);
    }

    fn handle_text(&self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Malformed live message dropped: {}", e);
                return;
            }
        };
        let name = envelope.event.clone();
        match envelope.into_event() {
            Some(event) => self.dispatch(event),
            None => warn!(event = %name, "Unhandled live event"),
        }
    }

    async fn run_session(self, url: Url, session: CancellationToken) {
        let opened = tokio::select! {
            _ = session.cancelled() => return,
            _ = self.shared.shutdown.cancelled() => return,
            result = self.shared.connector.open(&url) => result,
        };

        let SocketChannel {
            outbound,
            mut inbound,
        } = match opened {
            Ok(channel) => channel,
            Err(e) => {
                warn!("Live socket failed to open: {}", e);
                self.handle_unexpected_close(&session);
                return;
            }
        };

        {
            let mut inner = self.inner();
            if session.is_cancelled() {
                return;
            }
            inner.state = ConnectionState::Connected;
            inner.attempts = 0;
            inner.outbound = Some(outbound);
        }
        info!(endpoint = %self.shared.options.endpoint, "Live updates connected");

        if !self.shared.options.channels.is_empty() {
            self.send(SubscribeMessage::new(self.shared.options.channels.clone()));
        }

        loop {
            tokio::select! {
                _ = session.cancelled() => return,
                _ = self.shared.shutdown.cancelled() => {
                    self.disconnect();
                    return;
                }
                frame = inbound.recv() => match frame {
                    Some(Frame::Text(text)) => self.handle_text(&text),
                    Some(Frame::Closed { reason }) => {
                        warn!(reason = ?reason, "Live socket closed");
                        break;
                    }
                    None => break,
                },
            }
        }

        self.handle_unexpected_close(&session);
    }

    fn handle_unexpected_close(&self, session: &CancellationToken) {
        let (retry, attempts) = {
            let mut inner = self.inner();
            if session.is_cancelled() {
                return;
            }
            inner.outbound = None;
            inner.attempts += 1;
            if inner.attempts >= self.shared.options.max_reconnect_attempts {
                inner.state = ConnectionState::Failed;
                (false, inner.attempts)
            } else {
                inner.state = ConnectionState::Disconnected;
                (true, inner.attempts)
            }
        };

        if retry {
            let delay = self.shared.options.reconnect_delay;
            warn!(
                attempt = attempts,
                max = self.shared.options.max_reconnect_attempts,
                "Live socket lost, reconnecting in {:?}",
                delay
            );
            self.schedule_reconnect(delay, session.clone());
        } else {
            error!(attempts, "Live updates failed, giving up");
            self.dispatch(LiveEvent::new(
                EventKind::ConnectionFailed,
                serde_json::json!({ "attempts": attempts }),
            ));
        }
    }

    fn schedule_reconnect(&self, delay: Duration, session: CancellationToken) {
        let client = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = session.cancelled() => {}
                _ = client.shared.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    client.connect();
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::session::TOKEN_KEY;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Server halves of the sockets handed out so far
    struct FakeSocket {
        to_client: mpsc::UnboundedSender<Frame>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    #[derive(Default)]
    struct FakeConnector {
        opens: AtomicUsize,
        refuse: bool,
        close_immediately: bool,
        urls: Mutex<Vec<String>>,
        sockets: Mutex<Vec<FakeSocket>>,
    }

    impl FakeConnector {
        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }

        fn last_socket(&self) -> FakeSocket {
            self.sockets.lock().unwrap().pop().expect("a socket was opened")
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn open(&self, url: &Url) -> Result<SocketChannel, LiveError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            if self.refuse {
                return Err(LiveError::Connect("connection refused".to_string()));
            }
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            if self.close_immediately {
                in_tx.send(Frame::Closed { reason: None }).unwrap();
            }
            self.sockets.lock().unwrap().push(FakeSocket {
                to_client: in_tx,
                from_client: out_rx,
            });
            Ok(SocketChannel {
                outbound: out_tx,
                inbound: in_rx,
            })
        }
    }

    fn client_with(connector: Arc<FakeConnector>, token: Option<&str>) -> LiveUpdateClient {
        let session = SessionStore::in_memory();
        if let Some(token) = token {
            session.set(TOKEN_KEY, token).unwrap();
        }
        let options = LiveOptions::new("ws://pos.test", "/ws/admin")
            .unwrap()
            .with_channels(["tables", "orders"]);
        LiveUpdateClient::new(
            options,
            session,
            connector,
            EventBus::shared(),
            CancellationToken::new(),
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_connect_is_a_noop() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));

        assert!(client.connect());
        assert!(!client.connect());
        settle().await;
        assert!(!client.connect());

        assert_eq!(connector.opens(), 1);
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(
            connector.urls.lock().unwrap()[0],
            "ws://pos.test/ws/admin?token=t1"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_aborts_connect() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), None);

        assert!(!client.connect());
        settle().await;
        assert_eq!(connector.opens(), 0);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_message_sent_on_open() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        client.connect();
        settle().await;

        let mut socket = connector.last_socket();
        let sent: Value = serde_json::from_str(&socket.from_client.recv().await.unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({"type": "subscribe", "channels": ["tables", "orders"]})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_listener_receives_payload_exactly_once() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        client.add_event_listener(EventKind::TableUpdate, move |event| {
            sink.lock().unwrap().push(event.data.clone());
        });

        client.connect();
        settle().await;
        let socket = connector.last_socket();
        socket
            .to_client
            .send(Frame::Text(
                r#"{"event":"table_update","data":{"id":1,"status":"occupied"}}"#.to_string(),
            ))
            .unwrap();
        settle().await;

        assert_eq!(
            *received.lock().unwrap(),
            vec![json!({"id": 1, "status": "occupied"})]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_and_malformed_messages_are_dropped() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        let mut rx = client.bus().subscribe();

        client.connect();
        settle().await;
        let socket = connector.last_socket();
        for text in [r#"{"event":"weather_report","data":{}}"#, "not json", r#"{"event":"new_order","data":{"id":3}}"#] {
            socket.to_client.send(Frame::Text(text.to_string())).unwrap();
        }
        settle().await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::NewOrder);
        assert!(rx.try_recv().is_err());
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_listener_is_not_called() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = client.add_event_listener(EventKind::NewOrder, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.dispatch(LiveEvent::new(EventKind::NewOrder, Value::Null));
        assert!(client.remove_event_listener(id));
        client.dispatch(LiveEvent::new(EventKind::NewOrder, Value::Null));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_five_failed_attempts() {
        let connector = Arc::new(FakeConnector {
            refuse: true,
            ..Default::default()
        });
        let client = client_with(connector.clone(), Some("t1"));
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        client.add_event_listener(EventKind::ConnectionFailed, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.connect();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(connector.opens(), 5);
        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(failures.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.opens(), 5);
        assert_eq!(failures.load(Ordering::SeqCst), 1);

        // manual retry starts a fresh count
        assert!(client.connect());
        settle().await;
        assert_eq!(client.attempts(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_socket_that_opens_then_drops_keeps_retrying() {
        let connector = Arc::new(FakeConnector {
            close_immediately: true,
            ..Default::default()
        });
        let client = client_with(connector.clone(), Some("t1"));

        client.connect();
        tokio::time::sleep(Duration::from_secs(31)).await;

        // every open resets the counter, so the cap is never reached
        assert!(connector.opens() > 5);
        assert_ne!(client.state(), ConnectionState::Failed);
        assert!(client.attempts() <= 1);
        client.disconnect();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_open_counts_as_closure() {
        let connector = Arc::new(FakeConnector {
            refuse: true,
            ..Default::default()
        });
        let client = client_with(connector.clone(), Some("t1"));

        client.connect();
        settle().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.attempts(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.opens(), 5);
        assert_eq!(client.state(), ConnectionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_reconnect_resets_attempts() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        client.connect();
        settle().await;

        connector
            .last_socket()
            .to_client
            .send(Frame::Closed { reason: None })
            .unwrap();
        settle().await;
        assert_eq!(client.attempts(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(connector.opens(), 2);
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_never_reconnects() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        client.connect();
        settle().await;

        client.disconnect();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(connector.opens(), 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.send(json!({"type": "ping"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_requires_open_socket() {
        let connector = Arc::new(FakeConnector::default());
        let client = client_with(connector.clone(), Some("t1"));
        assert!(!client.send(json!({"type": "ping"})));

        client.connect();
        settle().await;
        assert!(client.send(json!({"type": "ping"})));

        let mut socket = connector.last_socket();
        // subscribe first, then the ping
        socket.from_client.recv().await.unwrap();
        assert_eq!(socket.from_client.recv().await.unwrap(), r#"{"type":"ping"}"#);
    }
}
