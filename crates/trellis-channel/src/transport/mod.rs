//! Transport layer for the assistant channel.
//!
//! The [`Connector`] owns the single persistent connection and its
//! lifecycle: lazy dialing, the bounded connect timeout, the handshake
//! grace period, and teardown. Callers that cannot get a usable connection
//! degrade to the one-shot [`FallbackTransport`].

pub mod http;
pub mod ws;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Degraded, DialError, FallbackError};

pub use http::{FallbackReply, FallbackRequest, HttpFallback};
pub use ws::WsDialer;

/// Connection lifecycle state of the persistent transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in flight.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Open and usable for writes.
    Connected,
}

/// Write half of an established persistent connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame.
    async fn send(&mut self, frame: String) -> Result<(), Degraded>;

    /// Close the connection (best effort).
    async fn close(&mut self);
}

/// Read half of an established persistent connection.
#[async_trait]
pub trait FrameSource: Send {
    /// Next inbound text frame; `None` once the connection is gone.
    async fn next(&mut self) -> Option<String>;
}

/// An established persistent connection.
pub struct Connection {
    /// Write half.
    pub sink: Box<dyn FrameSink>,
    /// Read half.
    pub source: Box<dyn FrameSource>,
}

/// Opens persistent connections.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Open a connection to `endpoint`, presenting `bearer`.
    async fn dial(&self, endpoint: &str, bearer: &str) -> Result<Connection, DialError>;
}

/// One-shot request/response transport used when the persistent channel is
/// unavailable. Failures here are user-facing, unlike [`Degraded`].
#[async_trait]
pub trait FallbackTransport: Send + Sync {
    /// Exchange one request for at most one assistant turn.
    async fn exchange(
        &self,
        bearer: &str,
        request: &FallbackRequest,
    ) -> Result<FallbackReply, FallbackError>;
}

/// The live connection slot.
///
/// The generation counter is bumped every time the slot is replaced or
/// cleared, so a cleanup path racing against a newer connection can detect
/// that its connection is already gone and must not touch the slot.
#[derive(Default)]
struct LinkSlot {
    sink: Option<Box<dyn FrameSink>>,
    generation: u64,
}

struct Inner {
    dialer: Arc<dyn Dialer>,
    endpoint: String,
    connect_timeout: Duration,
    handshake_grace: Duration,
    state_tx: watch::Sender<ConnectionState>,
    link: Mutex<LinkSlot>,
    /// Inbound frames are pumped here for the decoder.
    frames_tx: mpsc::UnboundedSender<String>,
}

/// Transport selector for the persistent channel.
///
/// Never opens more than one connection at a time, never runs more than one
/// dial attempt at a time, and ties the connect timeout 1:1 to its attempt
/// so a timer from attempt N can never fire against connection N+1.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
}

impl Connector {
    /// Create a connector. No connection is opened until
    /// [`Connector::ensure_connected`] is called.
    pub fn new(
        dialer: Arc<dyn Dialer>,
        endpoint: String,
        connect_timeout: Duration,
        handshake_grace: Duration,
        frames_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                dialer,
                endpoint,
                connect_timeout,
                handshake_grace,
                state_tx,
                link: Mutex::new(LinkSlot::default()),
                frames_tx,
            }),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Whether the persistent connection is open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Subscribe to connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Ensure a usable connection, waiting at most the handshake grace
    /// period for an in-flight attempt to complete.
    ///
    /// Idempotent while connected. Returns whether the connection is open;
    /// failures are silent — the caller degrades to the fallback.
    pub async fn ensure_connected(&self, bearer: &str) -> bool {
        if self.is_connected() {
            return true;
        }
        self.begin_dial(bearer);

        let mut state_rx = self.inner.state_tx.subscribe();
        let connected = timeout(
            self.inner.handshake_grace,
            state_rx.wait_for(|state| *state == ConnectionState::Connected),
        )
        .await;
        matches!(connected, Ok(Ok(_)))
    }

    /// Write one frame over the open connection.
    ///
    /// Fire-and-forget: correlation happens on the inbound side. A failed
    /// write drops the connection so the next send dials fresh.
    pub async fn write(&self, frame: String) -> Result<(), Degraded> {
        let mut link = self.inner.link.lock().await;
        let Some(sink) = link.sink.as_mut() else {
            return Err(Degraded::NotConnected);
        };
        match sink.send(frame).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(mut dead) = link.sink.take() {
                    dead.close().await;
                }
                link.generation += 1;
                self.inner.mark_disconnected();
                Err(err)
            }
        }
    }

    /// Tear down the current connection, if any. Idempotent; a later
    /// [`Connector::ensure_connected`] dials fresh.
    pub async fn close(&self) {
        let mut link = self.inner.link.lock().await;
        if let Some(mut sink) = link.sink.take() {
            sink.close().await;
        }
        link.generation += 1;
        self.inner.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Start a dial attempt unless one is already running or a connection
    /// is open. The attempt is bounded by the connect timeout.
    fn begin_dial(&self, bearer: &str) {
        // Winner of this transition owns the attempt.
        let transitioned = self.inner.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connecting;
                true
            } else {
                false
            }
        });
        if !transitioned {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let bearer = bearer.to_string();
        tokio::spawn(async move {
            // Discard any stale sink left over from a dead connection.
            {
                let mut link = inner.link.lock().await;
                if let Some(mut stale) = link.sink.take() {
                    stale.close().await;
                    link.generation += 1;
                }
            }

            match timeout(inner.connect_timeout, inner.dialer.dial(&inner.endpoint, &bearer)).await
            {
                Ok(Ok(connection)) => inner.adopt(connection).await,
                Ok(Err(err)) => {
                    debug!("assistant channel dial failed: {err}");
                    inner.abandon_attempt();
                }
                Err(_) => {
                    debug!(
                        timeout_ms = inner.connect_timeout.as_millis() as u64,
                        "assistant channel dial timed out"
                    );
                    inner.abandon_attempt();
                }
            }
        });
    }
}

impl Inner {
    /// Adopt a freshly dialed connection: store the sink, publish
    /// `connected`, and pump inbound frames until the stream ends.
    async fn adopt(self: Arc<Self>, connection: Connection) {
        let Connection { sink, mut source } = connection;

        // State transition and slot mutation happen under the same lock so
        // a concurrent close cannot slip between them. The attempt may
        // have been cancelled while the handshake was completing.
        let mut link = self.link.lock().await;
        let adopted = self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });
        if !adopted {
            drop(link);
            let mut sink = sink;
            sink.close().await;
            return;
        }
        link.generation += 1;
        link.sink = Some(sink);
        let generation = link.generation;
        drop(link);
        debug!("assistant channel connected");

        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            while let Some(raw) = source.next().await {
                if inner.frames_tx.send(raw).is_err() {
                    // Decoder gone; the channel is being torn down.
                    break;
                }
            }

            // The connection is gone. Clear the slot only if it still holds
            // this connection; a newer one must not be disturbed.
            let mut link = inner.link.lock().await;
            if link.generation == generation {
                link.sink = None;
                link.generation += 1;
                inner.mark_disconnected();
                debug!("assistant channel connection closed");
            }
        });
    }

    /// Publish `disconnected` after a connection died.
    fn mark_disconnected(&self) {
        self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Connected {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
    }

    /// Publish `disconnected` after a dial attempt failed or timed out.
    fn abandon_attempt(&self) {
        self.state_tx.send_if_modified(|state| {
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
    }
}
