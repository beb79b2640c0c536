//! Shared mock transports for channel integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, watch};

use trellis_channel::error::{Degraded, DialError, FallbackError};
use trellis_channel::transport::{
    Connection, Dialer, FallbackReply, FallbackRequest, FallbackTransport, FrameSink, FrameSource,
};
use trellis_channel::{AssistantChannel, ChannelConfig, CredentialSource};

/// Scripted behavior for one dial attempt.
#[derive(Debug, Clone)]
pub enum DialBehavior {
    /// Complete the handshake immediately.
    Connect,
    /// Complete the handshake after a delay.
    ConnectAfter(Duration),
    /// Connect, but fail every write.
    ConnectBrokenPipe,
    /// Never complete the handshake.
    Hang,
    /// Fail the handshake immediately.
    Refuse,
}

/// Server side of one mock connection.
#[derive(Clone)]
pub struct MockRemote {
    /// Feeds inbound frames to the channel.
    pub frames: mpsc::UnboundedSender<String>,
    /// Frames the channel wrote.
    pub sent: Arc<Mutex<Vec<String>>>,
    /// Becomes true once the client closes its sink.
    pub closed: watch::Receiver<bool>,
    dropped_tx: Arc<watch::Sender<bool>>,
}

impl MockRemote {
    pub async fn sent_frames(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    pub fn feed(&self, raw: &str) {
        self.frames.send(raw.to_string()).expect("channel decoder is gone");
    }

    /// Drop the connection from the server side.
    pub fn disconnect(&self) {
        let _ = self.dropped_tx.send(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

/// Mock dialer that scripts one behavior per dial attempt. The last
/// behavior repeats once the script is exhausted.
pub struct MockDialer {
    behaviors: Mutex<VecDeque<DialBehavior>>,
    dials: AtomicUsize,
    bearers: Mutex<Vec<String>>,
    remotes: Mutex<Vec<MockRemote>>,
}

impl MockDialer {
    pub fn new(behavior: DialBehavior) -> Arc<Self> {
        Self::with_behaviors([behavior])
    }

    pub fn with_behaviors(behaviors: impl IntoIterator<Item = DialBehavior>) -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(behaviors.into_iter().collect()),
            dials: AtomicUsize::new(0),
            bearers: Mutex::new(Vec::new()),
            remotes: Mutex::new(Vec::new()),
        })
    }

    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub async fn bearers(&self) -> Vec<String> {
        self.bearers.lock().await.clone()
    }

    /// The remote side of the most recent successful dial.
    pub async fn remote(&self) -> MockRemote {
        self.remotes.lock().await.last().expect("no connection was dialed").clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, _endpoint: &str, bearer: &str) -> Result<Connection, DialError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.bearers.lock().await.push(bearer.to_string());

        let behavior = {
            let mut behaviors = self.behaviors.lock().await;
            if behaviors.len() > 1 {
                behaviors.pop_front().expect("behavior queue is nonempty")
            } else {
                behaviors.front().cloned().unwrap_or(DialBehavior::Connect)
            }
        };

        let fail_writes = match behavior {
            DialBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!("pending future never resolves")
            }
            DialBehavior::Refuse => return Err(DialError("mock dial refused".to_string())),
            DialBehavior::ConnectAfter(delay) => {
                tokio::time::sleep(delay).await;
                false
            }
            DialBehavior::Connect => false,
            DialBehavior::ConnectBrokenPipe => true,
        };

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let (dropped_tx, dropped_rx) = watch::channel(false);
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.remotes.lock().await.push(MockRemote {
            frames: frames_tx,
            sent: Arc::clone(&sent),
            closed: closed_rx.clone(),
            dropped_tx: Arc::new(dropped_tx),
        });

        Ok(Connection {
            sink: Box::new(MockSink { sent, fail_writes, closed_tx }),
            source: Box::new(MockSource { frames: frames_rx, closed_rx, dropped_rx }),
        })
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes: bool,
    closed_tx: watch::Sender<bool>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send(&mut self, frame: String) -> Result<(), Degraded> {
        if self.fail_writes {
            return Err(Degraded::WriteFailed("mock broken pipe".to_string()));
        }
        self.sent.lock().await.push(frame);
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.closed_tx.send(true);
    }
}

struct MockSource {
    frames: mpsc::UnboundedReceiver<String>,
    closed_rx: watch::Receiver<bool>,
    dropped_rx: watch::Receiver<bool>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn next(&mut self) -> Option<String> {
        tokio::select! {
            frame = self.frames.recv() => frame,
            _ = self.closed_rx.wait_for(|closed| *closed) => None,
            _ = self.dropped_rx.wait_for(|dropped| *dropped) => None,
        }
    }
}

/// Mock one-shot fallback with a scripted reply queue.
pub struct MockFallback {
    replies: Mutex<VecDeque<Result<FallbackReply, FallbackError>>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<FallbackRequest>>,
}

impl MockFallback {
    fn with_reply(reply: Result<FallbackReply, FallbackError>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([reply])),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A fallback that must never be reached.
    pub fn unused() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(message: &str) -> Arc<Self> {
        Self::with_reply(Ok(FallbackReply {
            id: None,
            message: message.to_string(),
            tool_calls: Vec::new(),
        }))
    }

    pub fn replying_with(reply: FallbackReply) -> Arc<Self> {
        Self::with_reply(Ok(reply))
    }

    pub fn failing_with_status(status: u16) -> Arc<Self> {
        Self::with_reply(Err(FallbackError::Status(status)))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<FallbackRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl FallbackTransport for MockFallback {
    async fn exchange(
        &self,
        _bearer: &str,
        request: &FallbackRequest,
    ) -> Result<FallbackReply, FallbackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(FallbackError::Request("mock fallback exhausted".to_string())))
    }
}

/// Channel wired to mock transports with default config.
pub fn test_channel(
    dialer: Arc<MockDialer>,
    fallback: Arc<MockFallback>,
    credentials: Arc<dyn CredentialSource>,
) -> AssistantChannel {
    AssistantChannel::with_transports(ChannelConfig::default(), credentials, dialer, fallback)
}

/// Wait until the channel satisfies a predicate, driven by revisions.
pub async fn wait_until(channel: &AssistantChannel, mut pred: impl FnMut(&AssistantChannel) -> bool) {
    let mut revisions = channel.revisions();
    while !pred(channel) {
        revisions.changed().await.expect("channel dropped while waiting");
    }
}
