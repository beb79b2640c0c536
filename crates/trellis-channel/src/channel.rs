//! Channel facade: the public contract the rest of the application uses.
//!
//! One [`AssistantChannel`] instance exclusively owns one conversation log
//! and at most one persistent connection. Every failure path inside `send`
//! terminates at this boundary — nothing propagates to the host as an
//! error, and the loading flag is never left stuck.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ChannelMode;
use crate::auth::CredentialSource;
use crate::config::ChannelConfig;
use crate::error::Result;
use crate::frame::{InboundFrame, OutboundFrame};
use crate::log::{ConversationLog, Role, Turn};
use crate::transport::{
    ConnectionState, Connector, Dialer, FallbackRequest, FallbackTransport, HttpFallback, WsDialer,
};

/// Shown when a send is attempted without a session.
const SIGN_IN_NOTICE: &str = "You must be signed in to talk to the assistant.";

/// Conversation state owned exclusively by one channel instance.
struct Shared {
    log: Mutex<ConversationLog>,
    loading: AtomicBool,
    mode: Mutex<ChannelMode>,
    /// Bumped on every log or loading change so hosts re-render on demand.
    revision: watch::Sender<u64>,
}

impl Shared {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn push(&self, turn: Turn) {
        self.log.lock().unwrap().push(turn);
        self.bump();
    }

    fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
        self.bump();
    }
}

/// Client-side realtime channel backing the in-app assistant.
pub struct AssistantChannel {
    shared: Arc<Shared>,
    connector: Connector,
    fallback: Arc<dyn FallbackTransport>,
    credentials: Arc<dyn CredentialSource>,
    decoder: JoinHandle<()>,
}

impl AssistantChannel {
    /// Create a channel with the production transports.
    ///
    /// No connection is opened until the first send; an unauthenticated or
    /// idle host never triggers network activity. Must be called within a
    /// tokio runtime.
    pub fn connect_lazy(config: ChannelConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        let fallback = Arc::new(HttpFallback::new(config.assistant_url.clone()));
        Self::with_transports(config, credentials, Arc::new(WsDialer::new()), fallback)
    }

    /// Create a channel with caller-supplied transports (tests, embedding).
    pub fn with_transports(
        config: ChannelConfig,
        credentials: Arc<dyn CredentialSource>,
        dialer: Arc<dyn Dialer>,
        fallback: Arc<dyn FallbackTransport>,
    ) -> Self {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            log: Mutex::new(ConversationLog::new()),
            loading: AtomicBool::new(false),
            mode: Mutex::new(config.default_mode),
            revision: watch::channel(0).0,
        });
        let connector = Connector::new(
            dialer,
            config.channel_url.clone(),
            config.connect_timeout(),
            config.handshake_grace(),
            frames_tx,
        );
        let decoder = tokio::spawn(Self::decode_loop(Arc::clone(&shared), frames_rx));

        Self { shared, connector, fallback, credentials, decoder }
    }

    /// Send one user turn to the assistant.
    ///
    /// Whitespace-only content is a complete no-op. Otherwise an optimistic
    /// user turn is appended before any network activity, then the send is
    /// routed over the persistent connection when available and the
    /// one-shot fallback otherwise. Never fails from the caller's
    /// perspective: every error ends as a system turn with loading cleared.
    pub async fn send(&self, content: &str) {
        if content.trim().is_empty() {
            return;
        }
        self.shared.push(Turn::user(content));
        self.shared.set_loading(true);

        if let Err(err) = self.dispatch(content).await {
            warn!("assistant send failed: {err}");
            self.shared.push(Turn::system(format!("Assistant error: {err}")));
            self.shared.set_loading(false);
        }
    }

    async fn dispatch(&self, content: &str) -> Result<()> {
        let Some(session) = self.credentials.session().await else {
            debug!("assistant send without a session");
            self.shared.push(Turn::system(SIGN_IN_NOTICE));
            self.shared.set_loading(false);
            return Ok(());
        };

        let mode = self.mode();
        if self.connector.ensure_connected(&session.access_token).await {
            let frame = serde_json::to_string(&OutboundFrame::Message {
                content: content.to_string(),
                mode,
            })?;
            match self.connector.write(frame).await {
                // Loading stays set; the done/error frame clears it.
                Ok(()) => return Ok(()),
                Err(degraded) => debug!("persistent send degraded: {degraded}"),
            }
        }

        let request = FallbackRequest { message: content.to_string(), mode };
        match self.fallback.exchange(&session.access_token, &request).await {
            Ok(reply) => {
                self.shared.push(Turn::assistant(reply.id, reply.message, reply.tool_calls));
            }
            Err(err) => {
                warn!("assistant fallback failed: {err}");
                self.shared.push(Turn::system(format!("Assistant error: {err}")));
            }
        }
        self.shared.set_loading(false);
        Ok(())
    }

    /// Snapshot of the conversation log.
    pub fn turns(&self) -> Vec<Turn> {
        self.shared.log.lock().unwrap().turns().to_vec()
    }

    /// Replace the conversation log with an empty sequence. Connection
    /// state is unaffected.
    pub fn clear(&self) {
        self.shared.log.lock().unwrap().clear();
        self.shared.bump();
    }

    /// Whether a send is awaiting its terminal frame or response.
    pub fn is_loading(&self) -> bool {
        self.shared.loading.load(Ordering::SeqCst)
    }

    /// Whether the persistent connection is open.
    pub fn is_connected(&self) -> bool {
        self.connector.is_connected()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connector.state()
    }

    /// Subscribe to connection state changes.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.connector.state_changes()
    }

    /// Subscribe to conversation revisions. The value bumps on every log or
    /// loading change; hosts re-render exactly when it does.
    pub fn revisions(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Mode forwarded with subsequent sends.
    pub fn mode(&self) -> ChannelMode {
        *self.shared.mode.lock().unwrap()
    }

    /// Switch the operating mode. In-flight sends are unaffected.
    pub fn set_mode(&self, mode: ChannelMode) {
        *self.shared.mode.lock().unwrap() = mode;
    }

    /// Tear down the persistent connection. Idempotent; the log remains
    /// readable and a later send may reconnect.
    pub async fn close(&self) {
        self.connector.close().await;
    }

    async fn decode_loop(shared: Arc<Shared>, mut frames: mpsc::UnboundedReceiver<String>) {
        while let Some(raw) = frames.recv().await {
            Self::apply_frame(&shared, &raw);
        }
    }

    /// Apply one inbound frame to the conversation state.
    ///
    /// Runs to completion synchronously; frames are applied strictly in
    /// arrival order. Malformed frames are dropped and logged, never fatal
    /// to the connection.
    fn apply_frame(shared: &Shared, raw: &str) {
        match InboundFrame::decode(raw) {
            Ok(InboundFrame::Message { id, role, content, timestamp, tool_calls }) => {
                shared.push(Turn {
                    id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    role: role.unwrap_or(Role::Assistant),
                    content: content.unwrap_or_default(),
                    timestamp: timestamp.unwrap_or_else(Utc::now),
                    tool_invocations: tool_calls,
                });
            }
            Ok(InboundFrame::ToolCall { message_id, tool_call }) => {
                let attached =
                    shared.log.lock().unwrap().attach_invocation(&message_id, tool_call);
                if attached {
                    shared.bump();
                } else {
                    // Raced ahead of its turn; dropped by design.
                    debug!("dropping tool_call for unknown turn {message_id}");
                }
            }
            Ok(InboundFrame::Error { error }) => {
                warn!("assistant stream error: {error}");
                shared.set_loading(false);
            }
            Ok(InboundFrame::Done) => shared.set_loading(false),
            Ok(InboundFrame::Unknown) => debug!("ignoring unknown frame type"),
            Err(err) => debug!("ignoring malformed frame: {err}"),
        }
    }
}

impl Drop for AssistantChannel {
    fn drop(&mut self) {
        self.decoder.abort();
        let connector = self.connector.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { connector.close().await });
        }
    }
}
