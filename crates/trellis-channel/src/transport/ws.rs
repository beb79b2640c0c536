//! WebSocket implementation of the persistent transport.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::{Connection, Dialer, FrameSink, FrameSource};
use crate::error::{Degraded, DialError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dialer for the production WebSocket transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

impl WsDialer {
    /// Create a new dialer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, endpoint: &str, bearer: &str) -> Result<Connection, DialError> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| DialError(format!("invalid channel endpoint: {e}")))?;
        let auth = format!("Bearer {bearer}")
            .parse()
            .map_err(|_| DialError("bearer token is not a valid header value".to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| DialError(format!("websocket handshake failed: {e}")))?;
        let (sink, source) = stream.split();

        Ok(Connection {
            sink: Box::new(WsSink { inner: sink }),
            source: Box::new(WsSource { inner: source }),
        })
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: String) -> Result<(), Degraded> {
        self.inner
            .send(Message::Text(frame))
            .await
            .map_err(|e| Degraded::WriteFailed(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close().await {
            debug!("websocket close failed: {e}");
        }
    }
}

struct WsSource {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next(&mut self) -> Option<String> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Close(_)) => return None,
                // tungstenite answers pings internally.
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(other) => debug!("ignoring non-text websocket frame: {other:?}"),
                Err(e) => {
                    debug!("websocket read error: {e}");
                    return None;
                }
            }
        }
    }
}
