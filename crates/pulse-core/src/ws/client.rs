//! Single WebSocket session over `tokio-tungstenite`.
//!
//! A [`TextStream`] is one physical connection: it yields text frames until
//! the remote side goes away. It never reconnects on its own; reconnect
//! policy belongs to whoever owns the stream (see `pulse-md`'s stream
//! manager), which keeps a single long-lived feed alive across many
//! sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tracing::{debug, warn};

use crate::error::MarketDataError;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// An open streaming connection yielding text frames.
#[async_trait]
pub trait TextStream: Send {
    /// Next text frame.
    ///
    /// `None` means the remote closed the connection; `Some(Err(_))` is a
    /// transport fault, after which the stream should be treated as closed.
    async fn next_text(&mut self) -> Option<Result<String, MarketDataError>>;

    /// Close with a normal-closure code. Errors are logged, not returned.
    async fn close(&mut self);
}

/// Opens streaming connections.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn TextStream>, MarketDataError>;
}

/// Configuration shared by every connection a [`WsConnector`] opens.
#[derive(Debug, Clone, Default)]
pub struct WsConnConfig {
    /// Extra HTTP headers for the handshake.
    pub extra_headers: HashMap<String, String>,
}

/// Production connector (TLS via native-tls).
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    config: WsConnConfig,
}

impl WsConnector {
    pub fn new(config: WsConnConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StreamConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn TextStream>, MarketDataError> {
        let stream = connect_ws(url, &self.config).await?;
        Ok(Box::new(WsTextStream {
            url: url.to_string(),
            inner: stream,
        }))
    }
}

/// A live tungstenite connection.
pub struct WsTextStream {
    url: String,
    inner: WsStream,
}

#[async_trait]
impl TextStream for WsTextStream {
    async fn next_text(&mut self) -> Option<Result<String, MarketDataError>> {
        loop {
            match self.inner.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text.to_string())),
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.inner.send(Message::Pong(data)).await {
                        return Some(Err(MarketDataError::WebSocket(e.to_string())));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("[ws] {} received close frame: {frame:?}", self.url);
                    return None;
                }
                Some(Ok(_)) => {} // binary, pong, raw frames
                Some(Err(e)) => return Some(Err(MarketDataError::WebSocket(e.to_string()))),
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: Utf8Bytes::from_static(""),
        };
        if let Err(e) = self.inner.close(Some(frame)).await {
            warn!("[ws] {} close failed: {e}", self.url);
        }
    }
}

/// Establish a (TLS) WebSocket connection.
async fn connect_ws(url: &str, config: &WsConnConfig) -> Result<WsStream, MarketDataError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| MarketDataError::WebSocket(e.to_string()))?;

    for (key, value) in &config.extra_headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| MarketDataError::Config(format!("header {key}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| MarketDataError::Config(format!("header {key}: {e}")))?;
        request.headers_mut().insert(name, value);
    }

    let (stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| MarketDataError::WebSocket(e.to_string()))?;
    Ok(stream)
}
