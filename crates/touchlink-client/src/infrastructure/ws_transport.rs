//! WebSocket transport: JSON text frames for control, 4-byte binary frames
//! for motion.
//!
//! The conversion between [`ClientMessage`]/[`ServerMessage`] and frames
//! lives in `touchlink-core`; this file only moves tungstenite messages.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info};
use touchlink_core::{ClientMessage, ServerMessage, WireFrame};

use crate::application::transport::Transport;
use crate::domain::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
pub struct WsTransport {
    stream: WsStream,
    url: String,
}

impl WsTransport {
    /// Performs the WebSocket handshake with `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the TCP connection or the upgrade
    /// fails.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let (stream, _response) = connect_async(url).await.map_err(|e| ClientError::Connect {
            target: url.to_owned(),
            reason: e.to_string(),
        })?;
        info!("WebSocket transport connected to {url}");
        Ok(Self {
            stream,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, message: ClientMessage) -> Result<(), ClientError> {
        let frame = match message.to_frame()? {
            WireFrame::Text(text) => WsMessage::Text(text),
            WireFrame::Binary(bytes) => WsMessage::Binary(bytes),
        };
        self.stream.send(frame).await.map_err(ws_error)
    }

    async fn recv(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        let frame = match self.stream.next().await {
            Some(Ok(WsMessage::Text(text))) => WireFrame::Text(text),
            Some(Ok(WsMessage::Binary(bytes))) => WireFrame::Binary(bytes),
            Some(Ok(WsMessage::Close(_))) | None => return Err(ClientError::Closed),
            // tungstenite answers protocol pings itself.
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {
                return Ok(None)
            }
            Some(Err(e)) => return Err(ws_error(e)),
        };

        match ServerMessage::from_frame(&frame) {
            Ok(message) => Ok(message),
            Err(e) => {
                debug!("ignoring unreadable frame from {}: {e}", self.url);
                Ok(None)
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("close handshake with {} failed: {e}", self.url);
        }
    }
}

fn ws_error(e: WsError) -> ClientError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => ClientError::Closed,
        other => ClientError::WebSocket(other.to_string()),
    }
}
