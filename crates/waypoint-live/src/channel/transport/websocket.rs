//! Primary duplex transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use waypoint_common::ChannelError;
use waypoint_config::ChannelSettings;

use super::{ConnectFailure, FrameSink, Inbound, Link, INBOUND_CAPACITY};
use crate::auth::AuthToken;
use crate::channel::types::TransportKind;
use crate::protocol::{events, Frame};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connect, send the `connect` frame, and wait for the verdict.
pub(super) async fn connect(
    settings: &ChannelSettings,
    token: &AuthToken,
) -> Result<Link, ConnectFailure> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(settings.endpoint.as_str())
        .await
        .map_err(|e| ConnectFailure::Unavailable(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    let hello = serde_json::to_string(&Frame::handshake(token))
        .map_err(|e| ConnectFailure::Unavailable(e.to_string()))?;
    write
        .send(WsMessage::Text(hello.into()))
        .await
        .map_err(|e| ConnectFailure::Unavailable(e.to_string()))?;

    loop {
        match read.next().await {
            Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<Frame>(&text) {
                Ok(frame) if frame.is(events::CONNECT) => break,
                Ok(frame) if frame.is(events::CONNECT_ERROR) => {
                    return Err(ConnectFailure::Rejected(frame.error_message()));
                }
                Ok(frame) => debug!(event = %frame.event, "Ignoring frame before handshake"),
                Err(e) => debug!(error = %e, "Dropping malformed frame during handshake"),
            },
            // Only `connect_error` is a verdict; a bare close lets the next transport try.
            Some(Ok(WsMessage::Close(_))) | None => {
                return Err(ConnectFailure::Unavailable(
                    "connection closed during handshake".to_string(),
                ));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(ConnectFailure::Unavailable(e.to_string())),
        }
    }

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let reader = tokio::spawn(read_loop(read, inbound_tx));
    Ok(Link {
        kind: TransportKind::WebSocket,
        sink: Box::new(WsSink { write }),
        inbound: inbound_rx,
        reader,
    })
}

async fn read_loop(mut read: SplitStream<WsStream>, inbound_tx: mpsc::Sender<Inbound>) {
    let reason = loop {
        match read.next().await {
            Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<Frame>(&text) {
                Ok(frame) => {
                    if inbound_tx.send(Inbound::Frame(frame)).await.is_err() {
                        return;
                    }
                }
                Err(e) => debug!(error = %e, "Dropping malformed frame"),
            },
            Some(Ok(WsMessage::Close(_))) => break "server closed connection".to_string(),
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket error");
                break e.to_string();
            }
            None => break "stream ended".to_string(),
        }
    };
    let _ = inbound_tx.send(Inbound::Closed(reason)).await;
}

struct WsSink {
    write: SplitSink<WsStream, WsMessage>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        let json = serde_json::to_string(frame)?;
        self.write
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn keepalive(&mut self) -> Result<(), ChannelError> {
        self.write
            .send(WsMessage::Ping(Default::default()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.write.send(WsMessage::Close(None)).await;
        let _ = self.write.close().await;
    }
}
