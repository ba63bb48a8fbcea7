//! Shared fixtures for async tests: an in-process WebSocket server that
//! speaks the channel handshake, plus small timing helpers.

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use waypoint_config::{ChannelSettings, ReconnectSettings, TransportName};

use crate::channel::{ChannelSession, ConnectionState};
use crate::protocol::{events, Frame};

pub(crate) const VALID_TOKEN: &str = "valid-token";

// ---------------------------------------------------------------------------
// In-process WebSocket server
// ---------------------------------------------------------------------------

/// One accepted, handshaken connection as seen by the server side.
pub(crate) struct TestConn {
    pub(crate) hello: Frame,
    pub(crate) incoming: mpsc::UnboundedReceiver<Frame>,
    /// Dropping this closes the connection from the server side.
    pub(crate) outgoing: mpsc::UnboundedSender<Frame>,
}

pub(crate) async fn spawn_ws_server() -> (String, mpsc::UnboundedReceiver<TestConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (conn_tx, conn_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream, conn_tx.clone()));
        }
    });
    (format!("ws://{addr}/live"), conn_rx)
}

fn text(frame: &Frame) -> Message {
    Message::Text(serde_json::to_string(frame).unwrap().into())
}

async fn serve(stream: TcpStream, conn_tx: mpsc::UnboundedSender<TestConn>) {
    let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let (mut sink, mut stream) = ws.split();

    let hello: Frame = match stream.next().await {
        Some(Ok(Message::Text(raw))) => serde_json::from_str(&raw).unwrap(),
        _ => return,
    };
    if hello.data["auth"]["token"] != VALID_TOKEN {
        let reject = Frame::new(events::CONNECT_ERROR, json!({ "message": "invalid token" }));
        let _ = sink.send(text(&reject)).await;
        let _ = sink.close().await;
        return;
    }
    if sink
        .send(text(&Frame::new(events::CONNECT, serde_json::Value::Null)))
        .await
        .is_err()
    {
        return;
    }

    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let conn = TestConn {
        hello,
        incoming: in_rx,
        outgoing: out_tx,
    };
    if conn_tx.send(conn).is_err() {
        return;
    }

    loop {
        tokio::select! {
            frame = out_rx.recv() => match frame {
                Some(frame) => {
                    if sink.send(text(&frame)).await.is_err() {
                        return;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    return;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(raw))) => {
                    if let Ok(frame) = serde_json::from_str::<Frame>(&raw) {
                        let _ = in_tx.send(frame);
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn settings(endpoint: &str, transports: Vec<TransportName>) -> ChannelSettings {
    ChannelSettings {
        endpoint: endpoint.to_string(),
        transports,
        connect_timeout_secs: 2,
        keepalive_secs: 0,
        poll_interval_ms: 20,
        reconnect: ReconnectSettings::default(),
    }
}

pub(crate) fn ws_only(endpoint: &str) -> ChannelSettings {
    settings(endpoint, vec![TransportName::Websocket])
}

pub(crate) async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

pub(crate) async fn wait_for_state(session: &ChannelSession, state: ConnectionState) {
    let mut rx = session.watch_status();
    within(rx.wait_for(|status| status.state == state))
        .await
        .unwrap();
}

/// A port nothing listens on.
pub(crate) async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/live")
}
