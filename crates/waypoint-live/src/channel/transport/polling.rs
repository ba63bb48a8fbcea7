//! HTTP long-polling fallback over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use waypoint_common::ChannelError;
use waypoint_config::ChannelSettings;

use super::{ConnectFailure, FrameSink, Inbound, Link, INBOUND_CAPACITY};
use crate::auth::AuthToken;
use crate::channel::types::TransportKind;
use crate::protocol::Frame;

#[derive(Deserialize)]
struct HandshakeReply {
    sid: String,
}

/// Map the WebSocket endpoint onto its HTTP base URL.
pub(super) fn polling_base(endpoint: &str) -> String {
    let base = if let Some(rest) = endpoint.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("ws://") {
        format!("http://{rest}")
    } else {
        endpoint.to_string()
    };
    base.trim_end_matches('/').to_string()
}

pub(super) async fn connect(
    settings: &ChannelSettings,
    token: &AuthToken,
) -> Result<Link, ConnectFailure> {
    let http = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout())
        .build()
        .map_err(|e| ConnectFailure::Unavailable(e.to_string()))?;
    let base = polling_base(&settings.endpoint);

    let resp = http
        .post(format!("{base}/handshake"))
        .json(&Frame::handshake(token))
        .send()
        .await
        .map_err(|e| ConnectFailure::Unavailable(e.to_string()))?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(ConnectFailure::Rejected(message));
    }
    if !status.is_success() {
        return Err(ConnectFailure::Unavailable(format!("HTTP {status}")));
    }
    let reply: HandshakeReply = resp
        .json()
        .await
        .map_err(|e| ConnectFailure::Unavailable(format!("bad handshake reply: {e}")))?;

    let session_url = format!("{base}/poll?sid={}", reply.sid);
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let reader = tokio::spawn(poll_loop(
        http.clone(),
        session_url.clone(),
        settings.poll_interval(),
        inbound_tx,
    ));

    Ok(Link {
        kind: TransportKind::Polling,
        sink: Box::new(PollSink {
            http,
            url: session_url,
        }),
        inbound: inbound_rx,
        reader,
    })
}

async fn poll_loop(
    http: reqwest::Client,
    url: String,
    idle: Duration,
    inbound_tx: mpsc::Sender<Inbound>,
) {
    let reason = loop {
        let resp = match http.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "Poll request failed");
                break e.to_string();
            }
        };
        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            break "polling session expired".to_string();
        }
        if !status.is_success() {
            break format!("poll failed: HTTP {status}");
        }

        let batch = match resp.json::<Vec<serde_json::Value>>().await {
            Ok(batch) => batch,
            Err(e) => {
                debug!(error = %e, "Dropping malformed poll batch");
                Vec::new()
            }
        };
        if batch.is_empty() {
            tokio::time::sleep(idle).await;
            continue;
        }
        for value in batch {
            match serde_json::from_value::<Frame>(value) {
                Ok(frame) => {
                    if inbound_tx.send(Inbound::Frame(frame)).await.is_err() {
                        return;
                    }
                }
                Err(e) => debug!(error = %e, "Dropping malformed frame"),
            }
        }
    };
    let _ = inbound_tx.send(Inbound::Closed(reason)).await;
}

struct PollSink {
    http: reqwest::Client,
    url: String,
}

#[async_trait]
impl FrameSink for PollSink {
    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&[frame])
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Transport(format!(
                "send failed: HTTP {}",
                resp.status()
            )))
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.http.delete(&self.url).send().await {
            debug!(error = %e, "Polling close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_follows_scheme() {
        assert_eq!(polling_base("ws://127.0.0.1:3000/live"), "http://127.0.0.1:3000/live");
        assert_eq!(polling_base("wss://example.com/live/"), "https://example.com/live");
    }
}
