use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{interval_at, Instant};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct Heartbeat {
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: i64,
}

fn heartbeat(now: DateTime<Utc>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Heartbeat {
        kind: "heartbeat",
        timestamp: now.timestamp(),
    })
}

#[tracing::instrument(skip(upgrade))]
pub async fn handler(upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(keep_alive)
}

/// Sends a heartbeat every interval until the client leaves. Client
/// messages are read and dropped.
async fn keep_alive(mut socket: WebSocket) {
    tracing::debug!("websocket connected");
    let mut ticker = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let message = match heartbeat(Utc::now()) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!("failed to encode heartbeat: {}", e);
                        break;
                    }
                };
                if socket.send(Message::Text(message)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("websocket closed");
}
