use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::rig::RigId;
use crate::state::{ClientEvent, SharedSiteState};

/// Messages a browser client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// `KeyboardEvent.code` press/release.
    Key { code: String, down: bool },
    /// Switch input focus; `null` releases it.
    Focus { rig: Option<u32> },
    Ping,
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Option<Self> {
        serde_json::from_str(txt).ok()
    }

    fn into_event(self) -> Option<ClientEvent> {
        match self {
            ClientMessage::Key { code, down } => Some(ClientEvent::Key { code, down }),
            ClientMessage::Focus { rig } => Some(ClientEvent::Focus(rig.map(RigId))),
            ClientMessage::Ping => None,
        }
    }
}

pub async fn start_websocket_server(bind_address: String, state: Arc<Mutex<SharedSiteState>>) -> std::io::Result<()> {
    let listener = TcpListener::bind(&bind_address).await?;

    info!("🌐 WebSocket listening on ws://{}", bind_address);

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let state_clone = Arc::clone(&state);

        tokio::spawn(async move {
            let ws = match accept_async(raw).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!(%peer, "websocket handshake failed: {}", e);
                    return;
                }
            };
            let (mut write, mut read) = ws.split();

            // -------------------------------
            // 1) Create outgoing message channel
            // -------------------------------
            let (tx, mut rx) = mpsc::unbounded_channel::<String>();

            {
                let mut site = state_clone.lock().await;
                site.register_client(tx.clone());
            }

            // -------------------------------
            // 2) Spawn send-loop task
            // -------------------------------
            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if write.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
            });

            let client_id = Uuid::new_v4();
            info!(%peer, "🟢 Client connected: {}", client_id);

            let welcome = serde_json::json!({ "type": "welcome", "client_id": client_id.to_string() });
            let _ = tx.send(welcome.to_string());

            // -------------------------------
            // 3) Main receive loop
            // -------------------------------
            while let Some(msg) = read.next().await {
                let msg = match msg {
                    Ok(m) => m,
                    Err(_) => break,
                };

                if !msg.is_text() {
                    continue;
                }
                let text = match msg.to_text() {
                    Ok(t) => t,
                    Err(_) => continue,
                };

                let Some(parsed) = ClientMessage::from_json(text) else {
                    debug!(%client_id, "ignoring unparseable message");
                    continue;
                };

                if parsed == ClientMessage::Ping {
                    let _ = tx.send(r#"{"type":"pong"}"#.into());
                    continue;
                }

                if let Some(event) = parsed.into_event() {
                    state_clone.lock().await.push_event(event);
                }
            }

            info!("🔴 Client disconnected: {}", client_id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_message() {
        let msg = ClientMessage::from_json(r#"{"type":"key","code":"KeyW","down":true}"#).unwrap();
        assert_eq!(msg, ClientMessage::Key { code: "KeyW".into(), down: true });
    }

    #[test]
    fn test_parse_focus_and_ping() {
        let msg = ClientMessage::from_json(r#"{"type":"focus","rig":1}"#).unwrap();
        assert_eq!(msg.into_event(), Some(ClientEvent::Focus(Some(RigId(1)))));
        let msg = ClientMessage::from_json(r#"{"type":"focus","rig":null}"#).unwrap();
        assert_eq!(msg.into_event(), Some(ClientEvent::Focus(None)));
        assert_eq!(ClientMessage::from_json(r#"{"type":"ping"}"#), Some(ClientMessage::Ping));
    }

    #[test]
    fn test_unknown_message_is_ignored() {
        assert!(ClientMessage::from_json(r#"{"type":"input","throttle":1.0}"#).is_none());
        assert!(ClientMessage::from_json("not json").is_none());
    }
}
