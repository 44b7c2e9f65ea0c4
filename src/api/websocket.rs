//! WebSocket session transport
//!
//! One socket per client session. Text frames carry JSON envelopes and are
//! answered in arrival order on the same socket.

use super::{
    errors::ProtocolError,
    handlers::{dispatch, AppState},
    models::Envelope,
};
use crate::casino::CasinoService;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, error, info, warn};

/// Tracks connected sessions and serves each one
pub struct SessionHub {
    service: Arc<CasinoService>,
    client_count: AtomicU64,
    next_client_id: AtomicU64,
}

impl SessionHub {
    pub fn new(service: Arc<CasinoService>) -> Self {
        Self {
            service,
            client_count: AtomicU64::new(0),
            next_client_id: AtomicU64::new(1),
        }
    }

    pub fn handle_upgrade(self: Arc<Self>, ws: WebSocketUpgrade) -> Response {
        ws.on_upgrade(move |socket| async move { self.handle_connection(socket).await })
    }

    async fn handle_connection(&self, socket: WebSocket) {
        let client_id = format!("ws_{}", self.next_client_id.fetch_add(1, Ordering::SeqCst));
        let connected = self.client_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(client_id = %client_id, connected, "Client connected");

        let (mut sender, mut receiver) = socket.split();

        while let Some(msg) = receiver.next().await {
            let reply = match msg {
                Ok(Message::Text(text)) => {
                    debug!(client_id = %client_id, "Received frame");
                    self.handle_text(&text).await
                }
                Ok(Message::Binary(_)) => {
                    ProtocolError::MalformedFrame("binary frames are not supported".to_string()).into_envelope()
                }
                Ok(Message::Close(_)) => {
                    debug!(client_id = %client_id, "Client requested close");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!(client_id = %client_id, "WebSocket error: {}", e);
                    break;
                }
            };

            let text = match serde_json::to_string(&reply) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize reply: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                // Work already done (including any commit) stands; the reply is just lost
                debug!(client_id = %client_id, event = %reply.event, "Reply undeliverable");
                break;
            }
        }

        let remaining = self.client_count.fetch_sub(1, Ordering::SeqCst) - 1;
        info!(client_id = %client_id, remaining, "Client disconnected");
    }

    async fn handle_text(&self, text: &str) -> Envelope {
        match serde_json::from_str::<Envelope>(text) {
            Ok(envelope) => dispatch(&self.service, envelope).await,
            Err(e) => ProtocolError::MalformedFrame(e.to_string()).into_envelope(),
        }
    }
}

/// WebSocket endpoint handler
/// GET /ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    state.hub.clone().handle_upgrade(ws)
}
