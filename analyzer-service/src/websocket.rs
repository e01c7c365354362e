//! WebSocket delivery of document processing progress.
//!
//! Each connection is bound to a single document id. The server pushes one
//! JSON-serialized progress event per pipeline stage transition; anything
//! the client sends is treated as keep-alive traffic and ignored. Events
//! that could not be delivered are re-buffered so a reconnecting client
//! still receives them.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info};

use crate::models::ProgressUpdate;
use crate::progress::ProgressChannelManager;

/// Handle a progress WebSocket for one document.
///
/// Connects the document's progress channel (flushing any backlog), forwards
/// events until the client disconnects or a terminal event has been sent,
/// then releases the channel. An event the socket could not deliver goes
/// back into the backlog for the next connection.
pub async fn handle_progress_socket(
    socket: WebSocket,
    document_id: String,
    channels: Arc<ProgressChannelManager>,
) {
    let (conn_id, mut rx) = channels.connect(&document_id);
    info!(document_id = %document_id, conn_id, "Progress WebSocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut undelivered: Option<ProgressUpdate> = None;

    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else {
                    // Sender dropped: this connection was replaced.
                    debug!(document_id = %document_id, conn_id, "Progress channel replaced");
                    break;
                };
                let terminal = update.progress >= 1.0;
                let json = match serde_json::to_string(&update) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(document_id = %document_id, error = %e, "Failed to serialize progress event");
                        continue;
                    }
                };
                if ws_tx.send(Message::Text(json.into())).await.is_err() {
                    undelivered = Some(update);
                    break;
                }
                if terminal {
                    debug!(document_id = %document_id, conn_id, "Terminal event sent, closing socket");
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        info!(document_id = %document_id, conn_id, "Client disconnected");
                        break;
                    }
                    // Pings, pongs, and any client payloads are keep-alive.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    channels.disconnect(&document_id, conn_id);
    if let Some(update) = undelivered {
        // The remote never received it; buffer for the next connection.
        channels.send(&document_id, update);
    }
    info!(document_id = %document_id, conn_id, "Progress WebSocket closed");
}
