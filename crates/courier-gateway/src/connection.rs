use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::hub::Hub;

/// Drive one WebSocket subscriber: forward every broadcast event as a JSON
/// text frame until the peer goes away, then drop its membership.
pub async fn handle_socket(socket: WebSocket, hub: Hub) {
    let (id, mut events) = hub.subscribe().await;
    info!(
        "WebSocket client {} connected ({} total)",
        id,
        hub.client_count().await
    );

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode event: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        // Clients have nothing to say yet; keep the frame
                        // visible in debug logs
                        debug!("Ignoring client frame: {}", text);
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unsubscribe(id).await;
    info!(
        "WebSocket client {} disconnected ({} total)",
        id,
        hub.client_count().await
    );
}
