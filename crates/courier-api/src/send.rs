use axum::Json;
use axum::extract::State;
use tracing::info;

use courier_types::api::{SendRequest, SendResponse, TypingRequest};
use courier_types::events::BridgeEvent;
use courier_types::models::Direction;

use crate::error::{ApiError, join_error};
use crate::state::AppState;

/// POST /send: deliver through the automation channel; persist as Outbound
/// and fan out a `message_sent` event only once delivery succeeded.
pub async fn send(
    State(state): State<AppState>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    if req.recipient.is_empty() || req.message.is_empty() {
        return Err(ApiError::BadRequest(
            "recipient and message required".into(),
        ));
    }

    if !state.automation.send_message(&req.recipient, &req.message).await {
        return Err(ApiError::DeliveryFailed("failed to send message".into()));
    }

    let db = state.db.clone();
    let recipient = req.recipient.clone();
    let text = req.message.clone();
    let message =
        tokio::task::spawn_blocking(move || db.insert_message(&recipient, &text, Direction::Outbound))
            .await
            .map_err(join_error)??;

    state.hub.broadcast(BridgeEvent::from_message(&message)).await;

    info!("Delivered message to {}", req.recipient);
    Ok(Json(SendResponse { success: true }))
}

/// POST /typing drives the typing-indicator automation: `active` shows the
/// placeholder dot for the recipient, `!active` clears the compose field.
pub async fn typing(
    State(state): State<AppState>,
    Json(req): Json<TypingRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    if !state.typing_indicator {
        return Err(ApiError::BadRequest("typing indicator disabled".into()));
    }
    if req.active && req.recipient.is_empty() {
        return Err(ApiError::BadRequest("recipient required".into()));
    }

    let ok = if req.active {
        state.automation.show_typing_indicator(&req.recipient).await
    } else {
        state.automation.clear_compose().await
    };

    if !ok {
        return Err(ApiError::DeliveryFailed(
            "failed to update typing indicator".into(),
        ));
    }

    Ok(Json(SendResponse { success: true }))
}
