use axum::Json;
use axum::extract::{Path, State};

use courier_types::api::{MessageView, MessagesResponse};

use crate::error::{ApiError, join_error};
use crate::state::AppState;

/// GET /messages/{sender_id}: locally persisted history for one
/// conversation, oldest first, capped at the configured window.
pub async fn history(
    State(state): State<AppState>,
    Path(sender_id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let db = state.db.clone();
    let limit = state.history_limit;
    let key = sender_id.clone();

    let rows = tokio::task::spawn_blocking(move || db.history(&key, limit))
        .await
        .map_err(join_error)??;

    let messages = rows.iter().map(MessageView::from_message).collect();

    Ok(Json(MessagesResponse {
        sender_id,
        messages,
    }))
}
