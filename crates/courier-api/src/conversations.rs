use axum::Json;
use axum::extract::State;

use courier_types::models::Conversation;

use crate::error::{ApiError, join_error};
use crate::state::AppState;

/// GET /conversations: every reachable counterparty in the foreign log,
/// most recently active first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Conversation>>, ApiError> {
    let chatlog = state.chatlog.clone();

    let conversations = tokio::task::spawn_blocking(move || chatlog.list_conversations())
        .await
        .map_err(join_error)??;

    Ok(Json(conversations))
}
