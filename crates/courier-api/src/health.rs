use axum::Json;
use axum::extract::State;

use courier_types::api::HealthResponse;

use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        clients: state.hub.client_count().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use courier_automation::Automation;
    use courier_chatlog::ChatLogReader;
    use courier_db::Database;
    use courier_gateway::Hub;

    use crate::state::AppStateInner;

    #[tokio::test]
    async fn health_reports_client_count() {
        let state: AppState = Arc::new(AppStateInner {
            db: Arc::new(Database::open(Path::new(":memory:")).unwrap()),
            chatlog: Arc::new(ChatLogReader::new("/nonexistent/chat.db", "iMessage")),
            automation: Automation::new(3, Duration::from_secs(1)),
            hub: Hub::new(),
            history_limit: 100,
            typing_indicator: true,
        });

        let (_id, _rx) = state.hub.subscribe().await;
        let response = health(State(state)).await.0;

        assert_eq!(response.status, "ok");
        assert_eq!(response.clients, 1);
    }
}
