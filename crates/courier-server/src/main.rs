mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use courier_api::state::{AppState, AppStateInner};
use courier_api::{conversations, health, messages, send};
use courier_automation::Automation;
use courier_chatlog::ChatLogReader;
use courier_db::Database;
use courier_gateway::{Hub, connection};
use courier_sync::SyncEngine;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "courier=debug,courier_sync=debug,courier_api=debug,courier_gateway=debug,tower_http=debug".into()
                }),
        )
        .init();

    let config = Config::from_env()?;

    // Local store is fatal on failure; the foreign log may not exist yet
    let db = Arc::new(Database::open(&config.db_path)?);
    let chatlog = Arc::new(ChatLogReader::new(
        config.chat_db_path.clone(),
        config.service.clone(),
    ));
    let hub = Hub::new();
    let automation = Automation::new(config.send_retries, config.send_retry_delay);

    // Background sync loop
    let shutdown = CancellationToken::new();
    let engine = SyncEngine::new(
        db.clone(),
        chatlog.clone(),
        hub.clone(),
        config.poll_interval,
    );
    let sync_task = tokio::spawn(engine.run(shutdown.clone()));

    let state: AppState = Arc::new(AppStateInner {
        db,
        chatlog,
        automation,
        hub,
        history_limit: config.history_limit,
        typing_indicator: config.typing_indicator,
    });

    let app = Router::new()
        .route("/conversations", get(conversations::list))
        .route("/messages/{sender_id}", get(messages::history))
        .route("/send", post(send::send))
        .route("/typing", post(send::typing))
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Courier bridge listening on {}", addr);
    info!("Foreign log: {}", config.chat_db_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the poll loop before exiting so no cycle is cut mid-advance
    shutdown.cancel();
    let _ = sync_task.await;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| connection::handle_socket(socket, hub))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
