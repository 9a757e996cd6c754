//! HTTP/WebSocket API layer.
//!
//! Thin handlers around the channel hub: remote clients attach to session
//! topics through the WebSocket relay; a small REST surface exposes room
//! occupancy for monitoring.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::channel::{LocalChannelHub, RoomSummary};
use crate::state::Config;
use crate::utils::now_millis;

pub mod ws;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve on the TCP listener.
    #[error("Failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// Topic hub all relay connections attach to.
    pub hub: Arc<LocalChannelHub>,
    /// Session configuration (room capacity, intervals).
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates the state with a hub sized from the configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let hub = LocalChannelHub::new(config.max_peers_per_topic);
        Self {
            hub,
            config: Arc::new(config),
        }
    }
}

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rooms", get(list_rooms))
        .route("/ws/video/{stream_id}", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the relay server on the given address.
///
/// # Errors
///
/// Returns `Bind` when the listener cannot be bound or serving fails.
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Relay listening on http://{}", addr);
    let app = create_router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Liveness probe.
async fn health_check() -> &'static str {
    "ok"
}

/// Snapshot of the active session topics.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomsResponse {
    rooms: Vec<RoomSummary>,
    /// Unix timestamp in milliseconds.
    timestamp: u64,
}

/// Lists active session topics with member counts.
async fn list_rooms(State(state): State<AppState>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: state.hub.room_summaries(),
        timestamp: now_millis(),
    })
}
