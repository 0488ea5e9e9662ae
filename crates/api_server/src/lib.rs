//! HTTP and websocket surface.
//!
//! Thin I/O layer over the rest of the workspace: REST CRUD for user
//! records maps straight onto coordination store reads and writes, player
//! presence endpoints read the in-memory registry, and the websocket routes
//! relay bytes back to the sender. No business logic lives here.

pub mod error;
pub mod players;
pub mod relay;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use state::AppState;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/players", get(players::list_players))
        .route("/players/:id", get(players::find_player))
        .route(
            "/users",
            get(users::find_all_users).post(users::create_user),
        )
        .route(
            "/users/:id",
            get(users::find_user)
                .put(users::update_user)
                .delete(users::remove_user),
        )
        .route("/ws", get(relay::relay_handler))
        .route("/player/ws", get(relay::relay_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the router until the shutdown future resolves.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    version: &'static str,
    players_total: usize,
    players_online: usize,
    relay_connections: usize,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION"),
        players_total: state.registry.len(),
        players_online: state.registry.online_count(),
        relay_connections: state.relay_connections.load(Ordering::Relaxed),
    })
}
