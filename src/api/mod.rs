//! HTTP API layer: health endpoint and internal push surface.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the HTTP router (everything except the WebSocket endpoint).
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::system::routes())
        .merge(handlers::notify::routes())
}
