//! Axum WebSocket upgrade handler.
//!
//! The upgrade request is the only place the handshake's query string,
//! headers, and cookies are visible, so the bearer credential is
//! captured here and handed to the connection task.

use std::collections::HashMap;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum_extra::extract::CookieJar;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::auth;

/// `GET /ws/{session_code}`: upgrade to a signaling connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_code): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    cookies: CookieJar,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let token = auth::credential(&query, &headers, &cookies);
    ws.on_upgrade(move |socket| run_connection(socket, session_code, token, state))
}
