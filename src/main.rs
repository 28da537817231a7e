//! focusroom-gateway server entry point.
//!
//! Starts the Axum HTTP server with the signaling WebSocket endpoint and
//! the internal HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use focusroom_gateway::api;
use focusroom_gateway::app_state::AppState;
use focusroom_gateway::auth::JwtVerifier;
use focusroom_gateway::config::GatewayConfig;
use focusroom_gateway::room::{Notifier, RoomRegistry};
use focusroom_gateway::store::PostgresStore;
use focusroom_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting focusroom-gateway");

    // Connect to the platform's session store (read-only)
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await?;

    // Build application state
    let app_state = AppState {
        verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
        store: Arc::new(PostgresStore::new(pool)),
        rooms: Arc::new(RoomRegistry::new()),
        notifier: Arc::new(Notifier::new()),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws/{session_code}", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
