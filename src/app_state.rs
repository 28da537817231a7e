//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::CredentialVerifier;
use crate::config::GatewayConfig;
use crate::room::{Notifier, RoomRegistry};
use crate::store::SessionStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Gateway configuration loaded at startup.
    pub config: Arc<GatewayConfig>,
    /// Read-only session/participant store.
    pub store: Arc<dyn SessionStore>,
    /// Bearer-credential verifier.
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Live room membership.
    pub rooms: Arc<RoomRegistry>,
    /// Per-user notification groups.
    pub notifier: Arc<Notifier>,
}
