//! Internal push surface for the platform's mutation path.
//!
//! When a host approves or rejects a join request (or a new request
//! arrives), the platform backend calls this endpoint to push the event
//! into the target user's notification group. This is service-to-service
//! traffic guarded by a shared secret; it is never exposed to clients.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::GatewayError;
use crate::ws::messages::ServerEvent;

/// Header carrying the shared internal secret.
const INTERNAL_TOKEN_HEADER: &str = "x-internal-token";

/// Events the platform may push into a user's notification group.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PushEvent {
    /// Admission decision or status change for the target user.
    AdmissionStatus {
        /// One of `pending`, `approved`, `rejected`, `not-registered`.
        status: String,
        /// Human-readable explanation.
        message: String,
        /// Session the status applies to.
        #[serde(default)]
        session_id: Option<String>,
    },
    /// A join request arrived for a session the target user hosts.
    NewJoinRequest {
        /// Participant row id of the request.
        participant_id: i64,
        /// Requesting user's display name.
        user_name: String,
        /// Requesting user's id.
        user_id: i64,
    },
    /// A join request visible to the target user changed status.
    JoinRequestUpdated {
        /// Participant row id of the request.
        participant_id: i64,
        /// Requesting user's display name.
        user_name: String,
        /// New status string.
        status: String,
    },
}

impl From<PushEvent> for ServerEvent {
    fn from(event: PushEvent) -> Self {
        match event {
            PushEvent::AdmissionStatus {
                status,
                message,
                session_id,
            } => Self::AdmissionStatus {
                status,
                message,
                session_id,
            },
            PushEvent::NewJoinRequest {
                participant_id,
                user_name,
                user_id,
            } => Self::NewJoinRequest {
                participant_id,
                user_name,
                user_id,
            },
            PushEvent::JoinRequestUpdated {
                participant_id,
                user_name,
                status,
            } => Self::JoinRequestUpdated {
                participant_id,
                user_name,
                status,
            },
        }
    }
}

/// Push request body.
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    /// Target user whose connections should receive the event.
    pub user_id: i64,
    /// Event to deliver.
    pub event: PushEvent,
}

/// Push response body.
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    /// Number of open connections the event was queued for. Zero is not
    /// an error: the user may simply have no connection right now.
    pub delivered: usize,
}

/// `POST /internal/notifications`: deliver an event to one user's
/// notification group.
///
/// # Errors
///
/// Returns [`GatewayError::Unauthorized`] when the shared-secret header
/// is missing or wrong, and [`GatewayError::InvalidRequest`] when the
/// body does not decode as a push request.
pub async fn notify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Json<NotifyResponse>, GatewayError> {
    let presented = headers
        .get(INTERNAL_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if presented != Some(state.config.internal_api_token.as_str()) {
        return Err(GatewayError::Unauthorized);
    }
    let Json(request) = payload.map_err(|err| GatewayError::InvalidRequest(err.body_text()))?;

    let event = ServerEvent::from(request.event);
    let delivered = state.notifier.push(request.user_id, &event);
    tracing::debug!(user_id = request.user_id, delivered, "notification pushed");
    Ok(Json(NotifyResponse { delivered }))
}

/// Internal routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/internal/notifications", post(notify_handler))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::*;
    use crate::auth::JwtVerifier;
    use crate::config::GatewayConfig;
    use crate::room::{Notifier, RoomRegistry};
    use crate::store::InMemoryStore;

    fn test_state() -> AppState {
        let config = GatewayConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap_or_else(|_| unreachable!()),
            database_url: String::new(),
            database_max_connections: 1,
            database_connect_timeout_secs: 1,
            jwt_secret: "secret".to_string(),
            internal_api_token: "hush".to_string(),
            handshake_timeout_secs: 5,
            outbound_queue_capacity: 16,
        };
        AppState {
            config: Arc::new(config),
            store: Arc::new(InMemoryStore::new()),
            verifier: Arc::new(JwtVerifier::new("secret")),
            rooms: Arc::new(RoomRegistry::new()),
            notifier: Arc::new(Notifier::new()),
        }
    }

    fn with_token(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = token.parse() {
            headers.insert(INTERNAL_TOKEN_HEADER, value);
        }
        headers
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let state = test_state();
        let request = NotifyRequest {
            user_id: 7,
            event: PushEvent::AdmissionStatus {
                status: "approved".to_string(),
                message: String::new(),
                session_id: Some("s1".to_string()),
            },
        };
        let result = notify_handler(State(state), with_token("wrong"), Ok(Json(request))).await;
        assert!(matches!(result, Err(GatewayError::Unauthorized)));
    }

    #[tokio::test]
    async fn push_reaches_subscribed_connections() {
        let state = test_state();
        let (tx, mut rx) = mpsc::channel(4);
        state.notifier.subscribe(7, 100, tx);

        let request = NotifyRequest {
            user_id: 7,
            event: PushEvent::AdmissionStatus {
                status: "approved".to_string(),
                message: "you're in".to_string(),
                session_id: Some("s1".to_string()),
            },
        };
        let Ok(Json(response)) =
            notify_handler(State(state), with_token("hush"), Ok(Json(request))).await
        else {
            panic!("push failed");
        };
        assert_eq!(response.delivered, 1);

        match rx.try_recv() {
            Ok(ServerEvent::AdmissionStatus { status, .. }) => assert_eq!(status, "approved"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_to_offline_user_delivers_zero() {
        let state = test_state();
        let request = NotifyRequest {
            user_id: 99,
            event: PushEvent::NewJoinRequest {
                participant_id: 5,
                user_name: "bob".to_string(),
                user_id: 8,
            },
        };
        let Ok(Json(response)) =
            notify_handler(State(state), with_token("hush"), Ok(Json(request))).await
        else {
            panic!("push failed");
        };
        assert_eq!(response.delivered, 0);
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let app = routes().with_state(test_state());
        let Ok(request) = Request::builder()
            .method("POST")
            .uri("/internal/notifications")
            .header("content-type", "application/json")
            .header(INTERNAL_TOKEN_HEADER, "hush")
            .body(Body::from("{not json"))
        else {
            panic!("request build failed");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("router failed");
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn push_events_map_onto_server_events() {
        let event = PushEvent::JoinRequestUpdated {
            participant_id: 5,
            user_name: "bob".to_string(),
            status: "approved".to_string(),
        };
        match ServerEvent::from(event) {
            ServerEvent::JoinRequestUpdated { participant_id, .. } => {
                assert_eq!(participant_id, 5);
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }
}
