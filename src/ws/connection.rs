//! Per-connection state machine and signaling relay.
//!
//! Lifecycle: connecting → admitted → relaying → closed, with terminal
//! detours for every non-approved admission outcome. Handshake and
//! admission errors are fatal to the connection; per-message errors
//! while relaying are logged and dropped without tearing anything down.
//! Cleanup runs unconditionally on the way out, whatever path closed
//! the connection.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use super::admission::{self, AdmissionOutcome};
use super::close;
use super::messages::{ClientEnvelope, ServerEvent};
use crate::app_state::AppState;
use crate::auth::{Identity, UserProfile};
use crate::room::{ConnectionId, Notifier, RoomRegistry};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

type WsSink = SplitSink<WebSocket, Message>;

/// Runs one WebSocket connection from handshake to close.
///
/// `token` is the credential captured from the upgrade request, if any;
/// identity is resolved from it exactly once and frozen afterwards.
pub async fn run_connection(
    socket: WebSocket,
    session_code: String,
    token: Option<String>,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Identity resolution and store lookups are the only points setup may
    // block on external calls; bound them with the handshake timeout.
    let setup = async {
        let identity = match token.as_deref() {
            Some(token) => state.verifier.verify(token).await,
            None => Identity::Anonymous,
        };
        admission::decide(state.store.as_ref(), &session_code, &identity).await
    };

    let outcome = match tokio::time::timeout(state.config.handshake_timeout(), setup).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => {
            tracing::error!(session = %session_code, error = %err, "admission lookup failed");
            send_close(&mut ws_tx, close::SETUP_FAILURE, "setup failure").await;
            return;
        }
        Err(_) => {
            tracing::warn!(session = %session_code, "handshake timed out");
            send_close(&mut ws_tx, close::SETUP_FAILURE, "setup timeout").await;
            return;
        }
    };

    match outcome {
        AdmissionOutcome::Unauthenticated => {
            send_close(&mut ws_tx, close::UNAUTHENTICATED, "unauthenticated").await;
        }
        AdmissionOutcome::SessionMissing => {
            send_close(&mut ws_tx, close::SETUP_FAILURE, "unknown session").await;
        }
        AdmissionOutcome::NotRegistered { profile } => {
            tracing::info!(session = %session_code, user_id = profile.id, "not registered");
            send_event(
                &mut ws_tx,
                &admission_status("not-registered", "no join request for this session", &session_code),
            )
            .await;
            send_close(&mut ws_tx, close::NOT_REGISTERED, "not registered").await;
        }
        AdmissionOutcome::Rejected { profile } => {
            tracing::info!(session = %session_code, user_id = profile.id, "rejected");
            send_event(
                &mut ws_tx,
                &admission_status("rejected", "join request was rejected", &session_code),
            )
            .await;
            send_close(&mut ws_tx, close::REJECTED, "rejected").await;
        }
        AdmissionOutcome::Pending { profile } => {
            run_pending(ws_tx, ws_rx, session_code, profile, state).await;
        }
        AdmissionOutcome::Admitted { profile, owner } => {
            tracing::info!(
                session = %session_code,
                user_id = profile.id,
                owner,
                "connection admitted"
            );
            run_relaying(&mut ws_tx, &mut ws_rx, &session_code, &profile, &state).await;
        }
    }
}

/// Holds a pending connection open, joined only to the user's
/// notification group, until the client closes or the host decides.
async fn run_pending(
    mut ws_tx: WsSink,
    mut ws_rx: SplitStream<WebSocket>,
    session_code: String,
    profile: UserProfile,
    state: AppState,
) {
    tracing::info!(session = %session_code, user_id = profile.id, "pending, awaiting host decision");
    send_event(
        &mut ws_tx,
        &admission_status("pending", "awaiting host approval", &session_code),
    )
    .await;

    let connection_id = next_connection_id();
    let (tx, mut rx) = mpsc::channel(state.config.outbound_queue_capacity);
    state.notifier.subscribe(profile.id, connection_id, tx);

    loop {
        tokio::select! {
            pushed = rx.recv() => {
                match pushed {
                    Some(event) => {
                        if !send_event(&mut ws_tx, &event).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    // Pending connections are not in the room; nothing to relay.
                    Some(Ok(Message::Text(_))) => {
                        tracing::debug!(user_id = profile.id, "dropping message from pending connection");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!(user_id = profile.id, error = %err, "socket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    state.notifier.unsubscribe(profile.id, connection_id);
}

/// Full admission: room join, snapshot, join broadcast, relay loop, and
/// unconditional cleanup with a departure broadcast when the user's last
/// connection in the room closes.
async fn run_relaying(
    ws_tx: &mut WsSink,
    ws_rx: &mut SplitStream<WebSocket>,
    session_code: &str,
    profile: &UserProfile,
    state: &AppState,
) {
    let connection_id = next_connection_id();
    let (tx, mut rx) = mpsc::channel(state.config.outbound_queue_capacity);

    // Join-then-snapshot is atomic per room; nothing between the snapshot
    // and this connection becoming reachable can be observed by others.
    let existing = state.rooms.join(session_code, profile, connection_id, tx.clone());
    state.notifier.subscribe(profile.id, connection_id, tx);

    let admitted = send_event(
        ws_tx,
        &ServerEvent::Authenticated {
            user_id: profile.id,
            username: profile.username.clone(),
        },
    )
    .await
        && send_event(ws_tx, &ServerEvent::ExistingUsers { users: existing }).await;

    if admitted {
        state.rooms.broadcast(
            session_code,
            &ServerEvent::UserJoined {
                user_id: profile.id,
                user_name: profile.username.clone(),
            },
            Some(profile.id),
        );

        loop {
            tokio::select! {
                queued = rx.recv() => {
                    match queued {
                        Some(event) => {
                            if !send_event(ws_tx, &event).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                msg = ws_rx.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            handle_inbound_text(&state.rooms, session_code, profile, &text);
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(err)) => {
                            tracing::debug!(user_id = profile.id, error = %err, "socket error");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    // Unconditional, idempotent cleanup: runs for error closes too, and a
    // duplicate disconnect signal cannot double-broadcast the departure.
    cleanup_connection(
        &state.rooms,
        &state.notifier,
        session_code,
        profile,
        connection_id,
        admitted,
    );
    tracing::info!(session = %session_code, user_id = profile.id, "connection closed");
}

/// Removes a connection from the room and the notification group, then
/// broadcasts the departure when this was the user's last connection.
///
/// `announced` is whether this connection's join broadcast went out. A
/// connection whose welcome never completed leaves silently, so peers
/// cannot see a departure without a matching arrival.
fn cleanup_connection(
    rooms: &RoomRegistry,
    notifier: &Notifier,
    session_code: &str,
    profile: &UserProfile,
    connection_id: ConnectionId,
    announced: bool,
) {
    notifier.unsubscribe(profile.id, connection_id);
    if rooms.leave(session_code, profile.id, connection_id) && announced {
        rooms.broadcast(
            session_code,
            &ServerEvent::UserLeft {
                user_id: profile.id,
            },
            None,
        );
    }
}

/// Parses and dispatches one inbound frame. Per-message failures are
/// logged and dropped; the connection stays open.
fn handle_inbound_text(rooms: &RoomRegistry, session_code: &str, sender: &UserProfile, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(user_id = sender.id, error = %err, "malformed envelope, dropping");
            return;
        }
    };
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();

    match serde_json::from_value::<ClientEnvelope>(value) {
        Ok(envelope) => dispatch_envelope(rooms, session_code, sender, envelope),
        Err(err) => {
            tracing::debug!(
                user_id = sender.id,
                message_type = %kind,
                error = %err,
                "unrecognized or invalid envelope, dropping"
            );
        }
    }
}

/// Routes a well-formed envelope to the right recipients.
fn dispatch_envelope(
    rooms: &RoomRegistry,
    session_code: &str,
    sender: &UserProfile,
    envelope: ClientEnvelope,
) {
    match envelope {
        ClientEnvelope::Offer { offer, target_id } => {
            rooms.unicast(
                session_code,
                target_id,
                &ServerEvent::Offer {
                    offer,
                    sender_id: sender.id,
                },
            );
        }
        ClientEnvelope::Answer { answer, target_id } => {
            rooms.unicast(
                session_code,
                target_id,
                &ServerEvent::Answer {
                    answer,
                    sender_id: sender.id,
                },
            );
        }
        ClientEnvelope::IceCandidate {
            candidate,
            target_id,
        } => {
            rooms.unicast(
                session_code,
                target_id,
                &ServerEvent::IceCandidate {
                    candidate,
                    sender_id: sender.id,
                },
            );
        }
        ClientEnvelope::MediaState {
            video_enabled,
            audio_enabled,
        } => {
            rooms.broadcast(
                session_code,
                &ServerEvent::MediaStateChanged {
                    video_enabled,
                    audio_enabled,
                    sender_id: sender.id,
                },
                Some(sender.id),
            );
        }
        ClientEnvelope::ChatMessage { message } => {
            if message.trim().is_empty() {
                return;
            }
            rooms.broadcast(
                session_code,
                &ServerEvent::ChatMessage {
                    sender_id: sender.id,
                    sender_name: sender.username.clone(),
                    message,
                },
                Some(sender.id),
            );
        }
    }
}

/// Builds an `admission-status` event for this session.
fn admission_status(status: &str, message: &str, session_code: &str) -> ServerEvent {
    ServerEvent::AdmissionStatus {
        status: status.to_string(),
        message: message.to_string(),
        session_id: Some(session_code.to_string()),
    }
}

/// Serializes and sends one event; returns `false` when the socket is gone.
async fn send_event(ws_tx: &mut WsSink, event: &ServerEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(err) => {
            tracing::error!(error = %err, "event serialization failed");
            return true;
        }
    };
    ws_tx.send(Message::Text(json.into())).await.is_ok()
}

/// Sends a close frame with the given code; errors are ignored because
/// the peer may already be gone.
async fn send_close(ws_tx: &mut WsSink, code: u16, reason: &str) {
    let _ = ws_tx
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}
