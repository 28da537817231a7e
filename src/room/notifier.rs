//! Per-user notification groups, independent of room membership.
//!
//! Every admitted or pending connection subscribes its user id here.
//! The platform's mutation path (host approval/rejection, new join
//! requests) pushes events into a user's group through the internal API,
//! and the group fans them out to every open connection of that user
//! (possibly zero, possibly several devices). This push is the only way a
//! pending connection learns its decision; the gateway never polls.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;
use crate::ws::messages::ServerEvent;

/// Per-user side-channel groups keyed by user id.
#[derive(Debug, Default)]
pub struct Notifier {
    groups: DashMap<i64, HashMap<ConnectionId, mpsc::Sender<ServerEvent>>>,
}

impl Notifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to its user's group, idempotently.
    pub fn subscribe(&self, user_id: i64, connection_id: ConnectionId, tx: mpsc::Sender<ServerEvent>) {
        self.groups
            .entry(user_id)
            .or_default()
            .insert(connection_id, tx);
    }

    /// Removes a connection from its user's group. No-op if absent.
    pub fn unsubscribe(&self, user_id: i64, connection_id: ConnectionId) {
        let Some(mut group) = self.groups.get_mut(&user_id) else {
            return;
        };
        group.remove(&connection_id);
        let empty = group.is_empty();
        drop(group);
        if empty {
            self.groups.remove_if(&user_id, |_, group| group.is_empty());
        }
    }

    /// Delivers `event` to every open connection of `user_id`.
    ///
    /// Returns the number of connections the event was queued for; zero
    /// when the user has no open connection anywhere.
    pub fn push(&self, user_id: i64, event: &ServerEvent) -> usize {
        let Some(group) = self.groups.get(&user_id) else {
            return 0;
        };
        let mut delivered = 0;
        for (connection_id, tx) in group.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(user_id, connection_id, "notification queue full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(user_id, connection_id, "notification queue closed");
                }
            }
        }
        delivered
    }

    /// Number of users with at least one subscribed connection.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.groups.len()
    }
}
