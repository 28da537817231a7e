//! Per-session membership sets with group fan-out.
//!
//! [`RoomRegistry`] maps session codes to member sets. Each entry is
//! guarded by its shard lock, so join/leave/broadcast on the same session
//! are serialized against each other while different sessions proceed
//! concurrently, without any global lock.
//!
//! Delivery is fire-and-forget: events go into each connection's bounded
//! outbound queue with a non-blocking `try_send`. A slow peer overflows
//! its own queue (dropped and logged) and never stalls the broadcaster.

use std::collections::HashMap;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;
use crate::auth::UserProfile;
use crate::ws::messages::ServerEvent;

/// One user's open connections within a room.
#[derive(Debug, Default)]
struct Member {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
}

/// Member sets for one session.
#[derive(Debug, Default)]
struct Room {
    members: HashMap<i64, Member>,
}

/// In-memory mapping from session code to the set of connected members.
///
/// A user id is a member of a room iff at least one of their connections
/// for that session is open. Membership is mutated only by [`join`] and
/// [`leave`]; it is never persisted.
///
/// [`join`]: RoomRegistry::join
/// [`leave`]: RoomRegistry::leave
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Room>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the room, idempotently.
    ///
    /// Returns the user ids that were members *before* this join, with
    /// the joining user excluded: the snapshot that seeds the new
    /// arrival's peer list. The snapshot and the membership update happen
    /// under the same lock, so a racing concurrent join cannot appear in
    /// its own snapshot.
    pub fn join(
        &self,
        code: &str,
        profile: &UserProfile,
        connection_id: ConnectionId,
        tx: mpsc::Sender<ServerEvent>,
    ) -> Vec<i64> {
        let mut room = self.rooms.entry(code.to_string()).or_default();
        let mut snapshot: Vec<i64> = room
            .members
            .keys()
            .filter(|id| **id != profile.id)
            .copied()
            .collect();
        snapshot.sort_unstable();

        room.members
            .entry(profile.id)
            .or_default()
            .connections
            .insert(connection_id, tx);
        snapshot
    }

    /// Removes a connection from the room.
    ///
    /// Returns `true` iff this removed the user's last open connection in
    /// the room, meaning a departure broadcast is owed. Removing a
    /// connection that was never registered (or already removed) is a
    /// no-op returning `false`, so duplicate disconnect signals cannot
    /// double-broadcast.
    pub fn leave(&self, code: &str, user_id: i64, connection_id: ConnectionId) -> bool {
        let Some(mut room) = self.rooms.get_mut(code) else {
            return false;
        };
        let Some(member) = room.members.get_mut(&user_id) else {
            return false;
        };

        let removed = member.connections.remove(&connection_id).is_some();
        let last = removed && member.connections.is_empty();
        if last {
            room.members.remove(&user_id);
        }
        let room_empty = room.members.is_empty();
        drop(room);

        if room_empty {
            // Re-checked under the shard lock: a concurrent join wins.
            self.rooms.remove_if(code, |_, room| room.members.is_empty());
        }
        last
    }

    /// Delivers `event` to every open connection in the room, optionally
    /// skipping one user (typically the sender).
    ///
    /// Returns the number of connections the event was queued for.
    pub fn broadcast(&self, code: &str, event: &ServerEvent, exclude_user: Option<i64>) -> usize {
        let Some(room) = self.rooms.get(code) else {
            return 0;
        };
        let mut delivered = 0;
        for (user_id, member) in &room.members {
            if exclude_user == Some(*user_id) {
                continue;
            }
            delivered += send_to_member(code, *user_id, member, event);
        }
        delivered
    }

    /// Delivers `event` only to the target user's connections in the room.
    ///
    /// If the target has no open connection the event is silently dropped
    /// (best-effort signaling, no queuing for offline peers). Returns the
    /// number of connections the event was queued for.
    pub fn unicast(&self, code: &str, target_id: i64, event: &ServerEvent) -> usize {
        let Some(room) = self.rooms.get(code) else {
            return 0;
        };
        match room.members.get(&target_id) {
            Some(member) => send_to_member(code, target_id, member, event),
            None => {
                tracing::debug!(session = code, target_id, "unicast target not connected");
                0
            }
        }
    }

    /// Current member ids of a room. Empty if the room does not exist.
    #[must_use]
    pub fn members(&self, code: &str) -> Vec<i64> {
        let Some(room) = self.rooms.get(code) else {
            return Vec::new();
        };
        let mut ids: Vec<i64> = room.members.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total number of open connections across all rooms.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.rooms
            .iter()
            .map(|room| {
                room.members
                    .values()
                    .map(|member| member.connections.len())
                    .sum::<usize>()
            })
            .sum()
    }
}

/// Queues `event` on each of one member's connections without blocking.
fn send_to_member(code: &str, user_id: i64, member: &Member, event: &ServerEvent) -> usize {
    let mut delivered = 0;
    for (connection_id, tx) in &member.connections {
        match tx.try_send(event.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    session = code,
                    user_id,
                    connection_id,
                    "outbound queue full, dropping event"
                );
            }
            Err(TrySendError::Closed(_)) => {
                // Connection is tearing down; its leave() will prune it.
                tracing::debug!(session = code, user_id, connection_id, "outbound queue closed");
            }
        }
    }
    delivered
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn profile(id: i64) -> UserProfile {
        UserProfile {
            id,
            username: format!("user-{id}"),
        }
    }

    fn channel() -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(16)
    }

    fn chat(sender_id: i64) -> ServerEvent {
        ServerEvent::ChatMessage {
            sender_id,
            sender_name: format!("user-{sender_id}"),
            message: "hi".to_string(),
        }
    }

    #[tokio::test]
    async fn first_join_sees_empty_snapshot() {
        let registry = RoomRegistry::new();
        let (tx, _rx) = channel();
        let snapshot = registry.join("s1", &profile(1), 100, tx);
        assert!(snapshot.is_empty());
        assert_eq!(registry.members("s1"), vec![1]);
    }

    #[tokio::test]
    async fn snapshot_lists_prior_members_excluding_self() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let (tx3, _rx3) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s1", &profile(2), 101, tx2);

        let snapshot = registry.join("s1", &profile(3), 102, tx3);
        assert_eq!(snapshot, vec![1, 2]);
    }

    #[tokio::test]
    async fn second_device_snapshot_excludes_own_user() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let (tx3, _rx3) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s1", &profile(2), 101, tx2);

        // Same user joins again from another device.
        let snapshot = registry.join("s1", &profile(2), 102, tx3);
        assert_eq!(snapshot, vec![1]);
        assert_eq!(registry.members("s1"), vec![1, 2]);
    }

    #[tokio::test]
    async fn leave_flags_only_last_connection() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        registry.join("s1", &profile(2), 101, tx1);
        registry.join("s1", &profile(2), 102, tx2);

        assert!(!registry.leave("s1", 2, 101));
        assert_eq!(registry.members("s1"), vec![2]);
        assert!(registry.leave("s1", 2, 102));
        assert!(registry.members("s1").is_empty());
    }

    #[tokio::test]
    async fn duplicate_leave_is_a_noop() {
        let registry = RoomRegistry::new();
        let (tx, _rx) = channel();
        registry.join("s1", &profile(1), 100, tx);

        assert!(registry.leave("s1", 1, 100));
        assert!(!registry.leave("s1", 1, 100));
        assert!(!registry.leave("s1", 1, 999));
        assert!(!registry.leave("missing", 1, 100));
    }

    #[tokio::test]
    async fn empty_room_is_pruned() {
        let registry = RoomRegistry::new();
        let (tx, _rx) = channel();
        registry.join("s1", &profile(1), 100, tx);
        assert_eq!(registry.room_count(), 1);

        registry.leave("s1", 1, 100);
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let (tx3, mut rx3) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s1", &profile(2), 101, tx2);
        registry.join("s1", &profile(3), 102, tx3);

        let delivered = registry.broadcast("s1", &chat(1), Some(1));
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().ok(), Some(chat(1)));
        assert_eq!(rx3.try_recv().ok(), Some(chat(1)));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_device_of_a_user() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, mut rx2) = channel();
        let (tx3, mut rx3) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s1", &profile(2), 101, tx2);
        registry.join("s1", &profile(2), 102, tx3);

        let delivered = registry.broadcast("s1", &chat(1), Some(1));
        assert_eq!(delivered, 2);
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unicast_reaches_only_the_target() {
        let registry = RoomRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let (tx3, mut rx3) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s1", &profile(2), 101, tx2);
        registry.join("s1", &profile(3), 102, tx3);

        let event = ServerEvent::Offer {
            offer: serde_json::json!({"sdp": "v=0"}),
            sender_id: 1,
        };
        let delivered = registry.unicast("s1", 2, &event);
        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().ok(), Some(event));
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn unicast_to_absent_target_is_dropped() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        registry.join("s1", &profile(1), 100, tx1);

        assert_eq!(registry.unicast("s1", 42, &chat(1)), 0);
        assert_eq!(registry.unicast("missing", 42, &chat(1)), 0);
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s2", &profile(2), 101, tx2);

        let delivered = registry.broadcast("s1", &chat(1), None);
        assert_eq!(delivered, 1);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let registry = RoomRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        registry.join("s1", &profile(1), 100, tx);

        assert_eq!(registry.broadcast("s1", &chat(2), None), 1);
        assert_eq!(registry.broadcast("s1", &chat(2), None), 0);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn connection_count_spans_rooms() {
        let registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let (tx3, _rx3) = channel();
        registry.join("s1", &profile(1), 100, tx1);
        registry.join("s1", &profile(1), 101, tx2);
        registry.join("s2", &profile(2), 102, tx3);

        assert_eq!(registry.room_count(), 2);
        assert_eq!(registry.connection_count(), 3);
    }
}
