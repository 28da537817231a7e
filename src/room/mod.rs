//! Live membership state: room registry and per-user notification groups.
//!
//! Everything in this module is in-memory and rebuilt as peers reconnect
//! after a restart; there is no durability requirement. Maps are sharded
//! (`dashmap`) so operations on different sessions or users never block
//! one another, while join/leave/broadcast on one session stay serialized.

pub mod notifier;
pub mod registry;

pub use notifier::Notifier;
pub use registry::RoomRegistry;

/// Identifier of one physical connection, unique for the process lifetime.
pub type ConnectionId = u64;
