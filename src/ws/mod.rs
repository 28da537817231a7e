//! WebSocket layer: upgrade, admission, envelopes, and the relay loop.
//!
//! The signaling endpoint at `/ws/{session_code}` authenticates the
//! connection, runs admission control, and then relays envelopes between
//! room members until disconnect.

pub mod admission;
pub mod close;
pub mod connection;
pub mod handler;
pub mod messages;
