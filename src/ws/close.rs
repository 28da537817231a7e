//! Terminal WebSocket close codes.
//!
//! Each terminal admission outcome closes with its own code so clients
//! can distinguish "never approved" from "explicitly rejected" from "not
//! registered" and from transient failures. Clients may auto-reconnect
//! after [`SETUP_FAILURE`], but must not retry [`NOT_REGISTERED`] or
//! [`REJECTED`]; those require a new join request through the platform.

/// Generic setup failure: store lookup error, missing session, or
/// handshake timeout. Safe to retry.
pub const SETUP_FAILURE: u16 = 4000;

/// No valid credential was presented; the connection was never admitted.
pub const UNAUTHENTICATED: u16 = 4001;

/// The user has no admission record for this session.
pub const NOT_REGISTERED: u16 = 4002;

/// The host explicitly rejected this user's join request.
pub const REJECTED: u16 = 4003;

/// The user's admission record exists but is not `approved`. Reserved for
/// deployments that close pending connections instead of holding them.
pub const NOT_APPROVED: u16 = 4004;
