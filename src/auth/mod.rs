//! Identity resolution: credential extraction and verification.
//!
//! A connection's identity is resolved exactly once during the handshake
//! and is immutable for the connection's lifetime. Extraction walks a
//! fixed priority chain of credential sources; verification delegates to
//! a [`CredentialVerifier`]. Any verification failure yields
//! [`Identity::Anonymous`], never an error.

pub mod extract;
pub mod identity;
pub mod verifier;

pub use extract::credential;
pub use identity::{Identity, UserProfile};
pub use verifier::{CredentialVerifier, JwtVerifier};
