//! Connection identity types.

use serde::{Deserialize, Serialize};

/// A verified platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Platform user id.
    pub id: i64,
    /// Display name shown to other room members.
    pub username: String,
}

/// The identity resolved for one connection.
///
/// Resolved once during the handshake and frozen afterwards; there is no
/// re-authentication mid-connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// No credential was presented, or verification failed.
    Anonymous,
    /// A verified user.
    Known(UserProfile),
}

impl Identity {
    /// Returns the verified profile, if any.
    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Anonymous => None,
            Self::Known(profile) => Some(profile),
        }
    }

    /// Returns `true` if no verified user is attached.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}
