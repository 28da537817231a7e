//! Read-only access to the platform's session/participant store.
//!
//! The gateway never creates or mutates session rows; session lifecycle
//! and admission decisions (host approval/rejection) happen in the main
//! platform. This module only answers two questions at connect time:
//! does the session exist and who owns it, and what is this user's
//! admission status in it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Failure while talking to the session/participant store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A participant row carried a status string the gateway does not know.
    #[error("invalid participant status: {0}")]
    InvalidStatus(String),
}

/// Static properties of a session, read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    /// Opaque URL-safe session code carried in the connection path.
    pub code: String,
    /// User id of the session owner (the host).
    pub owner_id: i64,
}

/// Admission status of a registered participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionStatus {
    /// Join request submitted, awaiting the host's decision.
    Pending,
    /// Host approved the join request.
    Approved,
    /// Host rejected the join request.
    Rejected,
}

impl AdmissionStatus {
    /// Wire/storage representation of this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidStatus`] for unknown strings.
    pub fn parse(value: &str) -> Result<Self, StoreError> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// One user's admission record in one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRecord {
    /// Participant row id (referenced in join-request events).
    pub participant_id: i64,
    /// Current admission status.
    pub status: AdmissionStatus,
}

/// Read-only view of the platform's session/participant tables.
///
/// Consulted exactly once per connection during admission; later status
/// transitions arrive through the notification channel, never by polling.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Looks up a session by its code.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure. A missing session is
    /// `Ok(None)`, not an error.
    async fn fetch_session(&self, code: &str) -> Result<Option<SessionHandle>, StoreError>;

    /// Looks up a user's admission record in a session.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on store failure. An unregistered user is
    /// `Ok(None)`, not an error.
    async fn fetch_participant(
        &self,
        code: &str,
        user_id: i64,
    ) -> Result<Option<ParticipantRecord>, StoreError>;
}
