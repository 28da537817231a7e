//! Admission control: who may enter a room, and how far they get.
//!
//! The decision runs once per connection, after identity resolution and
//! before any room state is touched. Owners bypass admission control;
//! everyone else is gated by their participant record in the external
//! store. Store failures surface as errors and close the connection with
//! a generic code without any partial registration.

use crate::auth::{Identity, UserProfile};
use crate::store::{AdmissionStatus, SessionStore, StoreError};

/// Outcome of the admission decision for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// No verified identity; close with [`super::close::UNAUTHENTICATED`].
    Unauthenticated,
    /// The session does not exist; a caller error, closed generically.
    SessionMissing,
    /// Full admission: join the room and the notification group.
    Admitted {
        /// The admitted user.
        profile: UserProfile,
        /// Whether the user owns the session.
        owner: bool,
    },
    /// No participant record; status event then close, never joins.
    NotRegistered {
        /// The verified but unregistered user.
        profile: UserProfile,
    },
    /// Awaiting the host's decision. The connection stays open, joined
    /// only to the user's notification group, so the decision can be
    /// pushed to it; it is never silently joined to the room.
    /// Deployments that close pending connections instead of holding
    /// them close with [`super::close::NOT_APPROVED`].
    Pending {
        /// The verified pending user.
        profile: UserProfile,
    },
    /// The host rejected the join request; status event then close.
    Rejected {
        /// The verified rejected user.
        profile: UserProfile,
    },
}

/// Runs the admission decision procedure for `identity` on `code`.
///
/// # Errors
///
/// Returns a [`StoreError`] if a store lookup fails; the caller must
/// close the connection with a generic setup-failure code.
pub async fn decide(
    store: &dyn SessionStore,
    code: &str,
    identity: &Identity,
) -> Result<AdmissionOutcome, StoreError> {
    let Some(profile) = identity.profile() else {
        return Ok(AdmissionOutcome::Unauthenticated);
    };

    let Some(session) = store.fetch_session(code).await? else {
        tracing::warn!(session = code, "connection to unknown session");
        return Ok(AdmissionOutcome::SessionMissing);
    };

    if session.owner_id == profile.id {
        return Ok(AdmissionOutcome::Admitted {
            profile: profile.clone(),
            owner: true,
        });
    }

    match store.fetch_participant(code, profile.id).await? {
        None => Ok(AdmissionOutcome::NotRegistered {
            profile: profile.clone(),
        }),
        Some(record) => Ok(match record.status {
            AdmissionStatus::Approved => AdmissionOutcome::Admitted {
                profile: profile.clone(),
                owner: false,
            },
            AdmissionStatus::Pending => AdmissionOutcome::Pending {
                profile: profile.clone(),
            },
            AdmissionStatus::Rejected => AdmissionOutcome::Rejected {
                profile: profile.clone(),
            },
        }),
    }
}
