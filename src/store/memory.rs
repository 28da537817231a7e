//! Map-backed session/participant store.
//!
//! Used by tests and for running the gateway without the platform
//! database. Semantics mirror [`super::PostgresStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ParticipantRecord, SessionHandle, SessionStore, StoreError};

/// In-memory [`SessionStore`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    participants: RwLock<HashMap<(String, i64), ParticipantRecord>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a session.
    pub async fn put_session(&self, session: SessionHandle) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.code.clone(), session);
    }

    /// Inserts or replaces a participant record.
    pub async fn put_participant(&self, code: &str, user_id: i64, record: ParticipantRecord) {
        let mut participants = self.participants.write().await;
        participants.insert((code.to_string(), user_id), record);
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn fetch_session(&self, code: &str) -> Result<Option<SessionHandle>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(code).cloned())
    }

    async fn fetch_participant(
        &self,
        code: &str,
        user_id: i64,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        let participants = self.participants.read().await;
        Ok(participants.get(&(code.to_string(), user_id)).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::super::AdmissionStatus;
    use super::*;

    #[tokio::test]
    async fn missing_session_is_none() {
        let store = InMemoryStore::new();
        let Ok(found) = store.fetch_session("nope").await else {
            panic!("lookup failed");
        };
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn stored_rows_are_returned() {
        let store = InMemoryStore::new();
        store
            .put_session(SessionHandle {
                code: "s1".to_string(),
                owner_id: 1,
            })
            .await;
        store
            .put_participant(
                "s1",
                2,
                ParticipantRecord {
                    participant_id: 10,
                    status: AdmissionStatus::Approved,
                },
            )
            .await;

        let Ok(Some(session)) = store.fetch_session("s1").await else {
            panic!("session lookup failed");
        };
        assert_eq!(session.owner_id, 1);

        let Ok(Some(record)) = store.fetch_participant("s1", 2).await else {
            panic!("participant lookup failed");
        };
        assert_eq!(record.status, AdmissionStatus::Approved);

        let Ok(found) = store.fetch_participant("s1", 3).await else {
            panic!("participant lookup failed");
        };
        assert!(found.is_none());
    }
}
