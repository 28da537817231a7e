//! PostgreSQL implementation of the session/participant store.
//!
//! Reads the platform's `sessions` and `session_participants` tables.
//! The schema is owned by the platform; the gateway carries no
//! migrations and issues only `SELECT`s.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{AdmissionStatus, ParticipantRecord, SessionHandle, SessionStore, StoreError};

/// PostgreSQL-backed [`SessionStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn fetch_session(&self, code: &str) -> Result<Option<SessionHandle>, StoreError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT code, owner_id FROM sessions WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(code, owner_id)| SessionHandle { code, owner_id }))
    }

    async fn fetch_participant(
        &self,
        code: &str,
        user_id: i64,
    ) -> Result<Option<ParticipantRecord>, StoreError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT p.id, p.status FROM session_participants p \
             JOIN sessions s ON s.id = p.session_id \
             WHERE s.code = $1 AND p.user_id = $2",
        )
        .bind(code)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((participant_id, status)) => Ok(Some(ParticipantRecord {
                participant_id,
                status: AdmissionStatus::parse(&status)?,
            })),
            None => Ok(None),
        }
    }
}
