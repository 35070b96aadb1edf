//! Session state storage operations.
//!
//! Each session is one row holding a JSON blob; the blob is decoded through
//! [`SessionState::from_stored`] so older layouts keep loading.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use super::Database;
use super::models::SessionState;
use crate::error::{DatabaseError, ServiceResult};

impl Database {
    /// Load the stored state for a session, if any
    pub fn get_session_state(&self, session_id: &str) -> ServiceResult<Option<SessionState>> {
        let conn = self.lock()?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT state FROM sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(DatabaseError::Query)?;

        raw.map(|raw| {
            serde_json::from_str(&raw)
                .map(SessionState::from_stored)
                .map_err(|e| DatabaseError::Serialization(e).into())
        })
        .transpose()
    }

    /// Insert or replace the stored state for a session
    pub fn put_session_state(&self, session_id: &str, state: &SessionState) -> ServiceResult<()> {
        let state_json = serde_json::to_string(state).map_err(DatabaseError::Serialization)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO sessions (id, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
            params![session_id, state_json, now],
        )
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Delete sessions not updated since `older_than`
    pub fn cleanup_stale_sessions(&self, older_than: DateTime<Utc>) -> ServiceResult<usize> {
        let conn = self.lock()?;

        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE updated_at < ?1",
                params![older_than.to_rfc3339()],
            )
            .map_err(DatabaseError::Query)?;

        Ok(rows)
    }

    /// Number of stored sessions
    #[cfg(test)]
    pub fn session_count(&self) -> ServiceResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .map_err(DatabaseError::Query)?;
        Ok(count as usize)
    }

    /// Drop the sessions table so every store call fails
    #[cfg(test)]
    pub fn drop_sessions_table(&self) -> ServiceResult<()> {
        self.lock()?
            .execute_batch("DROP TABLE sessions;")
            .map_err(DatabaseError::Query)?;
        Ok(())
    }

    /// Write a raw state blob, bypassing serialization
    #[cfg(test)]
    pub fn put_raw_session_state(&self, session_id: &str, raw: &str) -> ServiceResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (id, state) VALUES (?1, ?2)",
            params![session_id, raw],
        )
        .map_err(DatabaseError::Query)?;
        Ok(())
    }
}
