//! Active and completed session repository
//!
//! The UNIQUE constraint on `active_sessions.user_id` is the last line of
//! defence for the one-session-per-user rule; completing a session deletes
//! the active row and inserts the ledger row in one transaction.

use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::warn;
use tracking::{
    TrackingError, TrackingResult,
    models::{ActiveSession, CompletedSession, NewActiveSession, NewCompletedSession},
};
use uuid::Uuid;

use super::map_query_error;

const ACTIVE_COLUMNS: &str = "id, user_id, user_name, project_id, project_name, start_time";

fn active_from_row(row: PgRow) -> ActiveSession {
    ActiveSession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        project_id: row.get("project_id"),
        project_name: row.get("project_name"),
        start_time: row.get("start_time"),
    }
}

fn completed_from_row(row: PgRow) -> CompletedSession {
    CompletedSession {
        id: row.get("id"),
        timestamp: row.get("timestamp"),
        employee_id: row.get("employee_id"),
        employee_name: row.get("employee_name"),
        project_id: row.get("project_id"),
        project_name: row.get("project_name"),
        duration_minutes: row.get("duration_minutes"),
        duration_formatted: row.get("duration_formatted"),
    }
}

const INSERT_COMPLETED: &str = r#"
    INSERT INTO completed_sessions
        (timestamp, employee_id, employee_name, project_id, project_name,
         duration_minutes, duration_formatted)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING id
"#;

/// Session repository for database operations
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All active sessions, oldest first
    pub async fn get_active(&self) -> TrackingResult<Vec<ActiveSession>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM active_sessions ORDER BY start_time, id",
            ACTIVE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(rows.into_iter().map(active_from_row).collect())
    }

    pub async fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> TrackingResult<Option<ActiveSession>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM active_sessions WHERE user_id = $1",
            ACTIVE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(row.map(active_from_row))
    }

    /// Insert an active session; a second row for the same user violates
    /// `active_sessions_one_per_user`
    pub async fn insert_active(&self, session: NewActiveSession) -> TrackingResult<ActiveSession> {
        let row = sqlx::query(
            r#"
            INSERT INTO active_sessions (user_id, user_name, project_id, project_name, start_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(session.user_id)
        .bind(&session.user_name)
        .bind(session.project_id)
        .bind(&session.project_name)
        .bind(session.start_time)
        .fetch_one(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(session.with_id(row.get("id")))
    }

    /// Move an active session into the ledger atomically
    pub async fn complete(
        &self,
        user_id: Uuid,
        active_id: i64,
        completed: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        let mut tx = self.pool.begin().await.map_err(map_query_error)?;

        let deleted = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(active_id)
            .execute(&mut *tx)
            .await
            .map_err(map_query_error)?;

        if deleted.rows_affected() == 0 {
            warn!(
                "Active session {} of user {} disappeared before completion",
                active_id, user_id
            );
            tx.rollback().await.map_err(map_query_error)?;
            return Err(TrackingError::NoActiveSession);
        }

        let row = sqlx::query(INSERT_COMPLETED)
            .bind(completed.timestamp)
            .bind(completed.employee_id)
            .bind(&completed.employee_name)
            .bind(completed.project_id)
            .bind(&completed.project_name)
            .bind(completed.duration_minutes)
            .bind(&completed.duration_formatted)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_query_error)?;

        tx.commit().await.map_err(map_query_error)?;
        Ok(completed.with_id(row.get("id")))
    }

    /// Completed sessions, newest first
    pub async fn get_completed(&self) -> TrackingResult<Vec<CompletedSession>> {
        let rows = sqlx::query(
            r#"
            SELECT id, timestamp, employee_id, employee_name, project_id, project_name,
                   duration_minutes, duration_formatted
            FROM completed_sessions
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(rows.into_iter().map(completed_from_row).collect())
    }

    pub async fn insert_completed(
        &self,
        session: NewCompletedSession,
    ) -> TrackingResult<CompletedSession> {
        let row = sqlx::query(INSERT_COMPLETED)
            .bind(session.timestamp)
            .bind(session.employee_id)
            .bind(&session.employee_name)
            .bind(session.project_id)
            .bind(&session.project_name)
            .bind(session.duration_minutes)
            .bind(&session.duration_formatted)
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_error)?;

        Ok(session.with_id(row.get("id")))
    }
}
