//! User repository for database operations

use common::error::DatabaseError;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::info;
use tracking::{
    TrackingError, TrackingResult,
    models::{Role, User},
};
use uuid::Uuid;

use super::map_query_error;

const SELECT_USERS: &str = r#"
    SELECT u.id, u.name, u.username, u.password, u.role, u.blocked,
           u.can_select_project_manually,
           COALESCE(
               array_agg(ucc.cost_center_id ORDER BY ucc.cost_center_id)
                   FILTER (WHERE ucc.cost_center_id IS NOT NULL),
               '{}'
           ) AS cost_center_ids
    FROM users u
    LEFT JOIN user_cost_centers ucc ON ucc.user_id = u.id
"#;

fn user_from_row(row: &PgRow) -> TrackingResult<User> {
    let role: String = row.get("role");
    let role = Role::parse(&role).ok_or_else(|| {
        TrackingError::Database(DatabaseError::CorruptRow(format!("unknown role '{}'", role)))
    })?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        password: row.get("password"),
        role,
        blocked: row.get("blocked"),
        can_select_project_manually: row.get("can_select_project_manually"),
        cost_center_ids: row.get("cost_center_ids"),
    })
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replace_cost_centers(
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
    ) -> TrackingResult<()> {
        sqlx::query("DELETE FROM user_cost_centers WHERE user_id = $1")
            .bind(user.id)
            .execute(&mut **tx)
            .await
            .map_err(map_query_error)?;

        sqlx::query(
            r#"
            INSERT INTO user_cost_centers (user_id, cost_center_id)
            SELECT $1, unnest($2::uuid[])
            "#,
        )
        .bind(user.id)
        .bind(&user.cost_center_ids)
        .execute(&mut **tx)
        .await
        .map_err(map_query_error)?;

        Ok(())
    }

    /// Get all users ordered by name
    pub async fn get_all(&self) -> TrackingResult<Vec<User>> {
        let rows = sqlx::query(&format!("{} GROUP BY u.id ORDER BY lower(u.name)", SELECT_USERS))
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_error)?;

        rows.iter().map(user_from_row).collect()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> TrackingResult<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE u.id = $1 GROUP BY u.id", SELECT_USERS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> TrackingResult<Option<User>> {
        let row = sqlx::query(&format!("{} WHERE u.username = $1 GROUP BY u.id", SELECT_USERS))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Create a new user with its cost center memberships
    pub async fn create(&self, user: &User) -> TrackingResult<User> {
        info!("Creating new user: {}", user.username);

        let mut tx = self.pool.begin().await.map_err(map_query_error)?;

        sqlx::query(
            r#"
            INSERT INTO users
                (id, name, username, password, role, blocked, can_select_project_manually)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(user.blocked)
        .bind(user.can_select_project_manually)
        .execute(&mut *tx)
        .await
        .map_err(map_query_error)?;

        Self::replace_cost_centers(&mut tx, user).await?;
        tx.commit().await.map_err(map_query_error)?;

        Ok(user.clone())
    }

    /// Replace a user's attributes and memberships
    pub async fn update(&self, user: &User) -> TrackingResult<User> {
        let mut tx = self.pool.begin().await.map_err(map_query_error)?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, username = $3, password = $4, role = $5, blocked = $6,
                can_select_project_manually = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(user.blocked)
        .bind(user.can_select_project_manually)
        .execute(&mut *tx)
        .await
        .map_err(map_query_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackingError::NotFound("User"));
        }

        Self::replace_cost_centers(&mut tx, user).await?;
        tx.commit().await.map_err(map_query_error)?;

        Ok(user.clone())
    }

    /// Delete a user; sessions cascade through foreign keys
    pub async fn delete(&self, id: Uuid) -> TrackingResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_query_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackingError::NotFound("User"));
        }
        Ok(())
    }
}
