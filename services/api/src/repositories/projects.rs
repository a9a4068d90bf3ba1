//! Project repository for database operations

use sqlx::{PgPool, Row, postgres::PgRow};
use tracking::{TrackingError, TrackingResult, models::Project};
use uuid::Uuid;

use super::map_query_error;

fn project_from_row(row: PgRow) -> Project {
    Project {
        id: row.get("id"),
        name: row.get("name"),
        budget: row.get("budget"),
        deadline: row.get("deadline"),
        closed: row.get("closed"),
        estimated_hours: row.get("estimated_hours"),
        cost_center_id: row.get("cost_center_id"),
    }
}

/// Project repository
#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Create a new project repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get all projects ordered by name
    pub async fn get_all(&self) -> TrackingResult<Vec<Project>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, budget, deadline, closed, estimated_hours, cost_center_id
            FROM projects
            ORDER BY lower(name)
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(rows.into_iter().map(project_from_row).collect())
    }

    /// Find a project by ID
    pub async fn find_by_id(&self, id: Uuid) -> TrackingResult<Option<Project>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, budget, deadline, closed, estimated_hours, cost_center_id
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(row.map(project_from_row))
    }

    pub async fn create(&self, project: &Project) -> TrackingResult<Project> {
        sqlx::query(
            r#"
            INSERT INTO projects
                (id, name, budget, deadline, closed, estimated_hours, cost_center_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(project.budget)
        .bind(project.deadline)
        .bind(project.closed)
        .bind(project.estimated_hours)
        .bind(project.cost_center_id)
        .execute(&self.pool)
        .await
        .map_err(map_query_error)?;

        Ok(project.clone())
    }

    pub async fn update(&self, project: &Project) -> TrackingResult<Project> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, budget = $3, deadline = $4, closed = $5, estimated_hours = $6,
                cost_center_id = $7
            WHERE id = $1
            "#,
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(project.budget)
        .bind(project.deadline)
        .bind(project.closed)
        .bind(project.estimated_hours)
        .bind(project.cost_center_id)
        .execute(&self.pool)
        .await
        .map_err(map_query_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackingError::NotFound("Project"));
        }
        Ok(project.clone())
    }

    /// Delete a project; sessions cascade through foreign keys
    pub async fn delete(&self, id: Uuid) -> TrackingResult<()> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_query_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackingError::NotFound("Project"));
        }
        Ok(())
    }
}
