//! Cost center repository for database operations

use sqlx::{PgPool, Row};
use tracking::{TrackingError, TrackingResult, models::CostCenter};
use uuid::Uuid;

use super::map_query_error;

/// Cost center repository
#[derive(Clone)]
pub struct CostCenterRepository {
    pool: PgPool,
}

impl CostCenterRepository {
    /// Create a new cost center repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_all(&self) -> TrackingResult<Vec<CostCenter>> {
        let rows = sqlx::query("SELECT id, name FROM cost_centers ORDER BY lower(name)")
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_error)?;

        Ok(rows
            .into_iter()
            .map(|row| CostCenter {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> TrackingResult<Option<CostCenter>> {
        let row = sqlx::query("SELECT id, name FROM cost_centers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_error)?;

        Ok(row.map(|row| CostCenter {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    pub async fn create(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter> {
        sqlx::query("INSERT INTO cost_centers (id, name) VALUES ($1, $2)")
            .bind(cost_center.id)
            .bind(&cost_center.name)
            .execute(&self.pool)
            .await
            .map_err(map_query_error)?;

        Ok(cost_center.clone())
    }

    pub async fn update(&self, cost_center: &CostCenter) -> TrackingResult<CostCenter> {
        let result = sqlx::query("UPDATE cost_centers SET name = $2 WHERE id = $1")
            .bind(cost_center.id)
            .bind(&cost_center.name)
            .execute(&self.pool)
            .await
            .map_err(map_query_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackingError::NotFound("Cost center"));
        }
        Ok(cost_center.clone())
    }

    /// Delete a cost center; memberships cascade and projects are unlinked
    pub async fn delete(&self, id: Uuid) -> TrackingResult<()> {
        let result = sqlx::query("DELETE FROM cost_centers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_query_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackingError::NotFound("Cost center"));
        }
        Ok(())
    }
}
