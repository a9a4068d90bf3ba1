//! Integration tests for the infrastructure components
//!
//! These tests verify that the PostgreSQL database and Redis cache used by
//! the time tracker are reachable, and that the schema applies cleanly.
//! Run them with `cargo test -- --ignored` against local services.

use common::{
    apply_schema,
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};
use sqlx::Row;

const SCHEMA: &str = include_str!("../../../services/api/migrations/0001_schema.sql");

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_schema_applies_twice() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    apply_schema(&pool, SCHEMA).await?;
    apply_schema(&pool, SCHEMA).await?;

    let row = sqlx::query(
        r#"
        SELECT count(*) AS tables
        FROM information_schema.tables
        WHERE table_schema = 'public'
          AND table_name IN ('users', 'cost_centers', 'user_cost_centers', 'projects',
                             'active_sessions', 'completed_sessions')
        "#,
    )
    .fetch_one(&pool)
    .await?;

    let tables: i64 = row.get("tables");
    assert_eq!(tables, 6, "Not every tracker table was created");

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_redis_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;

    assert!(
        redis_pool.health_check().await?,
        "Redis health check failed"
    );

    let test_key = "kiosk:integration-test";
    let test_value = r#"{"state":"loggedOut"}"#;

    redis_pool.set(test_key, test_value, Some(10)).await?;
    assert_eq!(
        redis_pool.get(test_key).await?,
        Some(test_value.to_string()),
        "Redis SET/GET test failed"
    );

    redis_pool.delete(test_key).await?;
    assert_eq!(
        redis_pool.get(test_key).await?,
        None,
        "Redis delete operation failed"
    );

    Ok(())
}
