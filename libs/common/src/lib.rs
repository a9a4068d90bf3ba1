//! Common library for the work-time tracker
//!
//! This crate provides shared infrastructure used by the tracking core and
//! the API service: PostgreSQL connectivity and schema setup, the Redis
//! client used for kiosk state, and infrastructure error types.

pub mod cache;
pub mod database;
pub mod error;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, health_check};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     let is_healthy = health_check(&pool).await?;
///     println!("Database health check: {}", is_healthy);
///     Ok(())
/// }
/// ```
pub use database::{DatabaseConfig, apply_schema, health_check, init_pool};
