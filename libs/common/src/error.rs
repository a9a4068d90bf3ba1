//! Custom error types for the common library
//!
//! This module defines infrastructure error types shared by the tracking
//! core and the API service.

use redis::RedisError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored row could not be mapped back to a domain value
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Custom error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Error returned by the Redis client
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    /// Configuration error
    #[error("Cache configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
