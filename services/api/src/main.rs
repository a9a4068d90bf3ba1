use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod error;
mod kiosk_store;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod state;

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, apply_schema, init_pool},
};
use tokio::net::TcpListener;
use tracking::{Registry, SessionEngine, clock::SystemClock};

use crate::{
    config::{AppConfig, KioskBackend},
    kiosk_store::KioskStateStore,
    middleware::TokenService,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::PgStore,
    state::AppState,
};

const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting work time API service");

    let config = AppConfig::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    apply_schema(&pool, SCHEMA).await?;

    let kiosks = match config.kiosk_backend {
        KioskBackend::Memory => KioskStateStore::memory(),
        KioskBackend::Redis => {
            let redis_pool = RedisPool::new(&RedisConfig::from_env()?).await?;
            if !redis_pool.health_check().await? {
                anyhow::bail!("Failed to connect to Redis");
            }
            KioskStateStore::redis(redis_pool)
        }
    };
    info!("Kiosk state backend: {:?}", config.kiosk_backend);

    let store = Arc::new(PgStore::new(pool.clone()));
    let engine = SessionEngine::new(store.clone(), Arc::new(SystemClock));
    let registry = Registry::new(store);

    let app_state = AppState {
        db_pool: pool,
        engine,
        registry,
        kiosks,
        tokens: TokenService::new(&config.jwt_secret, config.token_expiry),
        login_limiter: RateLimiter::new(RateLimiterConfig::from(&config)),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API service listening on {}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
