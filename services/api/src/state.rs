//! Application state shared across handlers

use sqlx::PgPool;
use tracking::{Registry, SessionEngine};

use crate::{kiosk_store::KioskStateStore, middleware::TokenService, rate_limiter::RateLimiter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub engine: SessionEngine,
    pub registry: Registry,
    pub kiosks: KioskStateStore,
    pub tokens: TokenService,
    pub login_limiter: RateLimiter,
}
