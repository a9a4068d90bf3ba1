//! Rate limiter for preventing brute force login attempts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::AppConfig;

/// Map size above which expired entries are swept on the next check
const PRUNE_THRESHOLD: usize = 1024;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,       // 5 minutes
            ban_duration_seconds: 900, // 15 minutes
        }
    }
}

impl From<&AppConfig> for RateLimiterConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.login_max_attempts,
            window_seconds: config.login_window_seconds,
            ban_duration_seconds: config.login_ban_seconds,
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        let ban_over = self.ban_expires.is_none_or(|ban_expires| now >= ban_expires);
        ban_over && now.duration_since(self.window_start) >= window
    }
}

/// Rate limiter keyed by an arbitrary string (the login username)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.lock().await;
        let window = Duration::from_secs(self.config.window_seconds);

        if entries.len() >= PRUNE_THRESHOLD {
            entries.retain(|_, entry| !entry.is_expired(now, window));
        }

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now < ban_expires {
                return false;
            }
            entry.attempts = 0;
            entry.window_start = now;
            entry.ban_expires = None;
        }

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return false;
        }

        entry.attempts += 1;
        true
    }

    /// Forget the attempts of `key` after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds: 60,
            ban_duration_seconds: 120,
        })
    }

    #[tokio::test]
    async fn test_blocks_after_max_attempts() {
        let limiter = limiter(3);
        for _ in 0..3 {
            assert!(limiter.is_allowed("jana").await);
        }
        assert!(!limiter.is_allowed("jana").await);
        assert!(limiter.is_allowed("peter").await);
    }

    #[tokio::test]
    async fn test_reset_clears_attempts() {
        let limiter = limiter(1);
        assert!(limiter.is_allowed("jana").await);
        limiter.reset("jana").await;
        assert!(limiter.is_allowed("jana").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1);
        let start = Instant::now();
        assert!(limiter.check_at("jana", start).await);
        assert!(!limiter.check_at("jana", start).await);
        assert!(
            !limiter
                .check_at("jana", start + Duration::from_secs(100))
                .await
        );
        assert!(
            limiter
                .check_at("jana", start + Duration::from_secs(121))
                .await
        );
    }

    #[tokio::test]
    async fn test_expired_keys_are_evicted() {
        let limiter = limiter(5);
        let start = Instant::now();
        for i in 0..PRUNE_THRESHOLD + 10 {
            assert!(limiter.check_at(&format!("user-{}", i), start).await);
        }

        let later = start + Duration::from_secs(3600);
        assert!(limiter.check_at("jana", later).await);
        assert_eq!(limiter.entries.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_banned_keys_survive_eviction() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_attempts: 1,
            window_seconds: 60,
            ban_duration_seconds: 7200,
        });
        let start = Instant::now();
        assert!(limiter.check_at("mallory", start).await);
        assert!(!limiter.check_at("mallory", start).await);
        for i in 0..PRUNE_THRESHOLD {
            limiter.check_at(&format!("user-{}", i), start).await;
        }

        let later = start + Duration::from_secs(3600);
        limiter.check_at("jana", later).await;
        assert_eq!(limiter.entries.lock().await.len(), 2);
        assert!(!limiter.check_at("mallory", later).await);
    }

    #[tokio::test]
    async fn test_window_expiry_restores_attempts() {
        let limiter = limiter(2);
        let start = Instant::now();
        assert!(limiter.check_at("jana", start).await);
        assert!(limiter.check_at("jana", start).await);
        assert!(
            limiter
                .check_at("jana", start + Duration::from_secs(61))
                .await
        );
    }
}
