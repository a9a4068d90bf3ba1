//! Per-kiosk state persistence between requests

use common::cache::RedisPool;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError, Weak},
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, error};
use tracking::KioskState;

use crate::error::{ApiError, ApiResult};

const MAX_KIOSK_ID_LEN: usize = 64;

/// Kiosk ids travel in URLs and Redis keys
pub fn validate_kiosk_id(kiosk_id: &str) -> ApiResult<()> {
    let valid = !kiosk_id.is_empty()
        && kiosk_id.len() <= MAX_KIOSK_ID_LEN
        && kiosk_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid kiosk id '{}'", kiosk_id)))
    }
}

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<String, KioskState>>>),
    Redis(RedisPool),
}

/// Kiosk state store, in process memory or in Redis
///
/// Handlers hold [`KioskStateStore::lock`] for the whole read-modify-write of
/// a kiosk so concurrent requests within this process never interleave.
#[derive(Clone)]
pub struct KioskStateStore {
    backend: Backend,
    locks: Arc<StdMutex<HashMap<String, Weak<Mutex<()>>>>>,
}

impl KioskStateStore {
    fn with_backend(backend: Backend) -> Self {
        Self {
            backend,
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    pub fn memory() -> Self {
        Self::with_backend(Backend::Memory(Arc::new(RwLock::new(HashMap::new()))))
    }

    pub fn redis(pool: RedisPool) -> Self {
        Self::with_backend(Backend::Redis(pool))
    }

    /// Exclusive access to one kiosk until the guard is dropped
    pub async fn lock(&self, kiosk_id: &str) -> ApiResult<OwnedMutexGuard<()>> {
        validate_kiosk_id(kiosk_id)?;

        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            match locks.get(kiosk_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    locks.retain(|_, lock| lock.strong_count() > 0);
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(kiosk_id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        Ok(lock.lock_owned().await)
    }

    fn redis_key(kiosk_id: &str) -> String {
        format!("kiosk:{}", kiosk_id)
    }

    /// Current state of a kiosk; unknown kiosks are logged out
    pub async fn get(&self, kiosk_id: &str) -> ApiResult<KioskState> {
        validate_kiosk_id(kiosk_id)?;

        match &self.backend {
            Backend::Memory(states) => Ok(states
                .read()
                .await
                .get(kiosk_id)
                .copied()
                .unwrap_or_default()),
            Backend::Redis(pool) => {
                let Some(raw) = pool.get(&Self::redis_key(kiosk_id)).await? else {
                    return Ok(KioskState::default());
                };
                serde_json::from_str(&raw).map_err(|e| {
                    error!("Corrupt state for kiosk {}: {}", kiosk_id, e);
                    ApiError::InternalServerError
                })
            }
        }
    }

    pub async fn set(&self, kiosk_id: &str, state: KioskState) -> ApiResult<()> {
        validate_kiosk_id(kiosk_id)?;
        debug!("Kiosk {} -> {:?}", kiosk_id, state);

        match &self.backend {
            Backend::Memory(states) => {
                let mut states = states.write().await;
                if state == KioskState::LoggedOut {
                    states.remove(kiosk_id);
                } else {
                    states.insert(kiosk_id.to_string(), state);
                }
                Ok(())
            }
            Backend::Redis(pool) => {
                let key = Self::redis_key(kiosk_id);
                if state == KioskState::LoggedOut {
                    pool.delete(&key).await?;
                } else {
                    let raw = serde_json::to_string(&state).map_err(|e| {
                        error!("Failed to serialize kiosk state: {}", e);
                        ApiError::InternalServerError
                    })?;
                    pool.set(&key, &raw, None).await?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_kiosk_id_validation() {
        assert!(validate_kiosk_id("entrance-1").is_ok());
        assert!(validate_kiosk_id("hall_B").is_ok());
        assert!(validate_kiosk_id("").is_err());
        assert!(validate_kiosk_id("a:b").is_err());
        assert!(validate_kiosk_id(&"x".repeat(65)).is_err());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = KioskStateStore::memory();
        assert_eq!(store.get("entrance").await.unwrap(), KioskState::LoggedOut);

        let state = KioskState::LoggedIn {
            user_id: Uuid::new_v4(),
        };
        store.set("entrance", state).await.unwrap();
        assert_eq!(store.get("entrance").await.unwrap(), state);
        assert_eq!(store.get("workshop").await.unwrap(), KioskState::LoggedOut);

        store.set("entrance", KioskState::LoggedOut).await.unwrap();
        assert_eq!(store.get("entrance").await.unwrap(), KioskState::LoggedOut);
    }

    #[tokio::test]
    async fn test_kiosk_lock_serialises_read_modify_write() {
        let store = KioskStateStore::memory();
        let user_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let _guard = store.lock("entrance").await.unwrap();
                let seen = store.get("entrance").await.unwrap();
                tokio::task::yield_now().await;
                if seen == KioskState::LoggedOut {
                    store
                        .set("entrance", KioskState::LoggedIn { user_id })
                        .await
                        .unwrap();
                    true
                } else {
                    false
                }
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_kiosk_locks_are_independent_and_released() {
        let store = KioskStateStore::memory();

        let entrance = store.lock("entrance").await.unwrap();
        let workshop = store.lock("workshop").await;
        assert!(workshop.is_ok());
        drop(workshop);
        drop(entrance);

        let _again = store.lock("entrance").await.unwrap();
        assert_eq!(store.locks.lock().unwrap().len(), 1);
        assert!(store.lock("a:b").await.is_err());
    }
}
