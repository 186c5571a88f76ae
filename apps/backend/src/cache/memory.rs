//! Process-local [`SharedCache`] for tests and single-node runs.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;

use super::SharedCache;
use crate::error::AppError;
use crate::errors::ErrorCode;

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    slots: DashMap<String, Slot>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.slots.iter().filter(|s| s.live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) {
        self.slots.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }
}

#[async_trait]
impl SharedCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let now = Instant::now();
        Ok(self
            .slots
            .get(key)
            .filter(|slot| slot.live(now))
            .map(|slot| slot.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.put(key, value.to_string(), None);
        Ok(())
    }

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        self.put(key, value.to_string(), Some(ttl));
        Ok(())
    }

    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        match self.slots.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().live(now) {
                    return Ok(false);
                }
                occupied.insert(Slot {
                    value: value.to_string(),
                    expires_at: None,
                });
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    value: value.to_string(),
                    expires_at: None,
                });
                Ok(true)
            }
        }
    }

    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64, AppError> {
        let now = Instant::now();
        let mut slot = self.slots.entry(key.to_string()).or_insert_with(|| Slot {
            value: "0".to_string(),
            expires_at: None,
        });
        let current = if slot.live(now) {
            slot.value.parse::<f64>().map_err(|e| {
                AppError::internal(ErrorCode::CacheError, "Value is not a valid float", e)
            })?
        } else {
            0.0
        };
        let next = current + delta;
        slot.value = next.to_string();
        Ok(next)
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.slots.remove(key);
        Ok(())
    }
}
