//! Shared key/value cache: seat claims, balances, seat order, repeat data and
//! configuration snapshots. Every engine node sees the same cache.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::errors::ErrorCode;

pub mod keys;
pub mod memory;
pub mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

#[async_trait]
pub trait SharedCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;

    /// Set only when absent. Returns whether this call stored the value.
    async fn set_nx(&self, key: &str, value: &str) -> Result<bool, AppError>;

    /// Atomically add `delta` to a numeric value (missing counts as 0) and
    /// return the new value.
    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn SharedCache,
    key: &str,
) -> Result<Option<T>, AppError> {
    match cache.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize + Sync>(
    cache: &dyn SharedCache,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(value).map_err(|e| {
        AppError::internal(ErrorCode::Internal, "Failed to encode cache value", e)
    })?;
    match ttl {
        Some(ttl) => cache.setex(key, &raw, ttl).await,
        None => cache.set(key, &raw).await,
    }
}

/// Cached balance of an identity; `None` when it has never been loaded.
pub async fn get_balance(cache: &dyn SharedCache, identity_key: &str) -> Result<Option<f64>, AppError> {
    match cache.get(&keys::balance(identity_key)).await? {
        Some(raw) => raw.parse::<f64>().map(Some).map_err(|e| {
            AppError::internal(ErrorCode::DataCorruption, "Cached balance is not a number", e)
        }),
        None => Ok(None),
    }
}

pub async fn set_balance(
    cache: &dyn SharedCache,
    identity_key: &str,
    balance: f64,
) -> Result<(), AppError> {
    cache
        .set(&keys::balance(identity_key), &balance.to_string())
        .await
}
