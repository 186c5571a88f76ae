//! Environment-driven configuration.

pub mod db;
pub mod engine;

pub use db::{database_url, redis_url, DbKind};
pub use engine::EngineConfig;

use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Required environment variable.
pub(crate) fn must_var(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::config(format!("{name} must be set")))
}

/// Optional variable parsed into `T`; unset falls back to `default`, an
/// unparsable value is a configuration error.
pub(crate) fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{name} has an invalid value: '{raw}'"))),
        Err(_) => Ok(default),
    }
}
