//! Cached balance movements. The shared cache is the source of truth for
//! what a player may stake until the merchant reports a new balance.

use crate::cache::{get_balance, keys, set_balance};
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::state::AppState;

pub async fn balance(state: &AppState, identity_key: &str) -> Result<f64, AppError> {
    Ok(get_balance(state.cache(), identity_key)
        .await?
        .unwrap_or(0.0))
}

/// Atomically take `amount`; a debit that would go negative is undone and
/// reported with `insufficient_message`.
pub async fn debit(
    state: &AppState,
    identity_key: &str,
    amount: f64,
    insufficient_message: &str,
) -> Result<f64, AppError> {
    let key = keys::balance(identity_key);
    let after = state.cache().incr_float(&key, -amount).await?;
    if after < 0.0 {
        state.cache().incr_float(&key, amount).await?;
        return Err(DomainError::validation(
            ValidationKind::InsufficientFunds,
            insufficient_message,
        )
        .into());
    }
    Ok(after)
}

pub async fn credit(state: &AppState, identity_key: &str, amount: f64) -> Result<f64, AppError> {
    state
        .cache()
        .incr_float(&keys::balance(identity_key), amount)
        .await
}

/// Replace the cached balance with the merchant's figure.
pub async fn resync(state: &AppState, identity_key: &str, balance: f64) -> Result<(), AppError> {
    set_balance(state.cache(), identity_key, balance).await
}
