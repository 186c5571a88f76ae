//! Configuration snapshots used for the length of one operation.

use tracing::debug;

use crate::cache::{get_json, keys, set_json};
use crate::error::AppError;
use crate::errors::domain::{DomainError, NotFoundKind};
use crate::repos::tables::require_table;
use crate::repos::{MerchantConfig, TableConfig};
use crate::state::AppState;

pub async fn table_config(state: &AppState, table_id: &str) -> Result<TableConfig, AppError> {
    if let Some(config) = state.table_configs().get(table_id).await {
        return Ok(config);
    }
    let config = require_table(state.tables.as_ref(), table_id).await?;
    state
        .table_configs()
        .insert(table_id.to_string(), config.clone())
        .await;
    Ok(config)
}

/// Merchant-table settings, served from the shared cache when present.
pub async fn merchant_config(
    state: &AppState,
    merchant_id: &str,
    table_id: &str,
) -> Result<MerchantConfig, AppError> {
    let key = keys::merchant_config(merchant_id, table_id);
    if let Some(config) = get_json::<MerchantConfig>(state.cache(), &key).await? {
        return Ok(config);
    }

    let config = state
        .tables
        .find_merchant_config(merchant_id, table_id)
        .await?
        .filter(|config| config.is_active)
        .ok_or_else(|| {
            DomainError::not_found(
                NotFoundKind::Merchant,
                format!("Merchant {merchant_id} is not configured for table {table_id}"),
            )
        })?;
    debug!(merchant_id, table_id, "caching merchant configuration");
    set_json(
        state.cache(),
        &key,
        &config,
        Some(state.config.merchant_cache_ttl),
    )
    .await?;
    Ok(config)
}
