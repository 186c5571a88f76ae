//! Table and merchant-table configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{DealOrder, SideBetPayouts};
use crate::errors::domain::{DomainError, NotFoundKind};
use crate::merchant::inflection::KeyCase;

pub const DEFAULT_MAX_SIDE_BET: f64 = 25.0;
pub const DEFAULT_DECISION_TIME_SECS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    pub id: String,
    pub name: String,
    pub deal_order: DealOrder,
    pub max_side_bet: f64,
    pub side_bet_payouts: SideBetPayouts,
}

impl TableConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            deal_order: DealOrder::default(),
            max_side_bet: DEFAULT_MAX_SIDE_BET,
            side_bet_payouts: SideBetPayouts::default(),
        }
    }
}

/// A merchant's limits and wallet endpoints for one table. Cached and used as
/// an immutable snapshot for the length of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantConfig {
    pub merchant_id: String,
    pub table_id: String,
    pub min_bet: f64,
    pub max_bet: f64,
    pub bet_range: Vec<f64>,
    pub decision_time_secs: i64,
    pub bet_url: String,
    pub win_url: String,
    pub rollback_url: String,
    pub validate_token_url: String,
    pub schema_type: KeyCase,
    pub is_active: bool,
}

#[async_trait]
pub trait TableRepo: Send + Sync {
    async fn find_table(&self, table_id: &str) -> Result<Option<TableConfig>, DomainError>;

    async fn list_tables(&self) -> Result<Vec<TableConfig>, DomainError>;

    async fn find_merchant_config(
        &self,
        merchant_id: &str,
        table_id: &str,
    ) -> Result<Option<MerchantConfig>, DomainError>;

    /// Active merchant configurations for a table.
    async fn list_merchant_configs(
        &self,
        table_id: &str,
    ) -> Result<Vec<MerchantConfig>, DomainError>;

    async fn upsert_table(&self, table: &TableConfig) -> Result<(), DomainError>;

    async fn upsert_merchant_config(&self, config: &MerchantConfig) -> Result<(), DomainError>;
}

pub async fn require_table(repo: &dyn TableRepo, table_id: &str) -> Result<TableConfig, DomainError> {
    repo.find_table(table_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Table, format!("Table {table_id} not found"))
    })
}
