//! SeaORM adapter for table configuration.

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{merchant_tables, tables};
use crate::errors::domain::DomainError;
use crate::infra::db_errors::map_db_err;
use crate::repos::tables::{MerchantConfig, TableConfig, TableRepo};

pub mod dto;

/// SeaORM implementation of [`TableRepo`].
#[derive(Debug, Clone)]
pub struct TableRepoSea {
    db: DatabaseConnection,
}

impl TableRepoSea {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TableRepo for TableRepoSea {
    async fn find_table(&self, table_id: &str) -> Result<Option<TableConfig>, DomainError> {
        tables::Entity::find_by_id(table_id.to_string())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(TableConfig::try_from)
            .transpose()
    }

    async fn list_tables(&self) -> Result<Vec<TableConfig>, DomainError> {
        tables::Entity::find()
            .order_by_asc(tables::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(TableConfig::try_from)
            .collect()
    }

    async fn find_merchant_config(
        &self,
        merchant_id: &str,
        table_id: &str,
    ) -> Result<Option<MerchantConfig>, DomainError> {
        merchant_tables::Entity::find()
            .filter(merchant_tables::Column::MerchantId.eq(merchant_id))
            .filter(merchant_tables::Column::TableId.eq(table_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(MerchantConfig::try_from)
            .transpose()
    }

    async fn list_merchant_configs(
        &self,
        table_id: &str,
    ) -> Result<Vec<MerchantConfig>, DomainError> {
        merchant_tables::Entity::find()
            .filter(merchant_tables::Column::TableId.eq(table_id))
            .filter(merchant_tables::Column::IsActive.eq(true))
            .order_by_asc(merchant_tables::Column::MerchantId)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(MerchantConfig::try_from)
            .collect()
    }

    async fn upsert_table(&self, table: &TableConfig) -> Result<(), DomainError> {
        tables::Entity::insert(dto::table_row(table)?)
            .on_conflict(
                OnConflict::column(tables::Column::Id)
                    .update_columns([
                        tables::Column::Name,
                        tables::Column::DealOrder,
                        tables::Column::MaxSideBet,
                        tables::Column::SideBetPayouts,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn upsert_merchant_config(&self, config: &MerchantConfig) -> Result<(), DomainError> {
        merchant_tables::Entity::insert(dto::merchant_row(config)?)
            .on_conflict(
                OnConflict::columns([
                    merchant_tables::Column::MerchantId,
                    merchant_tables::Column::TableId,
                ])
                .update_columns([
                    merchant_tables::Column::MinBet,
                    merchant_tables::Column::MaxBet,
                    merchant_tables::Column::BetRange,
                    merchant_tables::Column::DecisionTime,
                    merchant_tables::Column::BetUrl,
                    merchant_tables::Column::WinUrl,
                    merchant_tables::Column::RollbackUrl,
                    merchant_tables::Column::ValidateTokenUrl,
                    merchant_tables::Column::SchemaType,
                    merchant_tables::Column::IsActive,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}
