//! Row conversions for table and merchant-table configuration.

use sea_orm::{NotSet, Set};
use time::OffsetDateTime;

use crate::adapters::json_columns::{decode, encode};
use crate::domain::{DealOrder, SideBetPayouts};
use crate::entities::merchant_tables::{self, SchemaType};
use crate::entities::tables;
use crate::errors::domain::DomainError;
use crate::merchant::inflection::KeyCase;
use crate::repos::tables::{MerchantConfig, TableConfig};

impl From<tables::DealOrder> for DealOrder {
    fn from(value: tables::DealOrder) -> Self {
        match value {
            tables::DealOrder::SequentialHoleCard => DealOrder::SequentialHoleCard,
            tables::DealOrder::UpfrontTwoCard => DealOrder::UpfrontTwoCard,
        }
    }
}

impl From<DealOrder> for tables::DealOrder {
    fn from(value: DealOrder) -> Self {
        match value {
            DealOrder::SequentialHoleCard => tables::DealOrder::SequentialHoleCard,
            DealOrder::UpfrontTwoCard => tables::DealOrder::UpfrontTwoCard,
        }
    }
}

impl From<SchemaType> for KeyCase {
    fn from(value: SchemaType) -> Self {
        match value {
            SchemaType::Camel => KeyCase::Camel,
            SchemaType::CapitalCamel => KeyCase::CapitalCamel,
            SchemaType::Snake => KeyCase::Snake,
        }
    }
}

impl From<KeyCase> for SchemaType {
    fn from(value: KeyCase) -> Self {
        match value {
            KeyCase::Camel => SchemaType::Camel,
            KeyCase::CapitalCamel => SchemaType::CapitalCamel,
            KeyCase::Snake => SchemaType::Snake,
        }
    }
}

impl TryFrom<tables::Model> for TableConfig {
    type Error = DomainError;

    fn try_from(m: tables::Model) -> Result<Self, Self::Error> {
        let side_bet_payouts = match m.side_bet_payouts {
            Some(json) => decode(json, "side_bet_payouts")?,
            None => SideBetPayouts::default(),
        };
        Ok(TableConfig {
            id: m.id,
            name: m.name,
            deal_order: m.deal_order.into(),
            max_side_bet: m.max_side_bet,
            side_bet_payouts,
        })
    }
}

impl TryFrom<merchant_tables::Model> for MerchantConfig {
    type Error = DomainError;

    fn try_from(m: merchant_tables::Model) -> Result<Self, Self::Error> {
        Ok(MerchantConfig {
            merchant_id: m.merchant_id,
            table_id: m.table_id,
            min_bet: m.min_bet,
            max_bet: m.max_bet,
            bet_range: decode(m.bet_range, "bet_range")?,
            decision_time_secs: i64::from(m.decision_time),
            bet_url: m.bet_url,
            win_url: m.win_url,
            rollback_url: m.rollback_url,
            validate_token_url: m.validate_token_url,
            schema_type: m.schema_type.into(),
            is_active: m.is_active,
        })
    }
}

pub fn table_row(table: &TableConfig) -> Result<tables::ActiveModel, DomainError> {
    Ok(tables::ActiveModel {
        id: Set(table.id.clone()),
        name: Set(table.name.clone()),
        deal_order: Set(table.deal_order.into()),
        max_side_bet: Set(table.max_side_bet),
        side_bet_payouts: Set(Some(encode(&table.side_bet_payouts, "side_bet_payouts")?)),
        created_at: Set(OffsetDateTime::now_utc()),
    })
}

pub fn merchant_row(config: &MerchantConfig) -> Result<merchant_tables::ActiveModel, DomainError> {
    Ok(merchant_tables::ActiveModel {
        id: NotSet,
        merchant_id: Set(config.merchant_id.clone()),
        table_id: Set(config.table_id.clone()),
        min_bet: Set(config.min_bet),
        max_bet: Set(config.max_bet),
        bet_range: Set(encode(&config.bet_range, "bet_range")?),
        decision_time: Set(i32::try_from(config.decision_time_secs).unwrap_or(i32::MAX)),
        bet_url: Set(config.bet_url.clone()),
        win_url: Set(config.win_url.clone()),
        rollback_url: Set(config.rollback_url.clone()),
        validate_token_url: Set(config.validate_token_url.clone()),
        schema_type: Set(config.schema_type.into()),
        is_active: Set(config.is_active),
    })
}
