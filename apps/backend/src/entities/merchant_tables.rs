use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Key naming convention a merchant expects in request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum SchemaType {
    #[sea_orm(string_value = "camel")]
    Camel,
    #[sea_orm(string_value = "capital_camel")]
    CapitalCamel,
    #[sea_orm(string_value = "snake")]
    Snake,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "merchant_tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "merchant_id")]
    pub merchant_id: String,
    #[sea_orm(column_name = "table_id")]
    pub table_id: String,
    #[sea_orm(column_name = "min_bet", column_type = "Double")]
    pub min_bet: f64,
    #[sea_orm(column_name = "max_bet", column_type = "Double")]
    pub max_bet: f64,
    #[sea_orm(column_name = "bet_range", column_type = "Json")]
    pub bet_range: Json,
    #[sea_orm(column_name = "decision_time")]
    pub decision_time: i32,
    #[sea_orm(column_name = "bet_url")]
    pub bet_url: String,
    #[sea_orm(column_name = "win_url")]
    pub win_url: String,
    #[sea_orm(column_name = "rollback_url")]
    pub rollback_url: String,
    #[sea_orm(column_name = "validate_token_url")]
    pub validate_token_url: String,
    #[sea_orm(column_name = "schema_type")]
    pub schema_type: SchemaType,
    #[sea_orm(column_name = "is_active")]
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tables::Entity",
        from = "Column::TableId",
        to = "super::tables::Column::Id"
    )]
    Table,
}

impl Related<super::tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Table.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
