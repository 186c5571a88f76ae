use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum DealOrder {
    #[sea_orm(string_value = "sequential_hole_card")]
    SequentialHoleCard,
    #[sea_orm(string_value = "upfront_two_card")]
    UpfrontTwoCard,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_name = "deal_order")]
    pub deal_order: DealOrder,
    #[sea_orm(column_name = "max_side_bet", column_type = "Double")]
    pub max_side_bet: f64,
    #[sea_orm(column_name = "side_bet_payouts", column_type = "Json", nullable)]
    pub side_bet_payouts: Option<Json>,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::merchant_tables::Entity")]
    MerchantTables,
    #[sea_orm(has_many = "super::rounds::Entity")]
    Rounds,
}

impl Related<super::merchant_tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MerchantTables.def()
    }
}

impl Related<super::rounds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rounds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
