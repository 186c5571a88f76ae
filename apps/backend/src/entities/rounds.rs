use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rounds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "table_id")]
    pub table_id: String,
    #[sea_orm(column_name = "round_code")]
    pub round_code: String,
    #[sea_orm(column_name = "dealer_cards", column_type = "Json")]
    pub dealer_cards: Json,
    #[sea_orm(column_name = "card_count")]
    pub card_count: i32,
    #[sea_orm(column_name = "betting_deadline")]
    pub betting_deadline: Option<OffsetDateTime>,
    #[sea_orm(column_name = "insurance_deadline")]
    pub insurance_deadline: Option<OffsetDateTime>,
    pub finished: bool,
    #[sea_orm(column_name = "finished_dealing")]
    pub finished_dealing: bool,
    #[sea_orm(column_name = "show_dealer_cards")]
    pub show_dealer_cards: bool,
    #[sea_orm(column_name = "was_reset")]
    pub was_reset: bool,
    #[sea_orm(column_name = "prev_round_id")]
    pub prev_round_id: Option<i64>,
    #[sea_orm(column_name = "dealer_name")]
    pub dealer_name: Option<String>,
    #[sea_orm(column_name = "created_at")]
    pub created_at: OffsetDateTime,
    #[sea_orm(column_name = "updated_at")]
    pub updated_at: OffsetDateTime,
    #[sea_orm(column_name = "lock_version")]
    pub lock_version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tables::Entity",
        from = "Column::TableId",
        to = "super::tables::Column::Id"
    )]
    Table,
    #[sea_orm(has_many = "super::player_rounds::Entity")]
    PlayerRounds,
}

impl Related<super::tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Table.def()
    }
}

impl Related<super::player_rounds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlayerRounds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
