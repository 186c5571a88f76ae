use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum HandAction {
    #[sea_orm(string_value = "hit")]
    Hit,
    #[sea_orm(string_value = "stand")]
    Stand,
    #[sea_orm(string_value = "double")]
    Double,
    #[sea_orm(string_value = "split_first")]
    SplitFirst,
    #[sea_orm(string_value = "split_second")]
    SplitSecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Insurance {
    #[sea_orm(string_value = "undecided")]
    Undecided,
    #[sea_orm(string_value = "taken")]
    Taken,
    #[sea_orm(string_value = "declined")]
    Declined,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "player_rounds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "round_id")]
    pub round_id: i64,
    #[sea_orm(column_name = "table_id")]
    pub table_id: String,
    #[sea_orm(column_name = "seat_number", column_type = "SmallInteger")]
    pub seat_number: i16,
    #[sea_orm(column_name = "user_id")]
    pub user_id: String,
    #[sea_orm(column_name = "merchant_id")]
    pub merchant_id: String,
    #[sea_orm(column_name = "user_name")]
    pub user_name: String,
    #[sea_orm(column_name = "user_token")]
    pub user_token: String,
    #[sea_orm(column_name = "player_id")]
    pub player_id: String,
    #[sea_orm(column_name = "connection_id")]
    pub connection_id: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub cards: Json,
    #[sea_orm(column_type = "Json")]
    pub bets: Json,
    #[sea_orm(column_name = "total_bet", column_type = "Double")]
    pub total_bet: f64,
    #[sea_orm(column_name = "insurance_amount", column_type = "Double")]
    pub insurance_amount: f64,
    #[sea_orm(column_type = "Json")]
    pub actions: Json,
    #[sea_orm(column_name = "is_player_turn")]
    pub is_player_turn: bool,
    #[sea_orm(column_name = "is_making_decision")]
    pub is_making_decision: bool,
    #[sea_orm(column_name = "finished_turn")]
    pub finished_turn: bool,
    #[sea_orm(column_name = "decision_deadline")]
    pub decision_deadline: Option<OffsetDateTime>,
    #[sea_orm(column_name = "last_action")]
    pub last_action: Option<HandAction>,
    pub insurance: Insurance,
    #[sea_orm(column_name = "external_ids", column_type = "Json")]
    pub external_ids: Json,
    #[sea_orm(column_type = "Double")]
    pub balance: f64,
    #[sea_orm(column_name = "winning_amount", column_type = "Double")]
    pub winning_amount: f64,
    pub archived: bool,
    pub rejected: bool,
    #[sea_orm(column_name = "is_reset")]
    pub is_reset: bool,
    #[sea_orm(column_name = "is_active")]
    pub is_active: bool,
    pub detail: Option<String>,
    #[sea_orm(column_name = "inactivity_check_at")]
    pub inactivity_check_at: Option<OffsetDateTime>,
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
        belongs_to = "super::rounds::Entity",
        from = "Column::RoundId",
        to = "super::rounds::Column::Id"
    )]
    Round,
}

impl Related<super::rounds::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Round.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
