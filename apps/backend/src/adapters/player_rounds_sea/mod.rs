//! SeaORM adapter for seat participations.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use time::OffsetDateTime;

use crate::entities::player_rounds;
use crate::errors::domain::DomainError;
use crate::infra::db_errors::{map_db_err, OPTIMISTIC_LOCK_PREFIX};
use crate::repos::player_rounds::{NewPlayerRound, PlayerRound, PlayerRoundRepo};

pub mod dto;

async fn optimistic_update_then_fetch<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    current_lock_version: i32,
    update: player_rounds::ActiveModel,
) -> Result<player_rounds::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();

    let result = player_rounds::Entity::update_many()
        .set(update)
        .col_expr(player_rounds::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            player_rounds::Column::LockVersion,
            Expr::col(player_rounds::Column::LockVersion).add(1),
        )
        .filter(player_rounds::Column::Id.eq(id))
        .filter(player_rounds::Column::LockVersion.eq(current_lock_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return match player_rounds::Entity::find_by_id(id).one(conn).await? {
            Some(row) => Err(sea_orm::DbErr::Custom(format!(
                "{OPTIMISTIC_LOCK_PREFIX}{{\"expected\":{},\"actual\":{}}}",
                current_lock_version, row.lock_version
            ))),
            None => Err(sea_orm::DbErr::RecordNotFound(format!(
                "Player round {id} not found"
            ))),
        };
    }

    player_rounds::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("Player round {id} not found")))
}

pub async fn find_by_seat<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
    seat_number: i16,
) -> Result<Option<player_rounds::Model>, sea_orm::DbErr> {
    player_rounds::Entity::find()
        .filter(player_rounds::Column::RoundId.eq(round_id))
        .filter(player_rounds::Column::SeatNumber.eq(seat_number))
        .one(conn)
        .await
}

pub async fn list_by_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
) -> Result<Vec<player_rounds::Model>, sea_orm::DbErr> {
    player_rounds::Entity::find()
        .filter(player_rounds::Column::RoundId.eq(round_id))
        .order_by_asc(player_rounds::Column::SeatNumber)
        .all(conn)
        .await
}

pub async fn list_open_by_identity<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: &str,
    user_id: &str,
    merchant_id: &str,
) -> Result<Vec<player_rounds::Model>, sea_orm::DbErr> {
    player_rounds::Entity::find()
        .filter(player_rounds::Column::TableId.eq(table_id))
        .filter(player_rounds::Column::UserId.eq(user_id))
        .filter(player_rounds::Column::MerchantId.eq(merchant_id))
        .filter(player_rounds::Column::Archived.eq(false))
        .order_by_asc(player_rounds::Column::SeatNumber)
        .all(conn)
        .await
}

pub async fn find_current_turn<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
) -> Result<Option<player_rounds::Model>, sea_orm::DbErr> {
    player_rounds::Entity::find()
        .filter(player_rounds::Column::RoundId.eq(round_id))
        .filter(player_rounds::Column::IsPlayerTurn.eq(true))
        .one(conn)
        .await
}

pub async fn sum_total_bet<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
    user_id: &str,
    merchant_id: &str,
) -> Result<f64, sea_orm::DbErr> {
    let total: Option<Option<f64>> = player_rounds::Entity::find()
        .select_only()
        .column_as(player_rounds::Column::TotalBet.sum(), "total")
        .filter(player_rounds::Column::RoundId.eq(round_id))
        .filter(player_rounds::Column::UserId.eq(user_id))
        .filter(player_rounds::Column::MerchantId.eq(merchant_id))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(total.flatten().unwrap_or(0.0))
}

/// SeaORM implementation of [`PlayerRoundRepo`].
#[derive(Debug, Clone)]
pub struct PlayerRoundRepoSea {
    db: DatabaseConnection,
}

impl PlayerRoundRepoSea {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn convert_all(rows: Vec<player_rounds::Model>) -> Result<Vec<PlayerRound>, DomainError> {
    rows.into_iter().map(PlayerRound::try_from).collect()
}

#[async_trait]
impl PlayerRoundRepo for PlayerRoundRepoSea {
    async fn find_by_id(&self, id: i64) -> Result<Option<PlayerRound>, DomainError> {
        player_rounds::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(PlayerRound::try_from)
            .transpose()
    }

    async fn find_by_seat(
        &self,
        round_id: i64,
        seat_number: i16,
    ) -> Result<Option<PlayerRound>, DomainError> {
        find_by_seat(&self.db, round_id, seat_number)
            .await
            .map_err(map_db_err)?
            .map(PlayerRound::try_from)
            .transpose()
    }

    async fn list_by_round(&self, round_id: i64) -> Result<Vec<PlayerRound>, DomainError> {
        convert_all(list_by_round(&self.db, round_id).await.map_err(map_db_err)?)
    }

    async fn list_open_by_identity(
        &self,
        table_id: &str,
        user_id: &str,
        merchant_id: &str,
    ) -> Result<Vec<PlayerRound>, DomainError> {
        convert_all(
            list_open_by_identity(&self.db, table_id, user_id, merchant_id)
                .await
                .map_err(map_db_err)?,
        )
    }

    async fn find_current_turn(&self, round_id: i64) -> Result<Option<PlayerRound>, DomainError> {
        find_current_turn(&self.db, round_id)
            .await
            .map_err(map_db_err)?
            .map(PlayerRound::try_from)
            .transpose()
    }

    async fn insert(&self, dto: NewPlayerRound) -> Result<PlayerRound, DomainError> {
        let row = dto::new_row(dto, OffsetDateTime::now_utc())?;
        row.insert(&self.db).await.map_err(map_db_err)?.try_into()
    }

    async fn update_if_version(&self, player: &PlayerRound) -> Result<PlayerRound, DomainError> {
        let update = dto::mutable_columns(player)?;
        optimistic_update_then_fetch(&self.db, player.id, player.lock_version, update)
            .await
            .map_err(map_db_err)?
            .try_into()
    }

    async fn sum_total_bet(
        &self,
        round_id: i64,
        user_id: &str,
        merchant_id: &str,
    ) -> Result<f64, DomainError> {
        sum_total_bet(&self.db, round_id, user_id, merchant_id)
            .await
            .map_err(map_db_err)
    }
}
