//! SeaORM adapter for the rounds repository.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, NotSet,
    QueryFilter, QueryOrder, Set,
};
use time::OffsetDateTime;

use crate::entities::rounds;
use crate::errors::domain::DomainError;
use crate::infra::db_errors::{map_db_err, OPTIMISTIC_LOCK_PREFIX};
use crate::repos::rounds::{Round, RoundCreate, RoundRepo};

pub mod dto;

/// Apply `update` to the row if its version is still `current_lock_version`,
/// bumping the version, then refetch.
async fn optimistic_update_then_fetch<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    id: i64,
    current_lock_version: i32,
    update: rounds::ActiveModel,
) -> Result<rounds::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();

    let result = rounds::Entity::update_many()
        .set(update)
        .col_expr(rounds::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            rounds::Column::LockVersion,
            Expr::col(rounds::Column::LockVersion).add(1),
        )
        .filter(rounds::Column::Id.eq(id))
        .filter(rounds::Column::LockVersion.eq(current_lock_version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return match rounds::Entity::find_by_id(id).one(conn).await? {
            Some(row) => Err(sea_orm::DbErr::Custom(format!(
                "{OPTIMISTIC_LOCK_PREFIX}{{\"expected\":{},\"actual\":{}}}",
                current_lock_version, row.lock_version
            ))),
            None => Err(sea_orm::DbErr::RecordNotFound(format!(
                "Round {id} not found"
            ))),
        };
    }

    rounds::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("Round {id} not found")))
}

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_id: i64,
) -> Result<Option<rounds::Model>, sea_orm::DbErr> {
    rounds::Entity::find_by_id(round_id).one(conn).await
}

pub async fn find_open<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: &str,
) -> Result<Option<rounds::Model>, sea_orm::DbErr> {
    rounds::Entity::find()
        .filter(rounds::Column::TableId.eq(table_id))
        .filter(rounds::Column::Finished.eq(false))
        .order_by_desc(rounds::Column::Id)
        .one(conn)
        .await
}

pub async fn find_successor<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    prev_round_id: i64,
) -> Result<Option<rounds::Model>, sea_orm::DbErr> {
    rounds::Entity::find()
        .filter(rounds::Column::PrevRoundId.eq(prev_round_id))
        .one(conn)
        .await
}

pub async fn create_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: RoundCreate,
) -> Result<rounds::Model, sea_orm::DbErr> {
    let now = OffsetDateTime::now_utc();
    let round = rounds::ActiveModel {
        id: NotSet,
        table_id: Set(dto.table_id),
        round_code: Set(dto.round_code),
        dealer_cards: Set(serde_json::json!([])),
        card_count: Set(0),
        betting_deadline: Set(None),
        insurance_deadline: Set(None),
        finished: Set(false),
        finished_dealing: Set(false),
        show_dealer_cards: Set(false),
        was_reset: Set(false),
        prev_round_id: Set(dto.prev_round_id),
        dealer_name: Set(dto.dealer_name),
        created_at: Set(now),
        updated_at: Set(now),
        lock_version: Set(1),
    };

    round.insert(conn).await
}

pub async fn finish_open<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    table_id: &str,
) -> Result<u64, sea_orm::DbErr> {
    let result = rounds::Entity::update_many()
        .col_expr(rounds::Column::Finished, Expr::value(true))
        .col_expr(
            rounds::Column::UpdatedAt,
            Expr::value(OffsetDateTime::now_utc()),
        )
        .col_expr(
            rounds::Column::LockVersion,
            Expr::col(rounds::Column::LockVersion).add(1),
        )
        .filter(rounds::Column::TableId.eq(table_id))
        .filter(rounds::Column::Finished.eq(false))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// SeaORM implementation of [`RoundRepo`].
#[derive(Debug, Clone)]
pub struct RoundRepoSea {
    db: DatabaseConnection,
}

impl RoundRepoSea {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RoundRepo for RoundRepoSea {
    async fn find_by_id(&self, round_id: i64) -> Result<Option<Round>, DomainError> {
        find_by_id(&self.db, round_id)
            .await
            .map_err(map_db_err)?
            .map(Round::try_from)
            .transpose()
    }

    async fn find_open(&self, table_id: &str) -> Result<Option<Round>, DomainError> {
        find_open(&self.db, table_id)
            .await
            .map_err(map_db_err)?
            .map(Round::try_from)
            .transpose()
    }

    async fn find_successor(&self, prev_round_id: i64) -> Result<Option<Round>, DomainError> {
        find_successor(&self.db, prev_round_id)
            .await
            .map_err(map_db_err)?
            .map(Round::try_from)
            .transpose()
    }

    async fn create(&self, dto: RoundCreate) -> Result<Round, DomainError> {
        create_round(&self.db, dto)
            .await
            .map_err(map_db_err)?
            .try_into()
    }

    async fn update_if_version(&self, round: &Round) -> Result<Round, DomainError> {
        let update = dto::mutable_columns(round)?;
        optimistic_update_then_fetch(&self.db, round.id, round.lock_version, update)
            .await
            .map_err(map_db_err)?
            .try_into()
    }

    async fn finish_open(&self, table_id: &str) -> Result<u64, DomainError> {
        finish_open(&self.db, table_id).await.map_err(map_db_err)
    }
}
