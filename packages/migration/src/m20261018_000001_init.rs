use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Statement};
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Tables {
    Table,
    Id,
    Name,
    DealOrder,
    MaxSideBet,
    SideBetPayouts,
    CreatedAt,
}

#[derive(Iden)]
enum MerchantTables {
    Table,
    Id,
    MerchantId,
    TableId,
    MinBet,
    MaxBet,
    BetRange,
    DecisionTime,
    BetUrl,
    WinUrl,
    RollbackUrl,
    ValidateTokenUrl,
    SchemaType,
    IsActive,
}

#[derive(Iden)]
enum Rounds {
    Table,
    Id,
    TableId,
    RoundCode,
    DealerCards,
    CardCount,
    BettingDeadline,
    InsuranceDeadline,
    Finished,
    FinishedDealing,
    ShowDealerCards,
    WasReset,
    PrevRoundId,
    DealerName,
    CreatedAt,
    UpdatedAt,
    LockVersion,
}

#[derive(Iden)]
enum PlayerRounds {
    Table,
    Id,
    RoundId,
    TableId,
    SeatNumber,
    UserId,
    MerchantId,
    UserName,
    UserToken,
    PlayerId,
    ConnectionId,
    Cards,
    Bets,
    TotalBet,
    InsuranceAmount,
    Actions,
    IsPlayerTurn,
    IsMakingDecision,
    FinishedTurn,
    DecisionDeadline,
    LastAction,
    Insurance,
    ExternalIds,
    Balance,
    WinningAmount,
    Archived,
    Rejected,
    IsReset,
    IsActive,
    Detail,
    InactivityCheckAt,
    CreatedAt,
    UpdatedAt,
    LockVersion,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // tables
        manager
            .create_table(
                Table::create()
                    .table(Tables::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tables::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tables::Name).string().not_null())
                    .col(
                        ColumnDef::new(Tables::DealOrder)
                            .string()
                            .not_null()
                            .default("sequential_hole_card"),
                    )
                    .col(
                        ColumnDef::new(Tables::MaxSideBet)
                            .double()
                            .not_null()
                            .default(25.0),
                    )
                    .col(ColumnDef::new(Tables::SideBetPayouts).json().null())
                    .col(
                        ColumnDef::new(Tables::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // merchant_tables
        manager
            .create_table(
                Table::create()
                    .table(MerchantTables::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MerchantTables::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(MerchantTables::MerchantId).string().not_null())
                    .col(ColumnDef::new(MerchantTables::TableId).string().not_null())
                    .col(ColumnDef::new(MerchantTables::MinBet).double().not_null())
                    .col(ColumnDef::new(MerchantTables::MaxBet).double().not_null())
                    .col(ColumnDef::new(MerchantTables::BetRange).json().not_null())
                    .col(
                        ColumnDef::new(MerchantTables::DecisionTime)
                            .integer()
                            .not_null()
                            .default(15),
                    )
                    .col(ColumnDef::new(MerchantTables::BetUrl).string().not_null())
                    .col(ColumnDef::new(MerchantTables::WinUrl).string().not_null())
                    .col(ColumnDef::new(MerchantTables::RollbackUrl).string().not_null())
                    .col(
                        ColumnDef::new(MerchantTables::ValidateTokenUrl)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MerchantTables::SchemaType)
                            .string()
                            .not_null()
                            .default("snake"),
                    )
                    .col(
                        ColumnDef::new(MerchantTables::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_merchant_tables_table_id")
                            .from(MerchantTables::Table, MerchantTables::TableId)
                            .to(Tables::Table, Tables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_merchant_tables_merchant_table")
                    .table(MerchantTables::Table)
                    .col(MerchantTables::MerchantId)
                    .col(MerchantTables::TableId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // rounds
        manager
            .create_table(
                Table::create()
                    .table(Rounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rounds::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Rounds::TableId).string().not_null())
                    .col(ColumnDef::new(Rounds::RoundCode).string().not_null())
                    .col(ColumnDef::new(Rounds::DealerCards).json().not_null())
                    .col(
                        ColumnDef::new(Rounds::CardCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rounds::BettingDeadline)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Rounds::InsuranceDeadline)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Rounds::Finished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Rounds::FinishedDealing)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Rounds::ShowDealerCards)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Rounds::WasReset)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Rounds::PrevRoundId).big_integer().null())
                    .col(ColumnDef::new(Rounds::DealerName).string().null())
                    .col(
                        ColumnDef::new(Rounds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rounds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rounds::LockVersion)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rounds_table_id")
                            .from(Rounds::Table, Rounds::TableId)
                            .to(Tables::Table, Tables::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_rounds_table_finished")
                    .table(Rounds::Table)
                    .col(Rounds::TableId)
                    .col(Rounds::Finished)
                    .to_owned(),
            )
            .await?;

        // One open round per table. Partial indexes are not expressible through
        // the index builder, both Postgres and SQLite accept this statement.
        let backend = manager.get_database_backend();
        manager
            .get_connection()
            .execute(Statement::from_string(
                backend,
                "CREATE UNIQUE INDEX IF NOT EXISTS ux_rounds_open_per_table \
                 ON rounds (table_id) WHERE finished = FALSE"
                    .to_string(),
            ))
            .await?;

        // player_rounds
        manager
            .create_table(
                Table::create()
                    .table(PlayerRounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlayerRounds::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(PlayerRounds::RoundId).big_integer().not_null())
                    .col(ColumnDef::new(PlayerRounds::TableId).string().not_null())
                    .col(
                        ColumnDef::new(PlayerRounds::SeatNumber)
                            .small_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlayerRounds::UserId).string().not_null())
                    .col(ColumnDef::new(PlayerRounds::MerchantId).string().not_null())
                    .col(ColumnDef::new(PlayerRounds::UserName).string().not_null())
                    .col(ColumnDef::new(PlayerRounds::UserToken).string().not_null())
                    .col(ColumnDef::new(PlayerRounds::PlayerId).string().not_null())
                    .col(ColumnDef::new(PlayerRounds::ConnectionId).string().null())
                    .col(ColumnDef::new(PlayerRounds::Cards).json().not_null())
                    .col(ColumnDef::new(PlayerRounds::Bets).json().not_null())
                    .col(
                        ColumnDef::new(PlayerRounds::TotalBet)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::InsuranceAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(PlayerRounds::Actions).json().not_null())
                    .col(
                        ColumnDef::new(PlayerRounds::IsPlayerTurn)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::IsMakingDecision)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::FinishedTurn)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::DecisionDeadline)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(PlayerRounds::LastAction).string().null())
                    .col(
                        ColumnDef::new(PlayerRounds::Insurance)
                            .string()
                            .not_null()
                            .default("undecided"),
                    )
                    .col(ColumnDef::new(PlayerRounds::ExternalIds).json().not_null())
                    .col(
                        ColumnDef::new(PlayerRounds::Balance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::WinningAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::Rejected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::IsReset)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(PlayerRounds::Detail).string().null())
                    .col(
                        ColumnDef::new(PlayerRounds::InactivityCheckAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlayerRounds::LockVersion)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_player_rounds_round_id")
                            .from(PlayerRounds::Table, PlayerRounds::RoundId)
                            .to(Rounds::Table, Rounds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_player_rounds_round_seat")
                    .table(PlayerRounds::Table)
                    .col(PlayerRounds::RoundId)
                    .col(PlayerRounds::SeatNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_player_rounds_identity")
                    .table(PlayerRounds::Table)
                    .col(PlayerRounds::RoundId)
                    .col(PlayerRounds::UserId)
                    .col(PlayerRounds::MerchantId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("ix_player_rounds_identity")
                    .table(PlayerRounds::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ux_player_rounds_round_seat")
                    .table(PlayerRounds::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PlayerRounds::Table).to_owned())
            .await?;

        let backend = manager.get_database_backend();
        manager
            .get_connection()
            .execute(Statement::from_string(
                backend,
                "DROP INDEX IF EXISTS ux_rounds_open_per_table".to_string(),
            ))
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_rounds_table_finished")
                    .table(Rounds::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Rounds::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ux_merchant_tables_merchant_table")
                    .table(MerchantTables::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(MerchantTables::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tables::Table).to_owned())
            .await?;

        Ok(())
    }
}
