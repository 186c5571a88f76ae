//! The same contract run against the in-memory store and the SeaORM
//! adapters on SQLite.

use std::sync::Arc;

use blackjack_backend::adapters::{MemoryStore, PlayerRoundRepoSea, RoundRepoSea, TableRepoSea};
use blackjack_backend::domain::{BetKind, DealOrder, ExternalKey, InsuranceDecision};
use blackjack_backend::errors::domain::{ConflictKind, DomainError};
use blackjack_backend::infra::db::bootstrap_db;
use blackjack_backend::merchant::KeyCase;
use blackjack_backend::repos::{
    MerchantConfig, NewPlayerRound, PlayerIdentity, PlayerRoundRepo, RoundCreate, RoundRepo,
    TableConfig, TableRepo,
};
use blackjack_backend::{AppError, DbKind};

struct Store {
    name: &'static str,
    rounds: Arc<dyn RoundRepo>,
    players: Arc<dyn PlayerRoundRepo>,
    tables: Arc<dyn TableRepo>,
}

async fn stores() -> Result<Vec<Store>, AppError> {
    let memory = Arc::new(MemoryStore::new());
    let conn = bootstrap_db(&DbKind::SqliteMemory).await?;
    Ok(vec![
        Store {
            name: "memory",
            rounds: memory.clone(),
            players: memory.clone(),
            tables: memory,
        },
        Store {
            name: "sqlite",
            rounds: Arc::new(RoundRepoSea::new(conn.clone())),
            players: Arc::new(PlayerRoundRepoSea::new(conn.clone())),
            tables: Arc::new(TableRepoSea::new(conn)),
        },
    ])
}

fn identity(user: &str) -> PlayerIdentity {
    PlayerIdentity {
        user_id: user.to_string(),
        merchant_id: "m1".to_string(),
        user_name: format!("{user}-name"),
        user_token: format!("tok-{user}"),
        player_id: format!("{user}m1"),
    }
}

async fn open_round(store: &Store, table: &str, prev: Option<i64>) -> Result<i64, AppError> {
    store
        .tables
        .upsert_table(&TableConfig::new(table, "Table"))
        .await?;
    let round = store
        .rounds
        .create(RoundCreate {
            table_id: table.to_string(),
            round_code: "ABC123".to_string(),
            prev_round_id: prev,
            dealer_name: None,
        })
        .await?;
    Ok(round.id)
}

#[tokio::test]
async fn tables_and_merchant_configs_round_trip() -> Result<(), AppError> {
    for store in stores().await? {
        let mut table = TableConfig::new("t1", "First");
        table.deal_order = DealOrder::UpfrontTwoCard;
        store.tables.upsert_table(&table).await?;
        table.name = "Renamed".to_string();
        store.tables.upsert_table(&table).await?;

        let found = store.tables.find_table("t1").await?.unwrap();
        assert_eq!(found, table, "{}", store.name);
        assert_eq!(store.tables.list_tables().await?.len(), 1, "{}", store.name);

        let config = MerchantConfig {
            merchant_id: "m1".to_string(),
            table_id: "t1".to_string(),
            min_bet: 1.0,
            max_bet: 200.0,
            bet_range: vec![1.0, 10.0],
            decision_time_secs: 12,
            bet_url: "http://m/bet".to_string(),
            win_url: "http://m/win".to_string(),
            rollback_url: "http://m/rollback".to_string(),
            validate_token_url: "http://m/validate".to_string(),
            schema_type: KeyCase::Camel,
            is_active: true,
        };
        store.tables.upsert_merchant_config(&config).await?;
        let found = store.tables.find_merchant_config("m1", "t1").await?;
        assert_eq!(found, Some(config), "{}", store.name);
        assert!(store.tables.find_merchant_config("m2", "t1").await?.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn one_open_round_per_table() -> Result<(), AppError> {
    for store in stores().await? {
        let first = open_round(&store, "t1", None).await?;
        let open = store.rounds.find_open("t1").await?.unwrap();
        assert_eq!(open.id, first, "{}", store.name);
        assert!(!open.finished);

        let finished = store.rounds.finish_open("t1").await?;
        assert_eq!(finished, 1, "{}", store.name);
        assert!(store.rounds.find_open("t1").await?.is_none());

        let second = open_round(&store, "t1", Some(first)).await?;
        let successor = store.rounds.find_successor(first).await?.unwrap();
        assert_eq!(successor.id, second, "{}", store.name);
        assert!(store.rounds.find_successor(second).await?.is_none());
    }
    Ok(())
}

#[tokio::test]
async fn stale_round_write_is_an_optimistic_lock_conflict() -> Result<(), AppError> {
    for store in stores().await? {
        let id = open_round(&store, "t1", None).await?;
        let loaded = store.rounds.find_by_id(id).await?.unwrap();

        let mut first = loaded.clone();
        first.card_count = 1;
        let saved = store.rounds.update_if_version(&first).await?;
        assert_eq!(saved.lock_version, loaded.lock_version + 1, "{}", store.name);

        let mut stale = loaded;
        stale.card_count = 2;
        let err = store.rounds.update_if_version(&stale).await.unwrap_err();
        assert!(
            matches!(err, DomainError::Conflict(ConflictKind::OptimisticLock, _)),
            "{}: {err:?}",
            store.name
        );
        assert_eq!(store.rounds.find_by_id(id).await?.unwrap().card_count, 1);
    }
    Ok(())
}

#[tokio::test]
async fn seat_rows_are_unique_per_round() -> Result<(), AppError> {
    for store in stores().await? {
        let round_id = open_round(&store, "t1", None).await?;
        store
            .players
            .insert(NewPlayerRound::empty(round_id, "t1", 1, identity("u1"), None, 50.0))
            .await?;
        let err = store
            .players
            .insert(NewPlayerRound::empty(round_id, "t1", 1, identity("u2"), None, 50.0))
            .await
            .unwrap_err();
        assert!(
            matches!(err, DomainError::Conflict(ConflictKind::SeatTaken, _)),
            "{}: {err:?}",
            store.name
        );
    }
    Ok(())
}

#[tokio::test]
async fn seat_state_survives_a_write() -> Result<(), AppError> {
    for store in stores().await? {
        let round_id = open_round(&store, "t1", None).await?;
        let mut seat = store
            .players
            .insert(NewPlayerRound::empty(round_id, "t1", 3, identity("u1"), None, 90.0))
            .await?;

        seat.bets.line_mut(BetKind::Primary).add(10.0);
        seat.bets.line_mut(BetKind::PerfectPair).add(2.0);
        seat.total_bet = seat.bets.total();
        seat.cards = vec!["1AC".parse()?, "2KD".parse()?];
        seat.insurance = InsuranceDecision::Declined;
        seat.is_player_turn = true;
        seat.external_ids.insert(ExternalKey::Bet, "ext-1".to_string());
        let saved = store.players.update_if_version(&seat).await?;

        let found = store.players.find_by_seat(round_id, 3).await?.unwrap();
        assert_eq!(found.id, saved.id, "{}", store.name);
        assert_eq!(found.lock_version, saved.lock_version);
        assert_eq!(found.cards, saved.cards);
        assert_eq!(found.bets, saved.bets);
        assert_eq!(found.insurance, InsuranceDecision::Declined);
        assert_eq!(found.external_ids.get(&ExternalKey::Bet).map(String::as_str), Some("ext-1"));
        assert_eq!(found.bets.line(BetKind::Primary).history, vec![10.0]);
        assert_eq!(
            store.players.find_current_turn(round_id).await?.map(|p| p.id),
            Some(saved.id),
            "{}",
            store.name
        );
        assert_eq!(
            store.players.sum_total_bet(round_id, "u1", "m1").await?,
            12.0,
            "{}",
            store.name
        );

        let err = store.players.update_if_version(&seat).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(ConflictKind::OptimisticLock, _)));
    }
    Ok(())
}

#[tokio::test]
async fn open_seats_by_identity_skip_archived_rows() -> Result<(), AppError> {
    for store in stores().await? {
        let round_id = open_round(&store, "t1", None).await?;
        for seat in [1, 5] {
            store
                .players
                .insert(NewPlayerRound::empty(round_id, "t1", seat, identity("u1"), None, 0.0))
                .await?;
        }
        store
            .players
            .insert(NewPlayerRound::empty(round_id, "t1", 3, identity("u2"), None, 0.0))
            .await?;
        let mut archived = store.players.find_by_seat(round_id, 5).await?.unwrap();
        archived.archived = true;
        store.players.update_if_version(&archived).await?;

        let mine = store.players.list_open_by_identity("t1", "u1", "m1").await?;
        let seats: Vec<i16> = mine.iter().map(|p| p.seat_number).collect();
        assert_eq!(seats, vec![1], "{}", store.name);

        let all: Vec<i16> = store
            .players
            .list_by_round(round_id)
            .await?
            .iter()
            .map(|p| p.seat_number)
            .collect();
        assert_eq!(all, vec![1, 3, 5], "{}", store.name);
    }
    Ok(())
}
