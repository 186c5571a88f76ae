use blackjack_backend::cache::keys;
use blackjack_backend::domain::BetKind;
use blackjack_backend::errors::ErrorCode;
use blackjack_backend::services::{GameFlowService, LedgerService};

use crate::support::table::{identity, seat_key, TestTable, TABLE};

#[tokio::test]
async fn first_bet_starts_the_betting_timer() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;

    t.bet("u1", 1, 10.0).await.unwrap();

    let round = t.open_round().await;
    assert!(round.betting_deadline.is_some());
    assert_eq!(t.scheduler.names(), vec!["push_bets", "clean_seats"]);
    assert_eq!(t.publisher.named("start_timer").len(), 1);

    t.bet("u1", 1, 5.0).await.unwrap();
    assert_eq!(t.scheduler.names().len(), 2, "later bets keep the deadline");

    let seat = t.seat(round.id, 1).await;
    assert_eq!(seat.primary_bet(), 15.0);
    assert_eq!(seat.bets.line(BetKind::Primary).history, vec![10.0, 5.0]);
    assert_eq!(t.balance("u1").await, 85.0);
}

#[tokio::test]
async fn bet_receipt_goes_to_sender_and_rest_of_table() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 3, 10.0).await.unwrap();

    assert_eq!(t.publisher.named("bet_status").len(), 1);
    let mirrored = t.publisher.named("new_bet");
    assert_eq!(mirrored.len(), 1);
    assert_eq!(
        mirrored[0].0,
        blackjack_backend::protocol::Audience::table_except(TABLE, "conn-u1")
    );
}

#[tokio::test]
async fn unsupported_amount_mutates_nothing() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;

    for amount in [-5.0, 0.0, f64::NAN] {
        let err = t.bet("u1", 1, amount).await.unwrap_err();
        assert_eq!(err.user_message(), "Unsupported amount");
    }
    let round = t.open_round().await;
    assert!(t.state.players.find_by_seat(round.id, 1).await.unwrap().is_none());
    assert!(round.betting_deadline.is_none());
    assert_eq!(t.balance("u1").await, 100.0);
}

#[tokio::test]
async fn side_bet_before_main_bet_is_refused() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;

    let err = t.side_bet("u1", 1, "perfect_pair", 5.0).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Can not place side bet before placing main bet."
    );
    let round = t.open_round().await;
    let claim = t
        .state
        .cache
        .get(&keys::seat_claim(round.id, 1))
        .await
        .unwrap();
    assert_eq!(claim, None, "a failed first bet releases the seat");
}

#[tokio::test]
async fn limits_and_funds_are_enforced() {
    let t = TestTable::new().await;
    t.fund("u1", 50.0).await;

    let err = t.bet("u1", 1, 600.0).await.unwrap_err();
    assert_eq!(err.user_message(), "Bet can not be more than 500");

    let err = t.bet("u1", 1, 60.0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientFunds);
    assert_eq!(err.user_message(), "Not enough funds");

    let err = t.bet("u1", 2, 10.0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidSeat);

    let err = t.side_bet("u1", 1, "jackpot", 10.0).await.unwrap_err();
    assert_eq!(err.user_message(), "Bet type is unknown");
    assert_eq!(t.balance("u1").await, 50.0);
}

#[tokio::test]
async fn betting_closes_at_the_deadline() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();

    let err = t.bet("u1", 1, 10.0).await.unwrap_err();
    assert_eq!(err.user_message(), "Betting time is over");
}

#[tokio::test]
async fn rollback_restores_totals_and_balance_exactly() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.bet("u1", 1, 5.0).await.unwrap();

    let receipt = LedgerService::new()
        .rollback(&t.state, &t.session("u1"), 1, "primary")
        .await
        .unwrap();
    assert_eq!(receipt.amount, 10.0);
    assert_eq!(receipt.total_bet, 10.0);
    assert_eq!(receipt.balance, 90.0);
    assert_eq!(t.balance("u1").await, 90.0);

    LedgerService::new()
        .rollback(&t.state, &t.session("u1"), 1, "primary")
        .await
        .unwrap();
    assert_eq!(t.balance("u1").await, 100.0);

    let round = t.open_round().await;
    assert_eq!(t.seat(round.id, 1).await.total_bet, 0.0);
    assert_eq!(
        t.state.cache.get(&keys::seat_claim(round.id, 1)).await.unwrap(),
        None
    );
    assert_eq!(t.publisher.named("rollback_status").len(), 2);
}

#[tokio::test]
async fn rollback_keeps_side_bets_covered() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.side_bet("u1", 1, "perfect_pair", 10.0).await.unwrap();

    let err = LedgerService::new()
        .rollback(&t.state, &t.session("u1"), 1, "primary")
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Side bet Perfect Pair can not be more than main bet"
    );

    let err = LedgerService::new()
        .rollback(&t.state, &t.session("u2"), 1, "primary")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Player has not placed any bet yet");
}

#[tokio::test]
async fn two_claims_for_an_empty_seat_one_wins() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.fund("u2", 100.0).await;

    let (a, b) = tokio::join!(t.bet("u1", 5, 10.0), t.bet("u2", 5, 10.0));
    assert!(a.is_ok() ^ b.is_ok(), "exactly one claim succeeds");
    let loser = a.err().or(b.err()).unwrap();
    assert_eq!(loser.user_message(), "Seat is already taken");

    let round = t.open_round().await;
    let seat = t.seat(round.id, 5).await;
    let winner = if seat.is_owned_by("u1", "m1") { "u1" } else { "u2" };
    let loser = if winner == "u1" { "u2" } else { "u1" };
    assert_eq!(t.balance(winner).await, 90.0);
    assert_eq!(t.balance(loser).await, 100.0);
}

#[tokio::test]
async fn seat_held_last_round_is_locked_for_others() {
    let t = TestTable::new().await;
    let first = t.open_round().await;
    t.state
        .cache
        .set(&keys::seat_claim(first.id, 7), &seat_key("u1"))
        .await
        .unwrap();
    GameFlowService::new()
        .start_new_round(&t.state, TABLE, first.id, Vec::new())
        .await
        .unwrap();
    t.fund("u1", 100.0).await;
    t.fund("u2", 100.0).await;

    let err = t.bet("u2", 7, 10.0).await.unwrap_err();
    assert_eq!(err.user_message(), "Seat is locked");
    t.bet("u1", 7, 10.0).await.unwrap();
}

#[tokio::test]
async fn take_seat_is_idempotent_for_the_holder() {
    let t = TestTable::new().await;
    let round = t.open_round().await;
    let ledger = LedgerService::new();
    let me = identity("u1");

    let first = ledger.take_seat(&t.state, &round, 9, &me).await.unwrap();
    let again = ledger.take_seat(&t.state, &round, 9, &me).await.unwrap();
    assert_eq!(first, blackjack_backend::services::ledger::SeatClaim::Claimed);
    assert_eq!(again, blackjack_backend::services::ledger::SeatClaim::Held);
    assert!(ledger
        .take_seat(&t.state, &round, 9, &identity("u2"))
        .await
        .is_err());
}
