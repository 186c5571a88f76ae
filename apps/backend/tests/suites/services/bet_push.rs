use blackjack_backend::cache::keys;
use blackjack_backend::domain::ExternalKey;
use blackjack_backend::errors::ErrorCode;
use blackjack_backend::merchant::TransactionType;
use blackjack_backend::protocol::ServerEvent;
use blackjack_backend::services::payments::INSUFFICIENT_BALANCE_DETAIL;
use blackjack_backend::services::{GameFlowService, LedgerService, PaymentService};
use blackjack_backend::tasks::DeferredTask;

use crate::support::fake_merchant::Answer;
use crate::support::table::{TestTable, TABLE};

#[tokio::test]
async fn deadline_pushes_one_debit_per_seat() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.fund("u2", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.side_bet("u1", 1, "perfect_pair", 2.0).await.unwrap();
    t.bet("u2", 3, 20.0).await.unwrap();
    t.close_betting();

    assert_eq!(t.run_ok("push_bets").await, 1);
    assert_eq!(t.run_ok("push_seat_bet").await, 2);

    let debits = t.merchant.calls_of(TransactionType::Bet);
    let mut amounts: Vec<f64> = debits.iter().map(|r| r.amount).collect();
    amounts.sort_by(f64::total_cmp);
    assert_eq!(amounts, vec![12.0, 20.0]);

    let round = t.open_round().await;
    let seat = t.seat(round.id, 1).await;
    let bet_id = seat.external_ids.get(&ExternalKey::Bet).unwrap();
    assert!(debits.iter().any(|r| &r.external_id == bet_id));
    assert!(seat.balance < 1_000.0, "seat carries the merchant's balance");
}

#[tokio::test]
async fn replayed_seat_push_does_not_debit_twice() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.run_ok("push_bets").await;

    let pushed = t.scheduler.take_named("push_seat_bet");
    let DeferredTask::PushSeatBet {
        round_id,
        seat_number,
        external_id,
    } = pushed[0].task.clone()
    else {
        panic!("unexpected task");
    };
    let payments = PaymentService::new();
    payments
        .push_seat_bet(&t.state, round_id, seat_number, &external_id)
        .await
        .unwrap();
    payments
        .push_seat_bet(&t.state, round_id, seat_number, &external_id)
        .await
        .unwrap();
    assert_eq!(t.merchant.calls_of(TransactionType::Bet).len(), 1);
}

#[tokio::test]
async fn refused_debit_rejects_the_seat() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.merchant.set_balance(4.0);

    t.run_ok("push_bets").await;
    t.run_ok("push_seat_bet").await;

    let round = t.open_round().await;
    let seat = t.seat(round.id, 1).await;
    assert!(seat.rejected);
    assert!(seat.archived);
    assert_eq!(seat.detail.as_deref(), Some(INSUFFICIENT_BALANCE_DETAIL));
    assert_eq!(
        t.state.cache.get(&keys::seat_claim(round.id, 1)).await.unwrap(),
        None
    );
    assert_eq!(t.balance("u1").await, 4.0, "balance resynced from merchant");

    let notices = t.publisher.named("insufficient_balance");
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0].1,
        ServerEvent::InsufficientBalance { message, balance }
            if message == "Not enough funds to place bet" && *balance == 4.0
    ));
}

#[tokio::test]
async fn unreachable_merchant_leaves_the_push_retryable() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.run_ok("push_bets").await;
    t.merchant.answer_with(Answer::Unavailable);

    let results = t.run("push_seat_bet").await;
    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.code(), ErrorCode::MerchantUnavailable);
    assert!(err.is_retryable());

    let round = t.open_round().await;
    let seat = t.seat(round.id, 1).await;
    assert!(!seat.rejected);
    assert!(!seat.external_ids.contains_key(&ExternalKey::Bet));
}

#[tokio::test]
async fn no_bets_at_deadline_reopens_betting() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    LedgerService::new()
        .rollback(&t.state, &t.session("u1"), 1, "primary")
        .await
        .unwrap();
    t.close_betting();

    t.run_ok("push_bets").await;

    let round = t.open_round().await;
    assert!(round.betting_deadline.is_none());
    assert_eq!(t.publisher.named("repeat_betting").len(), 1);
    assert!(t.merchant.calls().is_empty());
    assert!(t.scheduler.take_named("push_seat_bet").is_empty());
}

#[tokio::test]
async fn repeat_places_last_rounds_bets_again() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.side_bet("u1", 1, "twenty_one_plus_three", 3.0).await.unwrap();
    t.bet("u1", 3, 5.0).await.unwrap();
    t.close_betting();
    t.run_ok("push_bets").await;
    let first = t.open_round().await;

    GameFlowService::new()
        .start_new_round(&t.state, TABLE, first.id, Vec::new())
        .await
        .unwrap();
    t.fund("u1", 100.0).await;

    let receipt = LedgerService::new()
        .repeat(&t.state, &t.session("u1"))
        .await
        .unwrap();
    assert_eq!(receipt.user_total_bet, 18.0);
    assert_eq!(receipt.balance, 82.0);
    assert_eq!(receipt.seats.len(), 3, "one receipt per staked line");

    let err = LedgerService::new()
        .repeat(&t.state, &t.session("u1"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Repeat is already made");
}

#[tokio::test]
async fn repeat_needs_funds_for_every_seat() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 40.0).await.unwrap();
    t.bet("u1", 3, 40.0).await.unwrap();
    t.close_betting();
    t.run_ok("push_bets").await;
    let first = t.open_round().await;
    GameFlowService::new()
        .start_new_round(&t.state, TABLE, first.id, Vec::new())
        .await
        .unwrap();
    t.fund("u1", 50.0).await;

    let err = LedgerService::new()
        .repeat(&t.state, &t.session("u1"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "not enough funds to make repeat");
    let round = t.open_round().await;
    assert!(t.state.players.find_by_seat(round.id, 1).await.unwrap().is_none());
    assert_eq!(t.balance("u1").await, 50.0);
}

#[tokio::test]
async fn repeat_without_history_is_unavailable() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    let err = LedgerService::new()
        .repeat(&t.state, &t.session("u1"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "can't make repeat");
}

#[tokio::test]
async fn replayed_push_reuses_the_seat_transaction_id() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    let round = t.open_round().await;

    for _ in 0..2 {
        PaymentService::new()
            .push_bets(&t.state, TABLE, round.id)
            .await
            .unwrap();
    }
    let ids: Vec<String> = t
        .scheduler
        .pending()
        .into_iter()
        .filter_map(|s| match s.task {
            DeferredTask::PushSeatBet { external_id, .. } => Some(external_id),
            _ => None,
        })
        .collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1]);

    assert_eq!(t.run_ok("push_seat_bet").await, 2);
    assert_eq!(t.merchant.calls_of(TransactionType::Bet).len(), 1);
    assert_eq!(t.merchant.balance(), 990.0);
}
