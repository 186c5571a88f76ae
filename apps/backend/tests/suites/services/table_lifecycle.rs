use blackjack_backend::cache::keys;
use blackjack_backend::domain::{ExternalKey, RoundPhase};
use blackjack_backend::merchant::TransactionType;
use blackjack_backend::protocol::{Audience, ClientAction, ServerEvent, SessionContext, TurnCommand};
use blackjack_backend::services::{dispatch, GameFlowService, PaymentService, SessionService};

use crate::support::fake_merchant::Answer;
use crate::support::table::{seat_key, TestTable, MERCHANT, TABLE};

/// Bet on seat 1 and let the merchant accept the debit.
async fn pushed(t: &TestTable) {
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.run_ok("push_bets").await;
    t.run_ok("push_seat_bet").await;
}

#[tokio::test]
async fn ensure_open_round_reuses_the_running_round() {
    let t = TestTable::new().await;
    let open = t.open_round().await;
    let again = GameFlowService::new()
        .ensure_open_round(&t.state, TABLE)
        .await
        .unwrap();
    assert_eq!(open.id, again.id);
    assert_eq!(open.phase(t.state.clock.now()), RoundPhase::Waiting);

    let err = GameFlowService::new()
        .ensure_open_round(&t.state, "no-such-table")
        .await
        .unwrap_err();
    assert!(err.is_user_facing());
}

#[tokio::test]
async fn reset_refunds_committed_debits_and_rolls_over() {
    let t = TestTable::new().await;
    pushed(&t).await;
    let before = t.open_round().await;

    let next = GameFlowService::new()
        .reset_round(&t.state, &t.dealer())
        .await
        .unwrap();
    assert_ne!(next.id, before.id);
    assert_eq!(next.prev_round_id, Some(before.id));
    let old = t.round(before.id).await;
    assert!(old.finished && old.was_reset);
    let seat = t.seat(before.id, 1).await;
    assert!(seat.is_reset && seat.archived);

    assert_eq!(t.run_ok("cancel_bet").await, 1);
    let refunds = t.merchant.calls_of(TransactionType::Rollback);
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, 10.0);
    assert_eq!(t.merchant.balance(), 1_000.0);
    assert_eq!(t.publisher.named("reset_status").len(), 1);

    let seat = t.seat(before.id, 1).await;
    let cancel_id = seat.external_ids.get(&ExternalKey::CancelBet).unwrap().clone();
    PaymentService::new()
        .cancel_bet(&t.state, before.id, 1, ExternalKey::Bet, 10.0, "again")
        .await
        .unwrap();
    assert_eq!(t.merchant.calls_of(TransactionType::Rollback).len(), 1);
    assert_ne!(cancel_id, "again");
}

#[tokio::test]
async fn reset_needs_a_closed_betting_window() {
    let t = TestTable::new().await;
    let err = GameFlowService::new()
        .reset_round(&t.state, &t.dealer())
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Game is reset already");

    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    let err = GameFlowService::new()
        .reset_round(&t.state, &t.dealer())
        .await
        .unwrap_err();
    assert_eq!(
        err.user_message(),
        "Can not reset the game before betting time is over"
    );
}

#[tokio::test]
async fn reset_returns_unpushed_stakes_to_the_cached_balance() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();

    GameFlowService::new()
        .reset_round(&t.state, &t.dealer())
        .await
        .unwrap();
    assert_eq!(t.balance("u1").await, 100.0);
    assert!(t.scheduler.take_named("cancel_bet").is_empty());
}

#[tokio::test]
async fn reset_after_a_split_refunds_each_stake_once() {
    let t = TestTable::new().await;
    pushed(&t).await;
    t.scan_all(&["18C", "17D", "28D"]).await;
    t.act("u1", 1, TurnCommand::Split).await.unwrap();
    let before = t.open_round().await;
    let balance = t.balance("u1").await;

    GameFlowService::new()
        .reset_round(&t.state, &t.dealer())
        .await
        .unwrap();
    assert_eq!(t.balance("u1").await, balance);
    assert!(t.seat(before.id, 2).await.is_reset);

    assert_eq!(t.run_ok("cancel_bet").await, 2);
    let refunds: Vec<f64> = t
        .merchant
        .calls_of(TransactionType::Rollback)
        .iter()
        .map(|r| r.amount)
        .collect();
    assert_eq!(refunds, vec![10.0, 10.0]);
    assert_eq!(t.merchant.balance(), 1_000.0);
}

#[tokio::test]
async fn clean_seats_frees_last_rounds_claims() {
    let t = TestTable::new().await;
    let first = t.open_round().await;
    t.state
        .cache
        .set(&keys::seat_claim(first.id, 7), &seat_key("u1"))
        .await
        .unwrap();
    let next = GameFlowService::new()
        .start_new_round(&t.state, TABLE, first.id, Vec::new())
        .await
        .unwrap();

    GameFlowService::new()
        .clean_seats(&t.state, TABLE, next.id)
        .await
        .unwrap();
    assert_eq!(
        t.state.cache.get(&keys::seat_claim(first.id, 7)).await.unwrap(),
        None
    );
    assert_eq!(t.publisher.named("clean_seats").len(), 1);

    t.fund("u2", 100.0).await;
    t.bet("u2", 7, 10.0).await.unwrap();
}

#[tokio::test]
async fn clean_seats_skips_a_round_with_bets() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.advance_secs(1);

    t.run_ok("clean_seats").await;
    assert!(t.publisher.named("clean_seats").is_empty());
}

#[tokio::test]
async fn dealer_change_reaches_the_round_and_the_table() {
    let t = TestTable::new().await;
    let flow = GameFlowService::new();

    let err = flow.change_dealer(&t.state, &t.dealer(), "  ").await.unwrap_err();
    assert_eq!(err.user_message(), "Dealer name is required");

    flow.change_dealer(&t.state, &t.dealer(), "Mia").await.unwrap();
    assert_eq!(t.open_round().await.dealer_name.as_deref(), Some("Mia"));
    assert_eq!(
        t.state.cache.get(&keys::dealer_name(TABLE)).await.unwrap(),
        Some("Mia".to_string())
    );
    let announced = t.publisher.named("dealer_changed");
    assert_eq!(announced[0].0, Audience::table(TABLE));

    let first = t.open_round().await;
    let next = flow
        .start_new_round(&t.state, TABLE, first.id, Vec::new())
        .await
        .unwrap();
    assert_eq!(next.dealer_name.as_deref(), Some("Mia"));
}

#[tokio::test]
async fn join_validates_the_token_and_sends_the_table() {
    let t = TestTable::new().await;
    let connection = t.session("lobby").connection_id.clone();
    let anonymous = SessionContext::guest(connection.clone(), TABLE);

    let identity = SessionService::new()
        .join_table(&t.state, &anonymous, "launch-1", MERCHANT)
        .await
        .unwrap();
    assert_eq!(identity.user_id, "launch-1");
    assert_eq!(identity.player_id, format!("launch-1{MERCHANT}"));
    assert_eq!(identity.user_name, "Player");
    assert_eq!(t.balance("launch-1").await, 1_000.0);

    let to_me: Vec<&str> = t
        .publisher
        .events()
        .iter()
        .filter(|(a, _)| *a == Audience::connection(&connection))
        .map(|(_, e)| e.name())
        .collect();
    assert_eq!(to_me, vec!["update_balance", "table_state"]);

    t.merchant.answer_with(Answer::Refuse);
    let err = SessionService::new()
        .join_table(&t.state, &anonymous, "launch-2", MERCHANT)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Token is invalid");
}

#[tokio::test]
async fn rejoining_reactivates_held_seats() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    let sessions = SessionService::new();
    sessions.leave_table(&t.state, &t.session("u1")).await.unwrap();
    let round = t.open_round().await;
    assert!(!t.seat(round.id, 1).await.is_active);

    let mut fresh = t.session("u1");
    fresh.player = None;
    fresh.connection_id = "conn-u1-b".to_string();
    sessions
        .join_table(&t.state, &fresh, "u1", MERCHANT)
        .await
        .unwrap();
    let seat = t.seat(round.id, 1).await;
    assert!(seat.is_active);
    assert_eq!(seat.connection_id.as_deref(), Some("conn-u1-b"));
    assert_eq!(seat.identity.user_token, "u1");
}

#[tokio::test]
async fn dispatch_reports_refusals_to_the_sender() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    let mut session = t.session("u1");

    let result = dispatch(
        &t.state,
        &mut session,
        ClientAction::PlaceBet {
            seat_number: 4,
            bet_type: "primary".into(),
            amount: 10.0,
        },
    )
    .await;
    assert!(result.is_err());
    let errors = t.publisher.named("error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, Audience::connection("conn-u1"));
    assert_eq!(
        errors[0].1,
        ServerEvent::error("Seat number is out of range")
    );

    dispatch(
        &t.state,
        &mut session,
        ClientAction::PlaceBet {
            seat_number: 5,
            bet_type: "primary".into(),
            amount: 10.0,
        },
    )
    .await
    .unwrap();
    assert_eq!(t.balance("u1").await, 90.0);

    dispatch(&t.state, &mut session, ClientAction::LeaveTable)
        .await
        .unwrap();
    assert!(session.player.is_none());
    let err = dispatch(&t.state, &mut session, ClientAction::MakeRepeat)
        .await
        .unwrap_err();
    assert!(err.is_user_facing());
}

#[tokio::test]
async fn dealer_actions_need_a_dealer_connection() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    let mut player = t.session("u1");

    let err = dispatch(
        &t.state,
        &mut player,
        ClientAction::ScanCard { card: "18C".into() },
    )
    .await
    .unwrap_err();
    assert_eq!(err.user_message(), "Only the dealer can do that");
    let err = dispatch(&t.state, &mut player, ClientAction::ResetRound)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Only the dealer can do that");
    let errors = t.publisher.named("error");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].0, Audience::connection("conn-u1"));
    assert_eq!(t.open_round().await.card_count, 0);

    let mut dealer = t.dealer();
    dispatch(
        &t.state,
        &mut dealer,
        ClientAction::ScanCard { card: "18C".into() },
    )
    .await
    .unwrap();
    assert_eq!(t.open_round().await.card_count, 1);
}
