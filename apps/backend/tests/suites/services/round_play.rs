use blackjack_backend::domain::{
    DealOrder, ExternalKey, InsuranceDecision, LastAction, Outcome, PlayerAction,
};
use blackjack_backend::merchant::TransactionType;
use blackjack_backend::protocol::{Audience, ServerEvent, TurnCommand};
use blackjack_backend::services::snapshot::table_snapshot;
use blackjack_backend::services::{seat_order, GameFlowService, PaymentService, SessionService};

use crate::support::table::{seat_key, TestTable, TABLE};

/// Two players on seats 1 and 3 with 10 each, betting closed.
async fn two_seats(order: DealOrder) -> TestTable {
    let t = TestTable::with_order(order).await;
    t.fund("u1", 100.0).await;
    t.fund("u2", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.bet("u2", 3, 10.0).await.unwrap();
    t.close_betting();
    t
}

/// Seat 1 holds 18, seat 3 holds 19, the dealer shows a seven.
async fn dealt() -> TestTable {
    let t = two_seats(DealOrder::SequentialHoleCard).await;
    t.scan_all(&["1TC", "19H", "17D", "18C", "1KS"]).await;
    t
}

fn results(t: &TestTable) -> Vec<(i16, Outcome, f64)> {
    let mut out: Vec<_> = t
        .publisher
        .named("result")
        .into_iter()
        .filter_map(|(_, e)| match e {
            ServerEvent::Result(r) => Some((r.seat_number, r.outcome, r.winning_amount)),
            _ => None,
        })
        .collect();
    out.sort_by_key(|r| r.0);
    out
}

#[tokio::test]
async fn scanning_waits_for_the_betting_deadline() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();

    let err = t.scan("1TC").await.unwrap_err();
    assert_eq!(err.user_message(), "Betting time is not over");

    t.close_betting();
    let err = t.scan("1ZZ").await.unwrap_err();
    assert_eq!(err.user_message(), "Incorrect card");
}

#[tokio::test]
async fn sequential_deal_follows_seat_order() {
    let t = dealt().await;

    let round = t.open_round().await;
    assert!(round.finished_dealing);
    assert_eq!(round.dealer_cards.len(), 1);
    let first = t.seat(round.id, 1).await;
    let second = t.seat(round.id, 3).await;
    assert_eq!(first.hand().score(), 18);
    assert_eq!(second.hand().score(), 19);

    assert!(first.is_player_turn && first.is_making_decision);
    assert!(!second.is_player_turn);
    let prompts = t.publisher.named("make_decision");
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, Audience::identity(&seat_key("u1")));
    let ServerEvent::MakeDecision(prompt) = &prompts[0].1 else {
        panic!("expected a decision prompt");
    };
    assert_eq!(prompt.seat_number, 1);
    assert_eq!(prompt.decision_time, 15);
    assert!(prompt.actions.contains(&PlayerAction::Double));
    assert_eq!(t.publisher.named("send_hand_value").len(), 4);
}

#[tokio::test]
async fn upfront_deal_keeps_the_hole_card_hidden() {
    let t = TestTable::with_order(DealOrder::UpfrontTwoCard).await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.scan_all(&["1TC", "19D", "18C", "17H"]).await;

    let round = t.open_round().await;
    assert_eq!(round.dealer_cards.len(), 2);
    assert_eq!(round.visible_dealer_cards().len(), 1);
    for (_, event) in t.publisher.named("dealer_score") {
        let ServerEvent::DealerScore { cards, score } = event else {
            unreachable!()
        };
        assert_eq!(cards.len(), 1);
        assert_eq!(score, "9");
    }

    let snapshot = table_snapshot(&t.state, &t.session("u1")).await.unwrap();
    assert_eq!(snapshot.dealer_cards.len(), 1);
    assert_eq!(snapshot.balance, Some(90.0));
    assert!(snapshot.seats[0].is_mine);
    assert!(t.seat(round.id, 1).await.is_making_decision);
}

#[tokio::test]
async fn hit_routes_the_next_card_to_the_deciding_seat() {
    let t = dealt().await;
    t.act("u1", 1, TurnCommand::Hit).await.unwrap();

    let round = t.open_round().await;
    let seat = t.seat(round.id, 1).await;
    assert_eq!(seat.last_action, Some(LastAction::Hit));
    assert!(!seat.is_making_decision);

    t.scan("15D").await.unwrap();
    let seat = t.seat(round.id, 1).await;
    assert!(seat.hand().is_bust());
    assert!(seat.finished_turn);
    assert!(t.seat(round.id, 3).await.is_making_decision);
}

#[tokio::test]
async fn card_is_refused_while_the_seat_is_deciding() {
    let t = dealt().await;
    let err = t.scan("15D").await.unwrap_err();
    assert_eq!(err.user_message(), "Player has not made a decision yet");
}

#[tokio::test]
async fn only_the_deciding_owner_may_act() {
    let t = dealt().await;

    let err = t.act("u2", 3, TurnCommand::Stand).await.unwrap_err();
    assert_eq!(err.user_message(), "It is not your turn");
    let err = t.act("u2", 1, TurnCommand::Stand).await.unwrap_err();
    assert_eq!(err.user_message(), "It is not your turn");

    t.advance_secs(16);
    let err = t.act("u1", 1, TurnCommand::Stand).await.unwrap_err();
    assert_eq!(err.user_message(), "Time for making decision is over");
}

#[tokio::test]
async fn double_takes_one_card_and_debits_the_stake_again() {
    let t = dealt().await;
    t.act("u1", 1, TurnCommand::Double).await.unwrap();
    assert_eq!(t.balance("u1").await, 80.0);

    let debits = t.merchant.calls_of(TransactionType::Bet);
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].amount, 10.0);

    t.scan("12H").await.unwrap();
    let round = t.open_round().await;
    let seat = t.seat(round.id, 1).await;
    assert_eq!(seat.primary_bet(), 20.0);
    assert!(seat.finished_turn);
    assert!(seat.external_ids.contains_key(&ExternalKey::Double));
    assert_eq!(seat.hand().label(), "20");
    assert!(t.seat(round.id, 3).await.is_making_decision);
}

#[tokio::test]
async fn split_plays_both_hands_before_moving_on() {
    let t = two_seats(DealOrder::SequentialHoleCard).await;
    t.scan_all(&["18C", "19H", "17D", "28D", "1KS"]).await;

    let ServerEvent::MakeDecision(prompt) = t.publisher.named("make_decision")[0].1.clone() else {
        panic!("expected a decision prompt");
    };
    assert!(prompt.actions.contains(&PlayerAction::Split));

    t.act("u1", 1, TurnCommand::Split).await.unwrap();
    assert_eq!(t.balance("u1").await, 80.0);
    let round = t.open_round().await;
    let sibling = t.seat(round.id, 2).await;
    assert_eq!(sibling.primary_bet(), 10.0);
    assert_eq!(sibling.cards.len(), 1);
    assert_eq!(t.seat(round.id, 1).await.cards.len(), 1);

    t.scan("13C").await.unwrap();
    t.scan("1TC").await.unwrap();
    let first = t.seat(round.id, 1).await;
    assert_eq!(first.hand().score(), 11);
    assert!(first.is_making_decision);
    assert_eq!(t.seat(round.id, 2).await.hand().score(), 18);

    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    assert!(t.seat(round.id, 2).await.is_making_decision);
    t.act("u1", 2, TurnCommand::Stand).await.unwrap();
    assert!(t.seat(round.id, 3).await.is_making_decision);
}

#[tokio::test]
async fn disconnected_player_is_stood_after_the_decision_window() {
    let t = dealt().await;
    SessionService::new()
        .leave_table(&t.state, &t.session("u1"))
        .await
        .unwrap();
    let round = t.open_round().await;
    assert!(!t.seat(round.id, 1).await.is_active);

    let nudges = t.scheduler.pending();
    let nudge = nudges.iter().find(|s| s.task.name() == "nudge").unwrap();
    assert_eq!(nudge.delay.as_secs(), 16);

    t.advance_secs(16);
    t.run_ok("nudge").await;
    let seat = t.seat(round.id, 1).await;
    assert_eq!(seat.last_action, Some(LastAction::Stand));
    assert!(seat.finished_turn);
    assert!(t.seat(round.id, 3).await.is_making_decision);
}

#[tokio::test]
async fn early_nudge_leaves_the_seat_deciding() {
    let t = dealt().await;
    SessionService::new()
        .leave_table(&t.state, &t.session("u1"))
        .await
        .unwrap();
    t.run_ok("nudge").await;

    let round = t.open_round().await;
    assert!(t.seat(round.id, 1).await.is_making_decision);
}

#[tokio::test]
async fn ace_up_opens_the_insurance_window() {
    let t = two_seats(DealOrder::SequentialHoleCard).await;
    t.scan_all(&["1TC", "19H", "1AD", "18C", "17S"]).await;

    let offers = t.publisher.named("make_insurance");
    assert_eq!(offers.len(), 1);
    assert!(matches!(
        &offers[0].1,
        ServerEvent::MakeInsurance { insurable_seats, decision_time: 5 } if insurable_seats == &vec![1, 3]
    ));
    assert!(t.publisher.named("make_decision").is_empty());
    let err = t.scan("15D").await.unwrap_err();
    assert_eq!(err.user_message(), "Insurance decision time is not over");

    t.insure("u1", 1, true).await.unwrap();
    assert_eq!(t.balance("u1").await, 85.0);
    let err = t.insure("u1", 1, false).await.unwrap_err();
    assert_eq!(err.user_message(), "Insurance decision is already made");

    t.advance_secs(7);
    let err = t.insure("u2", 3, true).await.unwrap_err();
    assert_eq!(err.user_message(), "Insurance decision time is over");

    t.run_ok("insurance_timeout").await;
    let round = t.open_round().await;
    let insured = t.seat(round.id, 1).await;
    assert_eq!(insured.insurance, InsuranceDecision::Taken);
    assert_eq!(insured.insurance_amount, 5.0);
    assert!(insured.external_ids.contains_key(&ExternalKey::Insurance));
    assert_eq!(t.seat(round.id, 3).await.insurance, InsuranceDecision::Declined);
    assert!(insured.is_making_decision);
}

#[tokio::test]
async fn insurance_pays_against_a_dealer_blackjack() {
    let t = two_seats(DealOrder::SequentialHoleCard).await;
    t.scan_all(&["1TC", "19H", "1AD", "18C", "17S"]).await;
    t.insure("u1", 1, true).await.unwrap();
    t.advance_secs(7);
    t.run_ok("insurance_timeout").await;

    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    t.act("u2", 3, TurnCommand::Stand).await.unwrap();
    assert_eq!(t.publisher.named("scan_dealer_card").len(), 1);
    t.scan_dealer("1KD").await.unwrap();

    let found = results(&t);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].2, 15.0);
    assert_eq!(found[1], (3, Outcome::Lose, 0.0));
}

#[tokio::test]
async fn dealer_draws_to_seventeen_then_settles() {
    let t = dealt().await;
    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    t.act("u2", 3, TurnCommand::Stand).await.unwrap();

    let round = t.open_round().await;
    assert!(round.show_dealer_cards);
    let err = t.scan_dealer("1XX").await.unwrap_err();
    assert_eq!(err.user_message(), "Incorrect card");

    t.scan_dealer("15H").await.unwrap();
    assert!(!t.round(round.id).await.finished);
    t.scan("16S").await.unwrap();

    let round = t.round(round.id).await;
    assert!(round.finished);
    assert_eq!(
        results(&t),
        vec![(1, Outcome::Push, 10.0), (3, Outcome::Win, 20.0)]
    );
    assert_eq!(t.scheduler.take_named("payout").len(), 2);
    assert!(t.scheduler.names().contains(&"start_new_round"));
}

#[tokio::test]
async fn dealer_card_waits_for_the_players() {
    let t = dealt().await;
    let err = t.scan_dealer("15H").await.unwrap_err();
    assert_eq!(err.user_message(), "Players have not finished their turns");
}

#[tokio::test]
async fn standing_upfront_dealer_settles_without_drawing() {
    let t = TestTable::with_order(DealOrder::UpfrontTwoCard).await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.scan_all(&["1TC", "1TD", "18C", "17H"]).await;
    t.act("u1", 1, TurnCommand::Stand).await.unwrap();

    assert!(t.publisher.named("scan_dealer_card").is_empty());
    assert_eq!(results(&t), vec![(1, Outcome::Win, 20.0)]);
}

#[tokio::test]
async fn blackjacks_settle_without_a_turn() {
    let pushes = TestTable::with_order(DealOrder::UpfrontTwoCard).await;
    pushes.fund("u1", 100.0).await;
    pushes.bet("u1", 1, 10.0).await.unwrap();
    pushes.close_betting();
    pushes.scan_all(&["1AC", "1TD", "1KC", "1AH"]).await;
    assert_eq!(results(&pushes), vec![(1, Outcome::Push, 10.0)]);

    let pays = TestTable::with_order(DealOrder::UpfrontTwoCard).await;
    pays.fund("u1", 100.0).await;
    pays.bet("u1", 1, 10.0).await.unwrap();
    pays.close_betting();
    pays.scan_all(&["1AC", "19D", "1KC", "1TH"]).await;
    assert_eq!(results(&pays), vec![(1, Outcome::Win, 25.0)]);
    assert!(pays.publisher.named("make_decision").is_empty());
}

#[tokio::test]
async fn payout_replay_does_not_credit_twice() {
    let t = dealt().await;
    let round_id = t.open_round().await.id;
    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    t.act("u2", 3, TurnCommand::Stand).await.unwrap();
    t.scan_dealer("1QH").await.unwrap();

    assert_eq!(t.run_ok("payout").await, 2);
    let mut credits: Vec<f64> = t
        .merchant
        .calls_of(TransactionType::Win)
        .iter()
        .map(|r| r.amount)
        .collect();
    credits.sort_by(f64::total_cmp);
    assert_eq!(credits, vec![20.0, 20.0]);
    assert_eq!(t.publisher.named("update_balance").len(), 2);
    assert!(t
        .seat(round_id, 3)
        .await
        .external_ids
        .contains_key(&ExternalKey::Win));

    PaymentService::new()
        .payout(&t.state, round_id, 3, "replayed-id")
        .await
        .unwrap();
    assert_eq!(t.merchant.calls_of(TransactionType::Win).len(), 2);
}

#[tokio::test]
async fn settled_round_rolls_over_with_its_seats() {
    let t = dealt().await;
    let round_id = t.open_round().await.id;
    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    t.act("u2", 3, TurnCommand::Stand).await.unwrap();
    t.scan_dealer("1QH").await.unwrap();
    assert!(t.state.rounds.find_open(TABLE).await.unwrap().is_none());

    t.run_ok("start_new_round").await;
    let next = t.open_round().await;
    assert_eq!(next.prev_round_id, Some(round_id));
    let announced = t.publisher.named("start_new_round");
    let ServerEvent::StartNewRound { seats, next_round_real_id, .. } = &announced[0].1 else {
        unreachable!()
    };
    assert_eq!(*next_round_real_id, next.id);
    let mut held: Vec<i16> = seats.iter().map(|s| s.seat_number).collect();
    held.sort_unstable();
    assert_eq!(held, vec![1, 3]);

    let again = GameFlowService::new()
        .start_new_round(&t.state, TABLE, round_id, Vec::new())
        .await
        .unwrap();
    assert_eq!(again.id, next.id);
}

#[tokio::test]
async fn lost_hand_still_collects_its_side_bet() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.side_bet("u1", 1, "perfect_pair", 1.0).await.unwrap();
    t.close_betting();
    t.scan_all(&["18C", "1TD", "28H"]).await;
    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    t.scan_dealer("1QH").await.unwrap();

    assert_eq!(results(&t), vec![(1, Outcome::Lose, 7.0)]);
    assert_eq!(t.run_ok("payout").await, 1);
    let credits: Vec<f64> = t
        .merchant
        .calls_of(TransactionType::Win)
        .iter()
        .map(|r| r.amount)
        .collect();
    assert_eq!(credits, vec![7.0]);
}

#[tokio::test]
async fn refused_payout_is_queued_again_by_a_later_settle() {
    let t = dealt().await;
    let round_id = t.open_round().await.id;
    t.act("u1", 1, TurnCommand::Stand).await.unwrap();
    t.act("u2", 3, TurnCommand::Stand).await.unwrap();
    t.scheduler.refuse_once("payout");
    t.scan_dealer("1QH").await.unwrap();

    assert!(t.round(round_id).await.finished);
    assert_eq!(results(&t).len(), 2);
    let names = t.scheduler.names();
    assert!(names.contains(&"start_new_round"));
    assert!(names.contains(&"settle"));
    assert_eq!(names.iter().filter(|n| **n == "payout").count(), 1);

    assert_eq!(t.run_ok("settle").await, 1);
    assert_eq!(t.run_ok("payout").await, 3);
    let mut credits: Vec<f64> = t
        .merchant
        .calls_of(TransactionType::Win)
        .iter()
        .map(|r| r.amount)
        .collect();
    credits.sort_by(f64::total_cmp);
    assert_eq!(credits, vec![20.0, 20.0]);
}

#[tokio::test]
async fn failed_seat_write_gives_the_deal_slot_back() {
    let t = TestTable::new().await;
    t.fund("u1", 100.0).await;
    t.bet("u1", 1, 10.0).await.unwrap();
    t.close_betting();
    t.scan("18C").await.unwrap();
    let round = t.open_round().await;

    seat_order::store(&t.state, round.id, &[1, 5]).await.unwrap();
    assert!(t.scan("19H").await.is_err());
    let after = t.round(round.id).await;
    assert_eq!(after.card_count, 1);
    assert!(after.dealer_cards.is_empty());

    seat_order::store(&t.state, round.id, &[1]).await.unwrap();
    t.scan("19H").await.unwrap();
    assert_eq!(t.round(round.id).await.dealer_cards.len(), 1);
}
