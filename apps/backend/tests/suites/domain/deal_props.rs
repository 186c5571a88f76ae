use blackjack_backend::domain::{DealOrder, DealProgress, DealTarget};
use proptest::prelude::*;

use crate::common::proptest_prelude::proptest_prelude_config;

fn run_deal(order: DealOrder, seats: usize) -> Vec<DealTarget> {
    let strategy = order.strategy();
    let mut progress = DealProgress {
        dealer_cards: 0,
        card_count: 0,
        seats,
    };
    let mut targets = Vec::new();
    loop {
        let target = strategy.next_target(progress).unwrap();
        targets.push(target);
        if matches!(target, DealTarget::Dealer | DealTarget::SecondDealer) {
            progress.dealer_cards += 1;
        }
        progress.card_count = target.next_card_count(progress);
        if target.completes_deal() {
            return targets;
        }
    }
}

fn cards_per_seat(targets: &[DealTarget], seats: usize) -> Vec<usize> {
    let mut counts = vec![0; seats];
    for target in targets {
        if let DealTarget::Player(i) | DealTarget::LastPlayer(i) = target {
            counts[*i] += 1;
        }
    }
    counts
}

fn dealer_cards(targets: &[DealTarget]) -> usize {
    targets
        .iter()
        .filter(|t| matches!(t, DealTarget::Dealer | DealTarget::SecondDealer))
        .count()
}

proptest! {
    #![proptest_config(proptest_prelude_config())]

    #[test]
    fn every_seat_gets_two_cards(seats in 1usize..=14) {
        for order in [DealOrder::SequentialHoleCard, DealOrder::UpfrontTwoCard] {
            let targets = run_deal(order, seats);
            prop_assert!(cards_per_seat(&targets, seats).iter().all(|c| *c == 2));
            prop_assert_eq!(targets.iter().filter(|t| t.completes_deal()).count(), 1);
        }
    }

    #[test]
    fn dealer_card_count_follows_the_order(seats in 1usize..=14) {
        let sequential = run_deal(DealOrder::SequentialHoleCard, seats);
        prop_assert_eq!(dealer_cards(&sequential), 1);
        prop_assert!(matches!(sequential.last(), Some(DealTarget::LastPlayer(i)) if *i == seats - 1));

        let upfront = run_deal(DealOrder::UpfrontTwoCard, seats);
        prop_assert_eq!(dealer_cards(&upfront), 2);
        prop_assert_eq!(upfront.last(), Some(&DealTarget::SecondDealer));
    }

    #[test]
    fn dealer_card_comes_after_the_first_pass(seats in 1usize..=14) {
        for order in [DealOrder::SequentialHoleCard, DealOrder::UpfrontTwoCard] {
            let targets = run_deal(order, seats);
            prop_assert_eq!(targets[seats], DealTarget::Dealer);
            for (i, target) in targets[..seats].iter().enumerate() {
                prop_assert_eq!(*target, DealTarget::Player(i));
            }
        }
    }
}
