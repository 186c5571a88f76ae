use blackjack_backend::domain::{Card, Hand, LastAction, Rank, Suit};
use proptest::prelude::*;

use crate::common::proptest_prelude::proptest_prelude_config;

const RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

const SUITS: [Suit; 4] = [Suit::Spades, Suit::Clubs, Suit::Diamonds, Suit::Hearts];

fn card() -> impl Strategy<Value = Card> {
    (1u8..=6, 0..RANKS.len(), 0..SUITS.len())
        .prop_map(|(deck, rank, suit)| Card::new(deck, RANKS[rank], SUITS[suit]))
}

fn hand(max: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card(), 1..=max)
}

proptest! {
    #![proptest_config(proptest_prelude_config())]

    #[test]
    fn soft_never_exceeds_hard(cards in hand(8)) {
        let h = Hand::new(&cards, None);
        prop_assert!(h.soft_score() <= h.hard_score());
        prop_assert!(h.hard_score() - h.soft_score() <= 10);
    }

    #[test]
    fn reported_score_prefers_hard_when_it_fits(cards in hand(8)) {
        let h = Hand::new(&cards, None);
        if h.hard_score() <= 21 {
            prop_assert_eq!(h.score(), h.hard_score());
        } else {
            prop_assert_eq!(h.score(), h.soft_score());
        }
    }

    #[test]
    fn blackjack_label_needs_two_cards_and_no_split(a in card(), b in card()) {
        let cards = [a, b];
        let plain = Hand::new(&cards, None);
        let split = Hand::new(&cards, Some(LastAction::SplitSecond));
        let natural = plain.hard_score() == 21;
        prop_assert_eq!(plain.is_blackjack(), natural);
        prop_assert_eq!(plain.label() == "BJ", natural);
        prop_assert!(!split.is_blackjack());
        prop_assert_ne!(split.label(), "BJ");
    }

    #[test]
    fn bust_hands_offer_nothing(cards in hand(8)) {
        let h = Hand::new(&cards, None);
        if h.is_bust() {
            prop_assert!(!h.can_continue());
            prop_assert!(h.legal_actions(&[]).is_empty());
        }
    }

    #[test]
    fn dealer_stands_from_seventeen(cards in hand(6)) {
        let h = Hand::dealer(&cards);
        prop_assert_eq!(h.dealer_should_hit(), h.score() < 17);
    }
}
