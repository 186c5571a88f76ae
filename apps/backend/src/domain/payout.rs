//! Main-bet settlement against the dealer's final hand.

use serde::{Deserialize, Serialize};

use super::cards_types::Card;
use super::hand::{Hand, LastAction, BLACKJACK};

/// Returned multiple of the primary bet for a natural blackjack.
pub const BLACKJACK_RETURN: f64 = 2.5;
/// Returned multiple of the primary bet for an insured hand against a dealer
/// blackjack.
pub const INSURED_RETURN: f64 = 1.5;

/// Outcome reported to the merchant for a settled seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Push,
    Lose,
}

impl Outcome {
    /// Compared against the primary bet; side winnings can turn a lost hand
    /// into a win.
    pub fn classify(winning: f64, primary_bet: f64) -> Outcome {
        if winning > primary_bet {
            Outcome::Win
        } else if winning == primary_bet && winning > 0.0 {
            Outcome::Push
        } else {
            Outcome::Lose
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Push => "push",
            Outcome::Lose => "lose",
        }
    }
}

/// Everything settlement needs to know about one seat.
#[derive(Debug, Clone, Copy)]
pub struct SeatSettlement<'a> {
    pub cards: &'a [Card],
    pub last_action: Option<LastAction>,
    pub primary_bet: f64,
    pub insured: bool,
    pub side_winnings: f64,
}

/// Primary return for one seat, before side bets.
pub fn primary_return(seat: &SeatSettlement<'_>, dealer_cards: &[Card]) -> f64 {
    let bet = seat.primary_bet;
    if bet <= 0.0 {
        return 0.0;
    }
    let player = Hand::new(seat.cards, seat.last_action);
    let dealer = Hand::dealer(dealer_cards);
    let player_score = player.score();
    let dealer_score = dealer.score();

    match (player.is_blackjack(), dealer.is_blackjack()) {
        (true, true) => return bet,
        (true, false) => return bet * BLACKJACK_RETURN,
        (false, true) if seat.insured => return bet * INSURED_RETURN,
        (false, true) => return 0.0,
        (false, false) => {}
    }

    if player_score > BLACKJACK {
        0.0
    } else if dealer_score > BLACKJACK || dealer_score < player_score {
        bet * 2.0
    } else if dealer_score == player_score {
        bet
    } else {
        0.0
    }
}

/// Total amount returned to the player for one seat.
pub fn compute_winnings(seat: &SeatSettlement<'_>, dealer_cards: &[Card]) -> f64 {
    primary_return(seat, dealer_cards) + seat.side_winnings
}
