//! Domain layer: pure blackjack rules with no I/O.

pub mod bets;
pub mod cards_parsing;
pub mod cards_serde;
pub mod cards_types;
pub mod dealing;
pub mod hand;
pub mod payout;
pub mod phase;
pub mod seats;
pub mod side_bets;
pub mod turns;

// Re-exports for ergonomics
pub use bets::{
    ActionEntry, ActionKind, BetKind, BetLedger, BetLine, ExternalIds, ExternalKey,
    InsuranceDecision,
};
pub use cards_parsing::try_parse_cards;
pub use cards_types::{Card, Rank, Suit};
pub use dealing::{DealOrder, DealProgress, DealTarget, DealingStrategy};
pub use hand::{gate_actions_by_balance, Hand, LastAction, PlayerAction};
pub use payout::{compute_winnings, Outcome, SeatSettlement};
pub use phase::{PhaseInputs, RoundPhase};
pub use side_bets::{SideBetCombination, SideBetPayouts, SideBetResult};
