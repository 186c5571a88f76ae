//! Deal order for scanned cards.
//!
//! Cards arrive one scan at a time. Where a scan lands depends only on how
//! many cards the dealer holds, how far the current pass over the seats has
//! got and how many seats are in play, so a strategy is a pure function of
//! [`DealProgress`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::domain::{DomainError, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealOrder {
    /// One card per seat, one dealer card, second card per seat. The dealer's
    /// second card comes after the players have acted.
    #[default]
    SequentialHoleCard,
    /// One card per seat, dealer card, second card per seat, second dealer card.
    UpfrontTwoCard,
}

impl DealOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            DealOrder::SequentialHoleCard => "sequential_hole_card",
            DealOrder::UpfrontTwoCard => "upfront_two_card",
        }
    }

    pub fn strategy(self) -> &'static dyn DealingStrategy {
        match self {
            DealOrder::SequentialHoleCard => &SequentialHoleCard,
            DealOrder::UpfrontTwoCard => &UpfrontTwoCard,
        }
    }
}

impl fmt::Display for DealOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential_hole_card" | "european" => Ok(DealOrder::SequentialHoleCard),
            "upfront_two_card" | "american" => Ok(DealOrder::UpfrontTwoCard),
            other => Err(DomainError::invalid(format!("Unknown deal order: {other}"))),
        }
    }
}

/// Where the deal stands before the next scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DealProgress {
    pub dealer_cards: usize,
    /// Cards handed out in the current pass over the seats.
    pub card_count: usize,
    pub seats: usize,
}

/// Destination of the next scanned card. Player targets carry the index into
/// the round's seat order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealTarget {
    Player(usize),
    /// Final player card of the initial deal.
    LastPlayer(usize),
    Dealer,
    /// Final dealer card of the initial deal.
    SecondDealer,
}

impl DealTarget {
    /// Whether this card completes the initial deal.
    pub fn completes_deal(self) -> bool {
        matches!(self, DealTarget::LastPlayer(_) | DealTarget::SecondDealer)
    }

    /// Card count after this card has been placed.
    pub fn next_card_count(self, progress: DealProgress) -> usize {
        match self {
            DealTarget::Player(_) | DealTarget::LastPlayer(_) => progress.card_count + 1,
            DealTarget::Dealer | DealTarget::SecondDealer => 0,
        }
    }
}

pub trait DealingStrategy: Send + Sync {
    fn order(&self) -> DealOrder;

    fn next_target(&self, progress: DealProgress) -> Result<DealTarget, DomainError>;
}

fn no_seats() -> DomainError {
    DomainError::validation(ValidationKind::NoBet, "There are no bets in this round")
}

pub struct SequentialHoleCard;

impl DealingStrategy for SequentialHoleCard {
    fn order(&self) -> DealOrder {
        DealOrder::SequentialHoleCard
    }

    fn next_target(&self, p: DealProgress) -> Result<DealTarget, DomainError> {
        if p.seats == 0 {
            return Err(no_seats());
        }
        if p.dealer_cards == 1 && p.card_count + 1 == p.seats {
            return Ok(DealTarget::LastPlayer(p.card_count));
        }
        if p.card_count < p.seats {
            return Ok(DealTarget::Player(p.card_count));
        }
        if p.dealer_cards == 0 {
            Ok(DealTarget::Dealer)
        } else {
            Err(DomainError::validation(
                ValidationKind::ActionNotAllowed,
                "Dealer already has one card",
            ))
        }
    }
}

pub struct UpfrontTwoCard;

impl DealingStrategy for UpfrontTwoCard {
    fn order(&self) -> DealOrder {
        DealOrder::UpfrontTwoCard
    }

    fn next_target(&self, p: DealProgress) -> Result<DealTarget, DomainError> {
        if p.seats == 0 {
            return Err(no_seats());
        }
        if p.dealer_cards == 1 && p.card_count == p.seats {
            return Ok(DealTarget::SecondDealer);
        }
        if p.dealer_cards < 2 && p.card_count < p.seats {
            return Ok(DealTarget::Player(p.card_count));
        }
        if p.dealer_cards == 0 {
            Ok(DealTarget::Dealer)
        } else {
            Err(DomainError::validation(
                ValidationKind::ActionNotAllowed,
                "Dealer already has two cards",
            ))
        }
    }
}
