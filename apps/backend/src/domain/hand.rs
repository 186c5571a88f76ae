//! Hand evaluation: hard/soft scores, display label, terminal state and the
//! base set of legal player actions.
//!
//! A [`Hand`] is never stored. It is rebuilt from a card list plus the last
//! action taken on it whenever a score or a decision is needed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::cards_types::Card;
use crate::errors::domain::{DomainError, ValidationKind};

pub const BLACKJACK: u32 = 21;
pub const DEALER_STANDS_ON: u32 = 17;

/// Last action recorded on a hand. Split hands carry which half they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastAction {
    Hit,
    Stand,
    Double,
    SplitFirst,
    SplitSecond,
}

impl LastAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LastAction::Hit => "hit",
            LastAction::Stand => "stand",
            LastAction::Double => "double",
            LastAction::SplitFirst => "split_first",
            LastAction::SplitSecond => "split_second",
        }
    }

    pub fn is_split(self) -> bool {
        matches!(self, LastAction::SplitFirst | LastAction::SplitSecond)
    }

    /// Actions after which the dealer still owes the seat a card.
    pub fn awaits_card(self) -> bool {
        matches!(
            self,
            LastAction::Hit | LastAction::Double | LastAction::SplitFirst | LastAction::SplitSecond
        )
    }
}

impl fmt::Display for LastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LastAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hit" => Ok(LastAction::Hit),
            "stand" => Ok(LastAction::Stand),
            "double" => Ok(LastAction::Double),
            "split_first" => Ok(LastAction::SplitFirst),
            "split_second" => Ok(LastAction::SplitSecond),
            other => Err(DomainError::validation(
                ValidationKind::Other,
                format!("Unknown last action: {other}"),
            )),
        }
    }
}

/// Decisions a player can be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Stand,
    Hit,
    Double,
    Split,
    Insurance,
}

impl PlayerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerAction::Stand => "stand",
            PlayerAction::Hit => "hit",
            PlayerAction::Double => "double",
            PlayerAction::Split => "split",
            PlayerAction::Insurance => "insurance",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Hand<'a> {
    cards: &'a [Card],
    last_action: Option<LastAction>,
}

impl<'a> Hand<'a> {
    pub fn new(cards: &'a [Card], last_action: Option<LastAction>) -> Self {
        Self { cards, last_action }
    }

    /// The dealer's hand never carries an action.
    pub fn dealer(cards: &'a [Card]) -> Self {
        Self::new(cards, None)
    }

    pub fn cards(&self) -> &'a [Card] {
        self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// All aces counted as one.
    pub fn soft_score(&self) -> u32 {
        self.cards
            .iter()
            .map(|c| if c.is_ace() { 1 } else { u32::from(c.rank.points()) })
            .sum()
    }

    /// Best total with at most one ace counted as eleven.
    pub fn hard_score(&self) -> u32 {
        let soft = self.soft_score();
        if self.cards.iter().any(Card::is_ace) && soft + 10 <= BLACKJACK {
            soft + 10
        } else {
            soft
        }
    }

    pub fn score(&self) -> u32 {
        let hard = self.hard_score();
        if hard <= BLACKJACK {
            hard
        } else {
            self.soft_score()
        }
    }

    pub fn is_split(&self) -> bool {
        self.last_action.is_some_and(LastAction::is_split)
    }

    fn is_ace_led_split(&self) -> bool {
        self.is_split() && self.cards.first().is_some_and(Card::is_ace)
    }

    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.hard_score() == BLACKJACK && !self.is_split()
    }

    pub fn is_bust(&self) -> bool {
        self.score() > BLACKJACK
    }

    /// Display label: "BJ", a single total, or "hard/soft" while both matter.
    pub fn label(&self) -> String {
        let hard = self.hard_score();
        let soft = self.soft_score();
        if self.is_blackjack() {
            return "BJ".to_string();
        }
        if hard == BLACKJACK {
            return hard.to_string();
        }
        if hard > BLACKJACK {
            return soft.to_string();
        }
        if self.last_action == Some(LastAction::Double) || self.is_ace_led_split() {
            return hard.to_string();
        }
        if hard != soft {
            return format!("{hard}/{soft}");
        }
        hard.to_string()
    }

    /// Whether the player may still act on this hand.
    pub fn can_continue(&self) -> bool {
        self.score() < BLACKJACK && !self.is_ace_led_split()
    }

    /// Base legal actions, before any balance gating.
    pub fn legal_actions(&self, dealer_cards: &[Card]) -> Vec<PlayerAction> {
        let mut actions = Vec::new();
        let score = self.score();
        if score < BLACKJACK {
            actions.push(PlayerAction::Stand);
            actions.push(PlayerAction::Hit);
        }
        if self.cards.len() == 2 && score < BLACKJACK {
            actions.push(PlayerAction::Double);
        }
        if self.cards.len() == 2 && self.cards[0].rank == self.cards[1].rank && !self.is_split() {
            actions.push(PlayerAction::Split);
        }
        if self.insurance_offered(dealer_cards) {
            actions.push(PlayerAction::Insurance);
        }
        actions
    }

    /// Insurance is offered on a two-card non-blackjack hand while the
    /// dealer shows exactly one card and it is an ace.
    pub fn insurance_offered(&self, dealer_cards: &[Card]) -> bool {
        self.cards.len() == 2
            && !self.is_blackjack()
            && dealer_cards.len() == 1
            && dealer_cards[0].is_ace()
    }

    pub fn dealer_should_hit(&self) -> bool {
        self.score() < DEALER_STANDS_ON
    }
}

/// Drop actions the player cannot fund: double and split need the primary
/// stake again, insurance needs half of it.
pub fn gate_actions_by_balance(
    actions: Vec<PlayerAction>,
    balance: f64,
    primary_bet: f64,
) -> Vec<PlayerAction> {
    actions
        .into_iter()
        .filter(|action| match action {
            PlayerAction::Double | PlayerAction::Split => balance >= primary_bet,
            PlayerAction::Insurance => balance >= primary_bet / 2.0,
            PlayerAction::Stand | PlayerAction::Hit => true,
        })
        .collect()
}
