//! Bet bookkeeping for one seat: bet lines per kind, the action log and the
//! external transaction ids used to make merchant calls idempotent.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::side_bets::SideBetCombination;
use crate::errors::domain::{DomainError, ValidationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetKind {
    Primary,
    TwentyOnePlusThree,
    PerfectPair,
}

impl BetKind {
    pub const ALL: [BetKind; 3] = [
        BetKind::Primary,
        BetKind::TwentyOnePlusThree,
        BetKind::PerfectPair,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BetKind::Primary => "primary",
            BetKind::TwentyOnePlusThree => "twenty_one_plus_three",
            BetKind::PerfectPair => "perfect_pair",
        }
    }

    pub fn is_side(self) -> bool {
        self != BetKind::Primary
    }

    /// Name used in player-facing messages.
    pub fn display_name(self) -> &'static str {
        match self {
            BetKind::Primary => "Main bet",
            BetKind::TwentyOnePlusThree => "21+3",
            BetKind::PerfectPair => "Perfect Pair",
        }
    }

    /// Parse a wire name; `unknown_message` lets bet and rollback report
    /// their own wording.
    pub fn parse_with(s: &str, unknown_message: &str) -> Result<BetKind, DomainError> {
        match s {
            "primary" | "bet" => Ok(BetKind::Primary),
            "twenty_one_plus_three" | "bet_21_3" => Ok(BetKind::TwentyOnePlusThree),
            "perfect_pair" | "bet_perfect_pair" => Ok(BetKind::PerfectPair),
            _ => Err(DomainError::validation(
                ValidationKind::InvalidBetKind,
                unknown_message,
            )),
        }
    }
}

impl fmt::Display for BetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BetKind::parse_with(s, "Bet type is unknown")
    }
}

/// One bet kind on one seat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetLine {
    pub amount: f64,
    pub history: Vec<f64>,
    #[serde(default)]
    pub winning: f64,
    #[serde(default)]
    pub combination: Option<SideBetCombination>,
}

impl BetLine {
    pub fn add(&mut self, amount: f64) {
        self.amount += amount;
        self.history.push(amount);
    }

    /// Remove and return the latest contribution.
    pub fn pop(&mut self) -> Option<f64> {
        let last = self.history.pop()?;
        self.amount -= last;
        if self.history.is_empty() {
            self.amount = 0.0;
        }
        Some(last)
    }
}

/// Bet lines keyed by kind. Missing kinds read as an empty line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BetLedger(BTreeMap<BetKind, BetLine>);

impl BetLedger {
    pub fn line(&self, kind: BetKind) -> BetLine {
        self.0.get(&kind).cloned().unwrap_or_default()
    }

    pub fn line_mut(&mut self, kind: BetKind) -> &mut BetLine {
        self.0.entry(kind).or_default()
    }

    pub fn amount(&self, kind: BetKind) -> f64 {
        self.0.get(&kind).map_or(0.0, |line| line.amount)
    }

    pub fn primary(&self) -> f64 {
        self.amount(BetKind::Primary)
    }

    pub fn total(&self) -> f64 {
        self.0.values().map(|line| line.amount).sum()
    }

    pub fn side_winnings(&self) -> f64 {
        self.0
            .iter()
            .filter(|(kind, _)| kind.is_side())
            .map(|(_, line)| line.winning)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BetKind, &BetLine)> {
        self.0.iter()
    }

    pub fn set_line(&mut self, kind: BetKind, line: BetLine) {
        self.0.insert(kind, line);
    }
}

/// Insurance decision for a seat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceDecision {
    #[default]
    Undecided,
    Taken,
    Declined,
}

impl InsuranceDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            InsuranceDecision::Undecided => "undecided",
            InsuranceDecision::Taken => "taken",
            InsuranceDecision::Declined => "declined",
        }
    }
}

impl FromStr for InsuranceDecision {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undecided" => Ok(InsuranceDecision::Undecided),
            "taken" => Ok(InsuranceDecision::Taken),
            "declined" => Ok(InsuranceDecision::Declined),
            other => Err(DomainError::invalid(format!(
                "Unknown insurance decision: {other}"
            ))),
        }
    }
}

/// What an action-log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "bet", rename_all = "snake_case")]
pub enum ActionKind {
    Bet(BetKind),
    Repeat,
    Rollback(BetKind),
    Hit,
    Stand,
    Double,
    Split,
    Insurance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    #[serde(flatten)]
    pub kind: ActionKind,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub decision_deadline: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub action_time: OffsetDateTime,
}

impl ActionEntry {
    pub fn new(
        kind: ActionKind,
        amount: f64,
        decision_deadline: Option<OffsetDateTime>,
        action_time: OffsetDateTime,
    ) -> Self {
        Self {
            kind,
            amount,
            decision_deadline,
            action_time,
        }
    }
}

/// Merchant transactions a seat can commit, keyed for idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalKey {
    Bet,
    Double,
    Split,
    Insurance,
    Win,
    CancelBet,
    CancelDouble,
    CancelSplit,
    CancelInsurance,
}

impl ExternalKey {
    /// Keys whose transactions debit the player and can be cancelled on reset.
    pub const DEBITS: [ExternalKey; 4] = [
        ExternalKey::Bet,
        ExternalKey::Double,
        ExternalKey::Split,
        ExternalKey::Insurance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExternalKey::Bet => "bet",
            ExternalKey::Double => "double",
            ExternalKey::Split => "split",
            ExternalKey::Insurance => "insurance",
            ExternalKey::Win => "win",
            ExternalKey::CancelBet => "cancel_bet",
            ExternalKey::CancelDouble => "cancel_double",
            ExternalKey::CancelSplit => "cancel_split",
            ExternalKey::CancelInsurance => "cancel_insurance",
        }
    }

    pub fn cancel_key(self) -> Option<ExternalKey> {
        match self {
            ExternalKey::Bet => Some(ExternalKey::CancelBet),
            ExternalKey::Double => Some(ExternalKey::CancelDouble),
            ExternalKey::Split => Some(ExternalKey::CancelSplit),
            ExternalKey::Insurance => Some(ExternalKey::CancelInsurance),
            _ => None,
        }
    }
}

pub type ExternalIds = BTreeMap<ExternalKey, String>;

/// Net amount to refund for one committed debit when a round is reset.
///
/// The bet transaction carried the whole pre-deal stake, so every bet kind,
/// repeat and rollback entry counts towards it. Double, split and insurance
/// refund exactly what their own entries added.
pub fn cancel_amount(actions: &[ActionEntry], key: ExternalKey) -> f64 {
    actions
        .iter()
        .map(|entry| match (key, entry.kind) {
            (ExternalKey::Bet, ActionKind::Bet(_) | ActionKind::Repeat) => entry.amount,
            (ExternalKey::Bet, ActionKind::Rollback(_)) => -entry.amount,
            (ExternalKey::Double, ActionKind::Double)
            | (ExternalKey::Split, ActionKind::Split)
            | (ExternalKey::Insurance, ActionKind::Insurance) => entry.amount,
            _ => 0.0,
        })
        .sum()
}
