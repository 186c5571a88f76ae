//! Payloads carried by outbound events.

use serde::{Deserialize, Serialize};

use crate::domain::{BetKind, Card, Outcome, PlayerAction};

/// Outcome of a bet or rollback, sent to the bettor and mirrored to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetReceipt {
    pub seat_number: i16,
    pub bet_type: BetKind,
    /// Amount now standing on this bet kind.
    pub amount: f64,
    pub bet_list: Vec<f64>,
    pub total_bet: f64,
    pub balance: f64,
    /// The identity's stake across all of its seats in the round.
    pub user_total_bet: f64,
    pub user_name: String,
    pub player_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatReceipt {
    pub seats: Vec<BetReceipt>,
    pub balance: f64,
    pub user_total_bet: f64,
}

/// Prompt sent to the owner of the deciding seat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPrompt {
    pub seat_number: i16,
    pub cards: Vec<Card>,
    pub score: String,
    pub actions: Vec<PlayerAction>,
    pub decision_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandValue {
    pub seat_number: i16,
    pub cards: Vec<Card>,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerActionNotice {
    pub seat_number: i16,
    pub action: String,
    pub cards: Vec<Card>,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatResult {
    #[serde(rename = "type")]
    pub outcome: Outcome,
    pub seat_number: i16,
    pub winning_amount: f64,
}

/// A seat carried into the next round, cards cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenSeat {
    pub seat_number: i16,
    pub user_id: String,
    pub merchant_id: String,
    pub user_name: String,
    pub player_id: String,
}

impl TakenSeat {
    pub fn identity_key(&self) -> String {
        format!("{}:{}", self.user_id, self.merchant_id)
    }
}

pub type TakenSeats = Vec<TakenSeat>;
