//! Table view sent to clients that join or reconnect mid-round.

use serde::{Deserialize, Serialize};

use crate::domain::{BetLedger, Card, InsuranceDecision, LastAction, RoundPhase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatView {
    pub seat_number: i16,
    pub user_name: String,
    pub player_id: String,
    pub cards: Vec<Card>,
    pub score: String,
    pub bets: BetLedger,
    pub total_bet: f64,
    pub last_action: Option<LastAction>,
    pub insurance: InsuranceDecision,
    pub is_player_turn: bool,
    pub is_active: bool,
    /// Set only for the requesting identity's own seats.
    pub is_mine: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub table_id: String,
    pub table_name: String,
    pub round_id: i64,
    pub round_code: String,
    pub phase: RoundPhase,
    pub dealer_name: Option<String>,
    pub dealer_cards: Vec<Card>,
    pub dealer_score: String,
    pub betting_seconds_left: i64,
    pub insurance_seconds_left: i64,
    pub decision_seconds_left: i64,
    pub seats: Vec<SeatView>,
    pub balance: Option<f64>,
    pub min_bet: Option<f64>,
    pub max_bet: Option<f64>,
    pub max_side_bet: f64,
    pub bet_range: Vec<f64>,
}
