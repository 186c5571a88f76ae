//! Seat participation repository.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::{
    ActionEntry, BetLedger, Card, ExternalIds, Hand, InsuranceDecision, LastAction,
};
use crate::errors::domain::{DomainError, NotFoundKind};

/// Who sits at a seat. The merchant session token travels with every wallet
/// call made on the player's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub user_id: String,
    pub merchant_id: String,
    pub user_name: String,
    pub user_token: String,
    pub player_id: String,
}

impl PlayerIdentity {
    /// `{user}:{merchant}`, the value stored in seat claims and the balance key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.user_id, self.merchant_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRound {
    pub id: i64,
    pub round_id: i64,
    pub table_id: String,
    pub seat_number: i16,
    pub identity: PlayerIdentity,
    pub connection_id: Option<String>,
    pub cards: Vec<Card>,
    pub bets: BetLedger,
    pub total_bet: f64,
    pub insurance_amount: f64,
    pub actions: Vec<ActionEntry>,
    pub is_player_turn: bool,
    pub is_making_decision: bool,
    pub finished_turn: bool,
    pub decision_deadline: Option<OffsetDateTime>,
    pub last_action: Option<LastAction>,
    pub insurance: InsuranceDecision,
    pub external_ids: ExternalIds,
    pub balance: f64,
    pub winning_amount: f64,
    pub archived: bool,
    pub rejected: bool,
    pub is_reset: bool,
    pub is_active: bool,
    pub detail: Option<String>,
    pub inactivity_check_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub lock_version: i32,
}

impl PlayerRound {
    pub fn hand(&self) -> Hand<'_> {
        Hand::new(&self.cards, self.last_action)
    }

    pub fn primary_bet(&self) -> f64 {
        self.bets.primary()
    }

    pub fn is_owned_by(&self, user_id: &str, merchant_id: &str) -> bool {
        self.identity.user_id == user_id && self.identity.merchant_id == merchant_id
    }

    /// End this seat's turn without touching its last action.
    pub fn finish_turn(&mut self) {
        self.is_making_decision = false;
        self.is_player_turn = false;
        self.finished_turn = true;
    }
}

/// Fields for a new seat participation.
#[derive(Debug, Clone)]
pub struct NewPlayerRound {
    pub round_id: i64,
    pub table_id: String,
    pub seat_number: i16,
    pub identity: PlayerIdentity,
    pub connection_id: Option<String>,
    pub balance: f64,
    pub cards: Vec<Card>,
    pub bets: BetLedger,
    pub total_bet: f64,
    pub last_action: Option<LastAction>,
    pub external_ids: ExternalIds,
}

impl NewPlayerRound {
    pub fn empty(
        round_id: i64,
        table_id: impl Into<String>,
        seat_number: i16,
        identity: PlayerIdentity,
        connection_id: Option<String>,
        balance: f64,
    ) -> Self {
        Self {
            round_id,
            table_id: table_id.into(),
            seat_number,
            identity,
            connection_id,
            balance,
            cards: Vec::new(),
            bets: BetLedger::default(),
            total_bet: 0.0,
            last_action: None,
            external_ids: ExternalIds::new(),
        }
    }
}

#[async_trait]
pub trait PlayerRoundRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<PlayerRound>, DomainError>;

    async fn find_by_seat(
        &self,
        round_id: i64,
        seat_number: i16,
    ) -> Result<Option<PlayerRound>, DomainError>;

    /// Every seat of the round ordered by seat number.
    async fn list_by_round(&self, round_id: i64) -> Result<Vec<PlayerRound>, DomainError>;

    /// Unarchived seats an identity holds on a table.
    async fn list_open_by_identity(
        &self,
        table_id: &str,
        user_id: &str,
        merchant_id: &str,
    ) -> Result<Vec<PlayerRound>, DomainError>;

    /// Seat whose turn it currently is.
    async fn find_current_turn(&self, round_id: i64) -> Result<Option<PlayerRound>, DomainError>;

    /// Insert; a second row for the same round and seat is a `SeatTaken` conflict.
    async fn insert(&self, dto: NewPlayerRound) -> Result<PlayerRound, DomainError>;

    async fn update_if_version(&self, player: &PlayerRound) -> Result<PlayerRound, DomainError>;

    /// Sum of total bet across every seat the identity holds in the round.
    async fn sum_total_bet(
        &self,
        round_id: i64,
        user_id: &str,
        merchant_id: &str,
    ) -> Result<f64, DomainError>;
}

pub async fn require_player_round(
    repo: &dyn PlayerRoundRepo,
    round_id: i64,
    seat_number: i16,
) -> Result<PlayerRound, DomainError> {
    repo.find_by_seat(round_id, seat_number).await?.ok_or_else(|| {
        DomainError::not_found(
            NotFoundKind::PlayerRound,
            format!("No player at seat {seat_number} in round {round_id}"),
        )
    })
}
