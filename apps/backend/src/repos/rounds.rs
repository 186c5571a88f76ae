//! Round repository: the record of a table's current deal.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::{Card, PhaseInputs, RoundPhase};
use crate::errors::domain::{DomainError, NotFoundKind};

/// Round domain model
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub id: i64,
    pub table_id: String,
    /// Short public code shown to players.
    pub round_code: String,
    pub dealer_cards: Vec<Card>,
    /// Cards dealt so far in the current pass over the seats.
    pub card_count: i32,
    pub betting_deadline: Option<OffsetDateTime>,
    pub insurance_deadline: Option<OffsetDateTime>,
    pub finished: bool,
    pub finished_dealing: bool,
    pub show_dealer_cards: bool,
    pub was_reset: bool,
    pub prev_round_id: Option<i64>,
    pub dealer_name: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub lock_version: i32,
}

impl Round {
    pub fn phase(&self, now: OffsetDateTime) -> RoundPhase {
        RoundPhase::derive(
            PhaseInputs {
                finished: self.finished,
                betting_deadline: self.betting_deadline,
                insurance_deadline: self.insurance_deadline,
                finished_dealing: self.finished_dealing,
                show_dealer_cards: self.show_dealer_cards,
            },
            now,
        )
    }

    pub fn betting_open(&self, now: OffsetDateTime) -> bool {
        self.betting_deadline.is_none_or(|d| now <= d)
    }

    pub fn insurance_open(&self, now: OffsetDateTime) -> bool {
        self.insurance_deadline.is_some_and(|d| now < d)
    }

    pub fn up_card(&self) -> Option<&Card> {
        self.dealer_cards.first()
    }

    /// Dealer cards the table may see. The hole card of a two-card deal
    /// stays hidden until the dealer's turn.
    pub fn visible_dealer_cards(&self) -> &[Card] {
        if self.show_dealer_cards || self.dealer_cards.len() < 2 {
            &self.dealer_cards
        } else {
            &self.dealer_cards[..1]
        }
    }
}

/// Fields for opening a new round.
#[derive(Debug, Clone)]
pub struct RoundCreate {
    pub table_id: String,
    pub round_code: String,
    pub prev_round_id: Option<i64>,
    pub dealer_name: Option<String>,
}

#[async_trait]
pub trait RoundRepo: Send + Sync {
    async fn find_by_id(&self, round_id: i64) -> Result<Option<Round>, DomainError>;

    /// The table's unfinished round, if any.
    async fn find_open(&self, table_id: &str) -> Result<Option<Round>, DomainError>;

    /// Round opened as the successor of `prev_round_id`.
    async fn find_successor(&self, prev_round_id: i64) -> Result<Option<Round>, DomainError>;

    async fn create(&self, dto: RoundCreate) -> Result<Round, DomainError>;

    /// Persist every mutable field if nobody has written since `round` was read.
    async fn update_if_version(&self, round: &Round) -> Result<Round, DomainError>;

    /// Mark every open round of the table finished. Returns rows touched.
    async fn finish_open(&self, table_id: &str) -> Result<u64, DomainError>;
}

pub async fn require_round(repo: &dyn RoundRepo, round_id: i64) -> Result<Round, DomainError> {
    repo.find_by_id(round_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Round, format!("Round {round_id} not found"))
    })
}
