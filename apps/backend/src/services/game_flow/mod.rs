//! Live deal orchestration: card scans, player decisions, the turn sequencer
//! and the dealer's hand.
//!
//! Every entry point loads what it validates from the store rather than
//! trusting caller-provided state. Round writes are the serialization point
//! between concurrent scans; seat writes are version-checked and retried.

mod dealer;
mod dealing;
mod player_actions;
mod round_lifecycle;
mod turns;

pub use round_lifecycle::{generate_round_code, ROUND_CODE_LEN};

use crate::domain::Hand;
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::protocol::{Audience, HandValue, ServerEvent};
use crate::realtime::emit;
use crate::repos::{PlayerRound, Round};
use crate::state::AppState;

/// Game flow service.
#[derive(Debug, Default)]
pub struct GameFlowService;

impl GameFlowService {
    pub fn new() -> Self {
        Self
    }
}

fn invalid(kind: ValidationKind, message: impl Into<String>) -> AppError {
    DomainError::validation(kind, message).into()
}

fn hand_value(player: &PlayerRound) -> HandValue {
    HandValue {
        seat_number: player.seat_number,
        cards: player.cards.clone(),
        score: player.hand().label(),
    }
}

async fn emit_hand_value(state: &AppState, player: &PlayerRound) {
    emit(
        state.publisher(),
        Audience::table(&player.table_id),
        ServerEvent::SendHandValue(hand_value(player)),
    )
    .await;
}

async fn emit_dealer_score(state: &AppState, round: &Round) {
    let cards = round.visible_dealer_cards();
    emit(
        state.publisher(),
        Audience::table(&round.table_id),
        ServerEvent::DealerScore {
            score: Hand::dealer(cards).label(),
            cards: cards.to_vec(),
        },
    )
    .await;
}
