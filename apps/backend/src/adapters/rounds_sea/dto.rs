//! Row conversions for the rounds adapter.

use sea_orm::{NotSet, Set};

use crate::adapters::json_columns::{decode, encode};
use crate::entities::rounds;
use crate::errors::domain::DomainError;
use crate::repos::rounds::Round;

impl TryFrom<rounds::Model> for Round {
    type Error = DomainError;

    fn try_from(m: rounds::Model) -> Result<Self, Self::Error> {
        Ok(Round {
            id: m.id,
            table_id: m.table_id,
            round_code: m.round_code,
            dealer_cards: decode(m.dealer_cards, "dealer_cards")?,
            card_count: m.card_count,
            betting_deadline: m.betting_deadline,
            insurance_deadline: m.insurance_deadline,
            finished: m.finished,
            finished_dealing: m.finished_dealing,
            show_dealer_cards: m.show_dealer_cards,
            was_reset: m.was_reset,
            prev_round_id: m.prev_round_id,
            dealer_name: m.dealer_name,
            created_at: m.created_at,
            updated_at: m.updated_at,
            lock_version: m.lock_version,
        })
    }
}

/// Mutable columns of a round. Identity, creation time and version are left
/// to the update helper.
pub fn mutable_columns(round: &Round) -> Result<rounds::ActiveModel, DomainError> {
    Ok(rounds::ActiveModel {
        id: NotSet,
        table_id: NotSet,
        round_code: NotSet,
        dealer_cards: Set(encode(&round.dealer_cards, "dealer_cards")?),
        card_count: Set(round.card_count),
        betting_deadline: Set(round.betting_deadline),
        insurance_deadline: Set(round.insurance_deadline),
        finished: Set(round.finished),
        finished_dealing: Set(round.finished_dealing),
        show_dealer_cards: Set(round.show_dealer_cards),
        was_reset: Set(round.was_reset),
        prev_round_id: NotSet,
        dealer_name: Set(round.dealer_name.clone()),
        created_at: NotSet,
        updated_at: NotSet,
        lock_version: NotSet,
    })
}
