//! Row conversions for the player_rounds adapter.

use sea_orm::{NotSet, Set};
use time::OffsetDateTime;

use crate::adapters::json_columns::{decode, encode};
use crate::domain::{InsuranceDecision, LastAction};
use crate::entities::player_rounds::{self, HandAction, Insurance};
use crate::errors::domain::DomainError;
use crate::repos::player_rounds::{NewPlayerRound, PlayerIdentity, PlayerRound};

impl From<HandAction> for LastAction {
    fn from(value: HandAction) -> Self {
        match value {
            HandAction::Hit => LastAction::Hit,
            HandAction::Stand => LastAction::Stand,
            HandAction::Double => LastAction::Double,
            HandAction::SplitFirst => LastAction::SplitFirst,
            HandAction::SplitSecond => LastAction::SplitSecond,
        }
    }
}

impl From<LastAction> for HandAction {
    fn from(value: LastAction) -> Self {
        match value {
            LastAction::Hit => HandAction::Hit,
            LastAction::Stand => HandAction::Stand,
            LastAction::Double => HandAction::Double,
            LastAction::SplitFirst => HandAction::SplitFirst,
            LastAction::SplitSecond => HandAction::SplitSecond,
        }
    }
}

impl From<Insurance> for InsuranceDecision {
    fn from(value: Insurance) -> Self {
        match value {
            Insurance::Undecided => InsuranceDecision::Undecided,
            Insurance::Taken => InsuranceDecision::Taken,
            Insurance::Declined => InsuranceDecision::Declined,
        }
    }
}

impl From<InsuranceDecision> for Insurance {
    fn from(value: InsuranceDecision) -> Self {
        match value {
            InsuranceDecision::Undecided => Insurance::Undecided,
            InsuranceDecision::Taken => Insurance::Taken,
            InsuranceDecision::Declined => Insurance::Declined,
        }
    }
}

impl TryFrom<player_rounds::Model> for PlayerRound {
    type Error = DomainError;

    fn try_from(m: player_rounds::Model) -> Result<Self, Self::Error> {
        Ok(PlayerRound {
            id: m.id,
            round_id: m.round_id,
            table_id: m.table_id,
            seat_number: m.seat_number,
            identity: PlayerIdentity {
                user_id: m.user_id,
                merchant_id: m.merchant_id,
                user_name: m.user_name,
                user_token: m.user_token,
                player_id: m.player_id,
            },
            connection_id: m.connection_id,
            cards: decode(m.cards, "cards")?,
            bets: decode(m.bets, "bets")?,
            total_bet: m.total_bet,
            insurance_amount: m.insurance_amount,
            actions: decode(m.actions, "actions")?,
            is_player_turn: m.is_player_turn,
            is_making_decision: m.is_making_decision,
            finished_turn: m.finished_turn,
            decision_deadline: m.decision_deadline,
            last_action: m.last_action.map(LastAction::from),
            insurance: m.insurance.into(),
            external_ids: decode(m.external_ids, "external_ids")?,
            balance: m.balance,
            winning_amount: m.winning_amount,
            archived: m.archived,
            rejected: m.rejected,
            is_reset: m.is_reset,
            is_active: m.is_active,
            detail: m.detail,
            inactivity_check_at: m.inactivity_check_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
            lock_version: m.lock_version,
        })
    }
}

pub fn new_row(
    dto: NewPlayerRound,
    now: OffsetDateTime,
) -> Result<player_rounds::ActiveModel, DomainError> {
    Ok(player_rounds::ActiveModel {
        id: NotSet,
        round_id: Set(dto.round_id),
        table_id: Set(dto.table_id),
        seat_number: Set(dto.seat_number),
        user_id: Set(dto.identity.user_id),
        merchant_id: Set(dto.identity.merchant_id),
        user_name: Set(dto.identity.user_name),
        user_token: Set(dto.identity.user_token),
        player_id: Set(dto.identity.player_id),
        connection_id: Set(dto.connection_id),
        cards: Set(encode(&dto.cards, "cards")?),
        bets: Set(encode(&dto.bets, "bets")?),
        total_bet: Set(dto.total_bet),
        insurance_amount: Set(0.0),
        actions: Set(serde_json::json!([])),
        is_player_turn: Set(false),
        is_making_decision: Set(false),
        finished_turn: Set(false),
        decision_deadline: Set(None),
        last_action: Set(dto.last_action.map(HandAction::from)),
        insurance: Set(Insurance::Undecided),
        external_ids: Set(encode(&dto.external_ids, "external_ids")?),
        balance: Set(dto.balance),
        winning_amount: Set(0.0),
        archived: Set(false),
        rejected: Set(false),
        is_reset: Set(false),
        is_active: Set(true),
        detail: Set(None),
        inactivity_check_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        lock_version: Set(1),
    })
}

/// Everything a seat update may touch; identity, round and seat are fixed.
pub fn mutable_columns(player: &PlayerRound) -> Result<player_rounds::ActiveModel, DomainError> {
    Ok(player_rounds::ActiveModel {
        id: NotSet,
        round_id: NotSet,
        table_id: NotSet,
        seat_number: NotSet,
        user_id: NotSet,
        merchant_id: NotSet,
        user_name: Set(player.identity.user_name.clone()),
        user_token: Set(player.identity.user_token.clone()),
        player_id: NotSet,
        connection_id: Set(player.connection_id.clone()),
        cards: Set(encode(&player.cards, "cards")?),
        bets: Set(encode(&player.bets, "bets")?),
        total_bet: Set(player.total_bet),
        insurance_amount: Set(player.insurance_amount),
        actions: Set(encode(&player.actions, "actions")?),
        is_player_turn: Set(player.is_player_turn),
        is_making_decision: Set(player.is_making_decision),
        finished_turn: Set(player.finished_turn),
        decision_deadline: Set(player.decision_deadline),
        last_action: Set(player.last_action.map(HandAction::from)),
        insurance: Set(player.insurance.into()),
        external_ids: Set(encode(&player.external_ids, "external_ids")?),
        balance: Set(player.balance),
        winning_amount: Set(player.winning_amount),
        archived: Set(player.archived),
        rejected: Set(player.rejected),
        is_reset: Set(player.is_reset),
        is_active: Set(player.is_active),
        detail: Set(player.detail.clone()),
        inactivity_check_at: Set(player.inactivity_check_at),
        created_at: NotSet,
        updated_at: NotSet,
        lock_version: NotSet,
    })
}
