//! Table view for clients that join or reconnect mid-round.

use super::common::{require_open_round, seconds_left};
use super::table_config::{merchant_config, table_config};
use super::wallet;
use crate::domain::Hand;
use crate::error::AppError;
use crate::protocol::{SeatView, SessionContext, TableSnapshot};
use crate::repos::PlayerRound;
use crate::state::AppState;

fn seat_view(player: &PlayerRound, viewer: Option<&str>) -> SeatView {
    SeatView {
        seat_number: player.seat_number,
        user_name: player.identity.user_name.clone(),
        player_id: player.identity.player_id.clone(),
        cards: player.cards.clone(),
        score: player.hand().label(),
        bets: player.bets.clone(),
        total_bet: player.total_bet,
        last_action: player.last_action,
        insurance: player.insurance,
        is_player_turn: player.is_player_turn,
        is_active: player.is_active,
        is_mine: viewer.is_some_and(|key| key == player.identity.key()),
    }
}

pub async fn table_snapshot(
    state: &AppState,
    session: &SessionContext,
) -> Result<TableSnapshot, AppError> {
    let table = table_config(state, &session.table_id).await?;
    let round = require_open_round(state, &session.table_id).await?;
    let now = state.clock.now();
    let players = state.players.list_by_round(round.id).await?;

    let viewer = session.player.as_ref().map(|p| p.key());
    let (balance, limits) = match &session.player {
        Some(identity) => {
            let merchant = merchant_config(state, &identity.merchant_id, &table.id).await?;
            let balance = wallet::balance(state, &identity.key()).await?;
            (Some(balance), Some(merchant))
        }
        None => (None, None),
    };

    let decision_seconds_left = players
        .iter()
        .find(|p| p.is_player_turn && p.is_making_decision)
        .map_or(0, |p| seconds_left(p.decision_deadline, now));
    let dealer_cards = round.visible_dealer_cards();

    Ok(TableSnapshot {
        table_id: table.id.clone(),
        table_name: table.name.clone(),
        round_id: round.id,
        round_code: round.round_code.clone(),
        phase: round.phase(now),
        dealer_name: round.dealer_name.clone(),
        dealer_cards: dealer_cards.to_vec(),
        dealer_score: Hand::dealer(dealer_cards).label(),
        betting_seconds_left: seconds_left(round.betting_deadline, now),
        insurance_seconds_left: seconds_left(round.insurance_deadline, now),
        decision_seconds_left,
        seats: players
            .iter()
            .filter(|p| !p.rejected && (p.total_bet > 0.0 || !p.cards.is_empty()))
            .map(|p| seat_view(p, viewer.as_deref()))
            .collect(),
        balance,
        min_bet: limits.as_ref().map(|m| m.min_bet),
        max_bet: limits.as_ref().map(|m| m.max_bet),
        max_side_bet: table.max_side_bet,
        bet_range: limits.map(|m| m.bet_range).unwrap_or_default(),
    })
}
