//! Order in which seats are dealt to and asked for decisions.

use std::time::Duration;

use crate::cache::{get_json, keys, set_json};
use crate::error::AppError;
use crate::repos::PlayerRound;
use crate::state::AppState;

const SEAT_ORDER_TTL: Duration = Duration::from_secs(7200);

/// Seats holding a live primary bet, lowest first.
pub fn build(players: &[PlayerRound]) -> Vec<i16> {
    let mut order: Vec<i16> = players
        .iter()
        .filter(|p| !p.rejected && !p.archived && p.primary_bet() > 0.0)
        .map(|p| p.seat_number)
        .collect();
    order.sort_unstable();
    order
}

pub async fn store(state: &AppState, round_id: i64, order: &[i16]) -> Result<(), AppError> {
    set_json(
        state.cache(),
        &keys::seat_order(round_id),
        &order,
        Some(SEAT_ORDER_TTL),
    )
    .await
}

/// Rebuild from the store and cache it.
pub async fn rebuild(state: &AppState, round_id: i64) -> Result<Vec<i16>, AppError> {
    let players = state.players.list_by_round(round_id).await?;
    let order = build(&players);
    store(state, round_id, &order).await?;
    Ok(order)
}

pub async fn load(state: &AppState, round_id: i64) -> Result<Vec<i16>, AppError> {
    match get_json::<Vec<i16>>(state.cache(), &keys::seat_order(round_id)).await? {
        Some(order) => Ok(order),
        None => rebuild(state, round_id).await,
    }
}
