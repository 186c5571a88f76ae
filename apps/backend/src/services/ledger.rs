//! Seat claims and bet bookkeeping while a round takes bets.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};

use super::common::{require_open_round, require_player};
use super::table_config::{merchant_config, table_config};
use super::versioned::retry_on_conflict;
use super::wallet;
use crate::cache::{get_json, keys};
use crate::domain::seats::ensure_betting_seat;
use crate::domain::{ActionEntry, ActionKind, BetKind, BetLedger};
use crate::error::AppError;
use crate::errors::domain::{ConflictKind, DomainError, ValidationKind};
use crate::errors::ErrorCode;
use crate::protocol::{Audience, BetReceipt, RepeatReceipt, ServerEvent, SessionContext};
use crate::realtime::emit;
use crate::repos::rounds::require_round;
use crate::repos::{MerchantConfig, NewPlayerRound, PlayerIdentity, PlayerRound, Round, TableConfig};
use crate::state::AppState;
use crate::tasks::DeferredTask;

const NOT_ENOUGH_FUNDS: &str = "Not enough funds";
const NOT_ENOUGH_FUNDS_FOR_REPEAT: &str = "not enough funds to make repeat";

/// How a seat came to be held by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatClaim {
    /// Already held before this call.
    Held,
    /// Claimed by this call; release it if the operation fails.
    Claimed,
}

/// One seat's bets as remembered for the next round's repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeatSeat {
    pub seat_number: i16,
    pub bets: BetLedger,
}

fn invalid(kind: ValidationKind, message: impl Into<String>) -> AppError {
    DomainError::validation(kind, message).into()
}

fn betting_over() -> AppError {
    invalid(ValidationKind::BettingClosed, "Betting time is over")
}

fn seat_taken() -> AppError {
    DomainError::conflict(ConflictKind::SeatTaken, "Seat is already taken").into()
}

/// A seat row created concurrently by the same identity; re-read and retry.
fn retry_if_seat_raced(err: AppError) -> AppError {
    match err {
        AppError::Conflict {
            code: ErrorCode::SeatTaken,
            detail,
        } => AppError::conflict(ErrorCode::OptimisticLock, detail),
        other => other,
    }
}

/// Checks one bet of `amount` on `kind` against the seat's current lines.
pub fn validate_bet(
    bets: &BetLedger,
    kind: BetKind,
    amount: f64,
    merchant: &MerchantConfig,
    table: &TableConfig,
) -> Result<(), AppError> {
    let new_total = bets.amount(kind) + amount;
    if kind.is_side() {
        let primary = bets.primary();
        if primary <= 0.0 {
            return Err(invalid(
                ValidationKind::NoBet,
                "Can not place side bet before placing main bet.",
            ));
        }
        if new_total > primary {
            return Err(invalid(
                ValidationKind::SideBetLimit,
                "Side bet can not be more than main bet",
            ));
        }
        if new_total > table.max_side_bet {
            return Err(invalid(
                ValidationKind::SideBetLimit,
                format!("Side bet can not be more than {}", table.max_side_bet),
            ));
        }
    } else {
        if new_total > merchant.max_bet {
            return Err(invalid(
                ValidationKind::BetLimit,
                format!("Bet can not be more than {}", merchant.max_bet),
            ));
        }
        if new_total < merchant.min_bet {
            return Err(invalid(
                ValidationKind::BetLimit,
                format!("Bet can not be less than {}", merchant.min_bet),
            ));
        }
    }
    Ok(())
}

/// Checks a whole set of lines taken over by repeat.
fn validate_lines(
    bets: &BetLedger,
    merchant: &MerchantConfig,
    table: &TableConfig,
) -> Result<(), AppError> {
    let primary = bets.primary();
    validate_bet(&BetLedger::default(), BetKind::Primary, primary, merchant, table)?;
    let mut with_primary = BetLedger::default();
    with_primary.line_mut(BetKind::Primary).add(primary);
    for kind in [BetKind::TwentyOnePlusThree, BetKind::PerfectPair] {
        let amount = bets.amount(kind);
        if amount > 0.0 {
            validate_bet(&with_primary, kind, amount, merchant, table)?;
        }
    }
    Ok(())
}

pub fn receipt(player: &PlayerRound, kind: BetKind, user_total_bet: f64) -> BetReceipt {
    let line = player.bets.line(kind);
    BetReceipt {
        seat_number: player.seat_number,
        bet_type: kind,
        amount: line.amount,
        bet_list: line.history,
        total_bet: player.total_bet,
        balance: player.balance,
        user_total_bet,
        user_name: player.identity.user_name.clone(),
        player_id: player.identity.player_id.clone(),
    }
}

/// Seat and bet ledger service.
#[derive(Debug, Default)]
pub struct LedgerService;

impl LedgerService {
    pub fn new() -> Self {
        Self
    }

    /// Claim `seat` for `identity` in `round`.
    ///
    /// The claim is a set-if-absent on `{round}:{seat}`; of two concurrent
    /// claims for an empty seat exactly one wins. A seat the identity already
    /// holds is a no-op. A seat another identity held in the previous round
    /// stays locked until that round's seats are cleaned.
    pub async fn take_seat(
        &self,
        state: &AppState,
        round: &Round,
        seat: i16,
        identity: &PlayerIdentity,
    ) -> Result<SeatClaim, AppError> {
        let me = identity.key();
        let claim_key = keys::seat_claim(round.id, seat);

        if state.cache().get(&claim_key).await?.as_deref() == Some(me.as_str()) {
            return Ok(SeatClaim::Held);
        }

        if let Some(prev_round_id) = round.prev_round_id {
            let previous = state
                .cache()
                .get(&keys::seat_claim(prev_round_id, seat))
                .await?;
            if previous.as_deref().is_some_and(|holder| holder != me) {
                return Err(
                    DomainError::conflict(ConflictKind::SeatLocked, "Seat is locked").into(),
                );
            }
        }

        if state.cache().set_nx(&claim_key, &me).await? {
            debug!(round_id = round.id, seat, "seat claimed");
            return Ok(SeatClaim::Claimed);
        }

        match state.cache().get(&claim_key).await? {
            Some(holder) if holder == me => Ok(SeatClaim::Held),
            _ => Err(seat_taken()),
        }
    }

    pub async fn release_seat(
        &self,
        state: &AppState,
        round_id: i64,
        seat: i16,
    ) -> Result<(), AppError> {
        state.cache().delete(&keys::seat_claim(round_id, seat)).await
    }

    pub async fn place_bet(
        &self,
        state: &AppState,
        session: &SessionContext,
        seat_number: i16,
        bet_type: &str,
        amount: f64,
    ) -> Result<BetReceipt, AppError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(invalid(ValidationKind::InvalidAmount, "Unsupported amount"));
        }
        let kind = BetKind::parse_with(bet_type, "Bet type is unknown")?;
        ensure_betting_seat(seat_number)?;
        let identity = require_player(session)?;

        let round = require_open_round(state, &session.table_id).await?;
        if !round.betting_open(state.clock.now()) {
            return Err(betting_over());
        }
        let merchant = merchant_config(state, &identity.merchant_id, &session.table_id).await?;
        let table = table_config(state, &session.table_id).await?;

        let claim = self
            .take_seat(state, &round, seat_number, identity)
            .await?;

        let committed = self
            .commit_bet(
                state,
                session,
                identity,
                &round,
                (&merchant, &table),
                seat_number,
                kind,
                amount,
            )
            .await;
        let player = match committed {
            Ok(player) => player,
            Err(err) => {
                if claim == SeatClaim::Claimed {
                    self.release_seat(state, round.id, seat_number).await?;
                }
                return Err(err);
            }
        };

        info!(
            round_id = round.id,
            seat = seat_number,
            bet_type = kind.as_str(),
            amount,
            "bet placed"
        );

        let user_total_bet = state
            .players
            .sum_total_bet(round.id, &identity.user_id, &identity.merchant_id)
            .await?;
        let receipt = receipt(&player, kind, user_total_bet);
        emit(
            state.publisher(),
            Audience::connection(&session.connection_id),
            ServerEvent::BetStatus(receipt.clone()),
        )
        .await;
        emit(
            state.publisher(),
            Audience::table_except(&session.table_id, &session.connection_id),
            ServerEvent::NewBet(receipt.clone()),
        )
        .await;

        start_betting_timer(state, round.id).await?;
        Ok(receipt)
    }

    #[allow(clippy::too_many_arguments)]
    async fn commit_bet(
        &self,
        state: &AppState,
        session: &SessionContext,
        identity: &PlayerIdentity,
        round: &Round,
        limits: (&MerchantConfig, &TableConfig),
        seat_number: i16,
        kind: BetKind,
        amount: f64,
    ) -> Result<PlayerRound, AppError> {
        let (merchant, table) = limits;
        let me = identity.key();
        retry_on_conflict(state.config.version_retries, "place_bet", || async {
            let existing = state.players.find_by_seat(round.id, seat_number).await?;
            if let Some(player) = &existing {
                if !player.is_owned_by(&identity.user_id, &identity.merchant_id) {
                    return Err(seat_taken());
                }
            }
            let current = existing
                .as_ref()
                .map(|p| p.bets.clone())
                .unwrap_or_default();
            validate_bet(&current, kind, amount, merchant, table)?;

            if wallet::balance(state, &me).await? < amount {
                return Err(invalid(ValidationKind::InsufficientFunds, NOT_ENOUGH_FUNDS));
            }
            let balance_after = wallet::debit(state, &me, amount, NOT_ENOUGH_FUNDS).await?;

            let written = write_bet(
                state,
                session,
                identity,
                round,
                existing,
                seat_number,
                kind,
                amount,
                balance_after,
            )
            .await;
            if written.is_err() {
                wallet::credit(state, &me, amount).await?;
            }
            written
        })
        .await
    }

    pub async fn rollback(
        &self,
        state: &AppState,
        session: &SessionContext,
        seat_number: i16,
        bet_type: &str,
    ) -> Result<BetReceipt, AppError> {
        let identity = require_player(session)?;
        let round = require_open_round(state, &session.table_id).await?;
        let not_placed = || invalid(ValidationKind::NoBet, "Player has not placed any bet yet");

        let player = match state.players.find_by_seat(round.id, seat_number).await? {
            Some(p) if p.is_owned_by(&identity.user_id, &identity.merchant_id) => p,
            _ => return Err(not_placed()),
        };
        if player.total_bet <= 0.0 {
            return Err(not_placed());
        }
        let kind = BetKind::parse_with(bet_type, "Rollback type is unknown")?;
        if !round.betting_open(state.clock.now()) {
            return Err(invalid(ValidationKind::BettingClosed, "Rollback time is over"));
        }

        let me = identity.key();
        let (player, refunded) =
            retry_on_conflict(state.config.version_retries, "rollback", || async {
                let mut player = state
                    .players
                    .find_by_seat(round.id, seat_number)
                    .await?
                    .ok_or_else(not_placed)?;
                let line = player.bets.line(kind);
                let Some(&last) = line.history.last() else {
                    return Err(invalid(ValidationKind::NoBet, "There is no bet to rollback"));
                };
                if kind == BetKind::Primary {
                    let remaining = line.amount - last;
                    for side in [BetKind::TwentyOnePlusThree, BetKind::PerfectPair] {
                        if player.bets.amount(side) > remaining {
                            return Err(invalid(
                                ValidationKind::SideBetLimit,
                                format!(
                                    "Side bet {} can not be more than main bet",
                                    side.display_name()
                                ),
                            ));
                        }
                    }
                }

                player.bets.line_mut(kind).pop();
                player.total_bet = player.bets.total();
                player.balance += last;
                player.actions.push(ActionEntry::new(
                    ActionKind::Rollback(kind),
                    last,
                    None,
                    state.clock.now(),
                ));
                let saved = state.players.update_if_version(&player).await?;
                Ok((saved, last))
            })
            .await?;

        let balance = wallet::credit(state, &me, refunded).await?;
        if player.total_bet <= 0.0 {
            self.release_seat(state, round.id, seat_number).await?;
        }
        info!(
            round_id = round.id,
            seat = seat_number,
            bet_type = kind.as_str(),
            refunded,
            "bet rolled back"
        );

        let user_total_bet = state
            .players
            .sum_total_bet(round.id, &identity.user_id, &identity.merchant_id)
            .await?;
        let mut receipt = receipt(&player, kind, user_total_bet);
        receipt.balance = balance;
        emit(
            state.publisher(),
            Audience::connection(&session.connection_id),
            ServerEvent::RollbackStatus(receipt.clone()),
        )
        .await;
        emit(
            state.publisher(),
            Audience::table_except(&session.table_id, &session.connection_id),
            ServerEvent::NewRollback(receipt.clone()),
        )
        .await;
        Ok(receipt)
    }

    /// Re-place the identity's bets from the previous round.
    pub async fn repeat(
        &self,
        state: &AppState,
        session: &SessionContext,
    ) -> Result<RepeatReceipt, AppError> {
        let identity = require_player(session)?;
        let round = require_open_round(state, &session.table_id).await?;
        if !round.betting_open(state.clock.now()) {
            return Err(betting_over());
        }
        let unavailable = || invalid(ValidationKind::RepeatUnavailable, "can't make repeat");
        let prev_round_id = round.prev_round_id.ok_or_else(unavailable)?;
        let seats = get_json::<Vec<RepeatSeat>>(
            state.cache(),
            &keys::repeat_data(&identity.key(), prev_round_id),
        )
        .await?
        .filter(|seats| !seats.is_empty())
        .ok_or_else(unavailable)?;

        let merchant = merchant_config(state, &identity.merchant_id, &session.table_id).await?;
        let table = table_config(state, &session.table_id).await?;

        let mut claimed = Vec::new();
        let outcome = async {
            for seat in &seats {
                ensure_betting_seat(seat.seat_number)?;
                validate_lines(&seat.bets, &merchant, &table)?;
            }
            for seat in &seats {
                if self
                    .take_seat(state, &round, seat.seat_number, identity)
                    .await?
                    == SeatClaim::Claimed
                {
                    claimed.push(seat.seat_number);
                }
            }
            self.commit_repeat(state, session, identity, &round, &seats)
                .await
        }
        .await;

        let players = match outcome {
            Ok(players) => players,
            Err(err) => {
                for seat in claimed {
                    self.release_seat(state, round.id, seat).await?;
                }
                return Err(err);
            }
        };

        let user_total_bet = state
            .players
            .sum_total_bet(round.id, &identity.user_id, &identity.merchant_id)
            .await?;
        let balance = wallet::balance(state, &identity.key()).await?;
        let mut receipts = Vec::new();
        for player in &players {
            for (kind, line) in player.bets.iter() {
                if line.amount > 0.0 {
                    let mut r = receipt(player, *kind, user_total_bet);
                    r.balance = balance;
                    receipts.push(r);
                }
            }
        }
        info!(round_id = round.id, seats = players.len(), "repeat made");

        emit(
            state.publisher(),
            Audience::connection(&session.connection_id),
            ServerEvent::RepeatStatus(RepeatReceipt {
                seats: receipts.clone(),
                balance,
                user_total_bet,
            }),
        )
        .await;
        for r in &receipts {
            emit(
                state.publisher(),
                Audience::table_except(&session.table_id, &session.connection_id),
                ServerEvent::NewBet(r.clone()),
            )
            .await;
        }

        start_betting_timer(state, round.id).await?;
        Ok(RepeatReceipt {
            seats: receipts,
            balance,
            user_total_bet,
        })
    }

    async fn commit_repeat(
        &self,
        state: &AppState,
        session: &SessionContext,
        identity: &PlayerIdentity,
        round: &Round,
        seats: &[RepeatSeat],
    ) -> Result<Vec<PlayerRound>, AppError> {
        let me = identity.key();

        let mut needed = 0.0;
        for seat in seats {
            let player = state.players.find_by_seat(round.id, seat.seat_number).await?;
            if let Some(p) = &player {
                if !p.is_owned_by(&identity.user_id, &identity.merchant_id) {
                    return Err(seat_taken());
                }
                if p.primary_bet() == seat.bets.primary() {
                    return Err(invalid(
                        ValidationKind::RepeatUnavailable,
                        "Repeat is already made",
                    ));
                }
            }
            needed += seat.bets.total() - player.as_ref().map_or(0.0, |p| p.total_bet);
        }
        if needed > wallet::balance(state, &me).await? {
            return Err(invalid(
                ValidationKind::InsufficientFunds,
                NOT_ENOUGH_FUNDS_FOR_REPEAT,
            ));
        }

        let mut saved = Vec::with_capacity(seats.len());
        for seat in seats {
            let player = retry_on_conflict(state.config.version_retries, "repeat", || async {
                let current = state.players.find_by_seat(round.id, seat.seat_number).await?;
                let delta = seat.bets.total() - current.as_ref().map_or(0.0, |p| p.total_bet);
                let balance_after = if delta > 0.0 {
                    wallet::debit(state, &me, delta, NOT_ENOUGH_FUNDS_FOR_REPEAT).await?
                } else {
                    wallet::credit(state, &me, -delta).await?
                };

                let written = async {
                    let mut player = match current {
                        Some(p) => p,
                        None => state
                            .players
                            .insert(NewPlayerRound::empty(
                                round.id,
                                session.table_id.clone(),
                                seat.seat_number,
                                identity.clone(),
                                Some(session.connection_id.clone()),
                                balance_after,
                            ))
                            .await
                            .map_err(|e| retry_if_seat_raced(e.into()))?,
                    };
                    player.bets = seat.bets.clone();
                    for kind in BetKind::ALL {
                        let line = player.bets.line_mut(kind);
                        line.winning = 0.0;
                        line.combination = None;
                    }
                    player.total_bet = player.bets.total();
                    player.balance = balance_after;
                    player.connection_id = Some(session.connection_id.clone());
                    player.is_active = true;
                    player.actions.push(ActionEntry::new(
                        ActionKind::Repeat,
                        delta,
                        None,
                        state.clock.now(),
                    ));
                    Ok::<_, AppError>(state.players.update_if_version(&player).await?)
                }
                .await;

                if written.is_err() {
                    if delta > 0.0 {
                        wallet::credit(state, &me, delta).await?;
                    } else {
                        wallet::debit(state, &me, -delta, NOT_ENOUGH_FUNDS_FOR_REPEAT).await?;
                    }
                }
                written
            })
            .await?;
            saved.push(player);
        }
        Ok(saved)
    }
}

#[allow(clippy::too_many_arguments)]
async fn write_bet(
    state: &AppState,
    session: &SessionContext,
    identity: &PlayerIdentity,
    round: &Round,
    existing: Option<PlayerRound>,
    seat_number: i16,
    kind: BetKind,
    amount: f64,
    balance_after: f64,
) -> Result<PlayerRound, AppError> {
    let mut player = match existing {
        Some(player) => player,
        None => state
            .players
            .insert(NewPlayerRound::empty(
                round.id,
                session.table_id.clone(),
                seat_number,
                identity.clone(),
                Some(session.connection_id.clone()),
                balance_after,
            ))
            .await
            .map_err(|e| retry_if_seat_raced(e.into()))?,
    };
    player.bets.line_mut(kind).add(amount);
    player.total_bet = player.bets.total();
    player.balance = balance_after;
    player.connection_id = Some(session.connection_id.clone());
    player.is_active = true;
    player
        .actions
        .push(ActionEntry::new(ActionKind::Bet(kind), amount, None, state.clock.now()));
    Ok(state.players.update_if_version(&player).await?)
}

/// On the round's first bet, set the betting deadline and schedule what
/// happens when it passes. Later bets leave the deadline alone.
pub async fn start_betting_timer(state: &AppState, round_id: i64) -> Result<(), AppError> {
    let window = state.config.betting_window;
    let started = retry_on_conflict(state.config.version_retries, "betting_deadline", || async {
        let mut round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.betting_deadline.is_some() || round.finished {
            return Ok(None);
        }
        let now: OffsetDateTime = state.clock.now();
        round.betting_deadline = Some(now + window);
        Ok(Some(state.rounds.update_if_version(&round).await?))
    })
    .await?;

    let Some(round) = started else {
        return Ok(());
    };
    info!(round_id, table_id = %round.table_id, "betting timer started");

    state
        .scheduler
        .schedule(
            DeferredTask::PushBets {
                table_id: round.table_id.clone(),
                round_id,
            },
            window + state.config.push_bets_delay,
            state.config.task_retries,
        )
        .await?;
    state
        .scheduler
        .schedule(
            DeferredTask::CleanSeats {
                table_id: round.table_id.clone(),
                round_id,
            },
            window + state.config.clean_seats_delay,
            state.config.task_retries,
        )
        .await?;
    emit(
        state.publisher(),
        Audience::table(&round.table_id),
        ServerEvent::StartTimer {
            seconds: window.as_secs() as i64,
        },
    )
    .await;
    Ok(())
}
