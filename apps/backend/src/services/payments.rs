//! Merchant wallet calls for bets, wins and cancellations.
//!
//! Every call carries an external id chosen before the call and recorded on
//! the seat only once the merchant accepts it. A recorded id means the
//! transaction is done; retries of the same deferred item reuse the id.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use super::common::{new_external_id, seat_external_id};
use super::ledger::RepeatSeat;
use super::table_config::merchant_config;
use super::versioned::retry_on_conflict;
use super::wallet;
use crate::cache::{keys, set_json};
use crate::domain::seats::{is_split_seat, owner_seat, BETTING_SEATS};
use crate::domain::{BetKind, ExternalKey, Outcome};
use crate::error::AppError;
use crate::errors::domain::{DomainError, MerchantErrorKind};
use crate::merchant::{MerchantReply, TransactionRequest, TransactionType};
use crate::protocol::{Audience, ServerEvent};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::rounds::require_round;
use crate::repos::{MerchantConfig, PlayerRound};
use crate::state::AppState;
use crate::tasks::DeferredTask;

pub const INSUFFICIENT_BALANCE_DETAIL: &str = "insufficient_balance";
const INSUFFICIENT_BALANCE_MESSAGE: &str = "Not enough funds to place bet";

/// Which configured endpoint a transaction goes to.
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Bet,
    Win,
    Rollback,
}

impl Endpoint {
    fn url(self, merchant: &MerchantConfig) -> &str {
        match self {
            Endpoint::Bet => &merchant.bet_url,
            Endpoint::Win => &merchant.win_url,
            Endpoint::Rollback => &merchant.rollback_url,
        }
    }
}

#[derive(Debug, Default)]
pub struct PaymentService;

impl PaymentService {
    pub fn new() -> Self {
        Self
    }

    async fn send(
        &self,
        state: &AppState,
        player: &PlayerRound,
        endpoint: Endpoint,
        request: &TransactionRequest,
    ) -> Result<MerchantReply, AppError> {
        let merchant =
            merchant_config(state, &player.identity.merchant_id, &player.table_id).await?;
        debug!(
            round_id = player.round_id,
            seat = player.seat_number,
            transaction = ?request.transaction_type,
            external_id = %request.external_id,
            "calling merchant"
        );
        state
            .merchant
            .transact(endpoint.url(&merchant), merchant.schema_type, request)
            .await
    }

    /// Record an accepted transaction on the seat.
    async fn record(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
        key: ExternalKey,
        external_id: &str,
        balance: f64,
    ) -> Result<PlayerRound, AppError> {
        retry_on_conflict(state.config.version_retries, "record_transaction", || async {
            let mut player =
                require_player_round(state.players.as_ref(), round_id, seat_number).await?;
            player.external_ids.insert(key, external_id.to_string());
            player.balance = balance;
            Ok(state.players.update_if_version(&player).await?)
        })
        .await
    }

    /// Betting closed: fan out one bet transaction per seat, or reopen
    /// betting when nobody has a stake left.
    pub async fn push_bets(
        &self,
        state: &AppState,
        table_id: &str,
        round_id: i64,
    ) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.finished || round.betting_deadline.is_none() {
            debug!(round_id, "push_bets: round no longer taking bets");
            return Ok(());
        }

        let players = state.players.list_by_round(round_id).await?;
        let live: Vec<&PlayerRound> = players
            .iter()
            .filter(|p| p.total_bet > 0.0 && !p.archived)
            .collect();

        if live.is_empty() {
            retry_on_conflict(state.config.version_retries, "reopen_betting", || async {
                let mut round = require_round(state.rounds.as_ref(), round_id).await?;
                if round.finished {
                    return Ok(());
                }
                round.betting_deadline = None;
                state.rounds.update_if_version(&round).await?;
                Ok(())
            })
            .await?;
            for seat in BETTING_SEATS {
                state.cache().delete(&keys::seat_claim(round_id, seat)).await?;
            }
            info!(round_id, table_id, "no bets at deadline, betting reopened");
            emit(
                state.publisher(),
                Audience::table(table_id),
                ServerEvent::RepeatBetting {},
            )
            .await;
            return Ok(());
        }

        let mut repeat: BTreeMap<String, Vec<RepeatSeat>> = BTreeMap::new();
        for player in &live {
            state
                .scheduler
                .schedule(
                    DeferredTask::PushSeatBet {
                        round_id,
                        seat_number: player.seat_number,
                        external_id: seat_external_id(&round, player.seat_number, ExternalKey::Bet),
                    },
                    std::time::Duration::ZERO,
                    state.config.task_retries,
                )
                .await?;

            let mut bets = player.bets.clone();
            for kind in BetKind::ALL {
                let line = bets.line_mut(kind);
                line.winning = 0.0;
                line.combination = None;
            }
            repeat
                .entry(player.identity.key())
                .or_default()
                .push(RepeatSeat {
                    seat_number: player.seat_number,
                    bets,
                });
        }
        for (identity_key, seats) in &repeat {
            set_json(
                state.cache(),
                &keys::repeat_data(identity_key, round_id),
                seats,
                Some(state.config.repeat_ttl),
            )
            .await?;
        }
        info!(round_id, seats = live.len(), "bets pushed to merchants");
        Ok(())
    }

    /// Debit one seat's whole pre-deal stake.
    pub async fn push_seat_bet(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
        external_id: &str,
    ) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.finished {
            debug!(round_id, seat = seat_number, "push_seat_bet: round finished");
            return Ok(());
        }
        let player = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
        if player.external_ids.contains_key(&ExternalKey::Bet)
            || player.rejected
            || player.total_bet <= 0.0
        {
            return Ok(());
        }

        let request = TransactionRequest::new(
            TransactionType::Bet,
            &player.identity.user_token,
            player.total_bet,
            &player.table_id,
            round_id,
            external_id,
        );
        let reply = self.send(state, &player, Endpoint::Bet, &request).await?;
        let identity_key = player.identity.key();

        match reply.accepted_balance() {
            Ok(balance) => {
                self.record(
                    state,
                    round_id,
                    seat_number,
                    ExternalKey::Bet,
                    external_id,
                    balance,
                )
                .await?;
                wallet::resync(state, &identity_key, balance).await?;
                Ok(())
            }
            Err(DomainError::Merchant(MerchantErrorKind::Rejected, detail)) => {
                warn!(round_id, seat = seat_number, %detail, "merchant rejected bet");
                let rejected = retry_on_conflict(
                    state.config.version_retries,
                    "reject_seat",
                    || async {
                        let mut player =
                            require_player_round(state.players.as_ref(), round_id, seat_number)
                                .await?;
                        player.archived = true;
                        player.rejected = true;
                        player.detail = Some(INSUFFICIENT_BALANCE_DETAIL.to_string());
                        Ok(state.players.update_if_version(&player).await?)
                    },
                )
                .await?;
                state
                    .cache()
                    .delete(&keys::seat_claim(round_id, seat_number))
                    .await?;

                let balance = match reply.total_balance() {
                    Some(balance) => {
                        wallet::resync(state, &identity_key, balance).await?;
                        balance
                    }
                    None => wallet::credit(state, &identity_key, rejected.total_bet).await?,
                };
                emit(
                    state.publisher(),
                    Audience::identity(&identity_key),
                    ServerEvent::InsufficientBalance {
                        message: INSUFFICIENT_BALANCE_MESSAGE.to_string(),
                        balance,
                    },
                )
                .await;
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Commit a mid-round debit (double, split or insurance) right away.
    /// A refusal is logged and the balance resynced; the round carries on.
    pub async fn commit_debit(
        &self,
        state: &AppState,
        player: &PlayerRound,
        key: ExternalKey,
        amount: f64,
    ) -> Result<(), AppError> {
        let external_id = new_external_id();
        let request = TransactionRequest::new(
            TransactionType::Bet,
            &player.identity.user_token,
            amount,
            &player.table_id,
            player.round_id,
            &external_id,
        )
        .with_bet_external_id(player.external_ids.get(&ExternalKey::Bet).cloned());
        let identity_key = player.identity.key();

        let reply = match self.send(state, player, Endpoint::Bet, &request).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(
                    round_id = player.round_id,
                    seat = player.seat_number,
                    key = ?key,
                    error = %err,
                    "merchant debit failed"
                );
                return Ok(());
            }
        };

        match reply.accepted_balance() {
            Ok(balance) => {
                self.record(
                    state,
                    player.round_id,
                    player.seat_number,
                    key,
                    &external_id,
                    balance,
                )
                .await?;
                wallet::resync(state, &identity_key, balance).await
            }
            Err(err) => {
                error!(
                    round_id = player.round_id,
                    seat = player.seat_number,
                    key = ?key,
                    error = %err,
                    "merchant refused debit"
                );
                if let Some(balance) = reply.total_balance() {
                    wallet::resync(state, &identity_key, balance).await?;
                }
                Ok(())
            }
        }
    }

    /// Credit one settled seat. An already-recorded win suppresses the call.
    pub async fn payout(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
        external_id: &str,
    ) -> Result<(), AppError> {
        let player = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
        if player.external_ids.contains_key(&ExternalKey::Win) {
            debug!(round_id, seat = seat_number, "payout already recorded");
            return Ok(());
        }
        if player.rejected || player.is_reset {
            return Ok(());
        }

        let outcome = Outcome::classify(player.winning_amount, player.primary_bet());
        // A lost hand still collects its side-bet winnings.
        let amount = player.winning_amount.max(0.0);
        let bet_external_id = match player.external_ids.get(&ExternalKey::Bet) {
            Some(id) => Some(id.clone()),
            None if is_split_seat(seat_number) => state
                .players
                .find_by_seat(round_id, owner_seat(seat_number))
                .await?
                .and_then(|owner| owner.external_ids.get(&ExternalKey::Bet).cloned()),
            None => None,
        };

        let request = TransactionRequest::new(
            TransactionType::Win,
            &player.identity.user_token,
            amount,
            &player.table_id,
            round_id,
            external_id,
        )
        .with_bet_external_id(bet_external_id);
        let reply = self.send(state, &player, Endpoint::Win, &request).await?;
        let identity_key = player.identity.key();

        match reply.accepted_balance() {
            Ok(balance) => {
                self.record(
                    state,
                    round_id,
                    seat_number,
                    ExternalKey::Win,
                    external_id,
                    balance,
                )
                .await?;
                wallet::resync(state, &identity_key, balance).await?;
                info!(round_id, seat = seat_number, amount, outcome = outcome.as_str(), "payout sent");
                emit(
                    state.publisher(),
                    Audience::identity(&identity_key),
                    ServerEvent::UpdateBalance { balance },
                )
                .await;
                Ok(())
            }
            Err(err) => {
                error!(round_id, seat = seat_number, error = %err, "merchant refused payout");
                if let Some(balance) = reply.total_balance() {
                    wallet::resync(state, &identity_key, balance).await?;
                }
                Ok(())
            }
        }
    }

    /// Refund one committed debit of a reset round.
    pub async fn cancel_bet(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
        key: ExternalKey,
        amount: f64,
        external_id: &str,
    ) -> Result<(), AppError> {
        let Some(cancel_key) = key.cancel_key() else {
            return Err(DomainError::invalid(format!("{key:?} can not be cancelled")).into());
        };
        let player = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
        if player.external_ids.contains_key(&cancel_key) {
            return Ok(());
        }
        let Some(cancelled) = player.external_ids.get(&key).cloned() else {
            return Ok(());
        };

        let request = TransactionRequest::new(
            TransactionType::Rollback,
            &player.identity.user_token,
            amount,
            &player.table_id,
            round_id,
            external_id,
        )
        .with_canceled_external_id(cancelled);
        let reply = self.send(state, &player, Endpoint::Rollback, &request).await?;
        let identity_key = player.identity.key();

        match reply.accepted_balance() {
            Ok(balance) => {
                self.record(state, round_id, seat_number, cancel_key, external_id, balance)
                    .await?;
                wallet::resync(state, &identity_key, balance).await?;
                info!(round_id, seat = seat_number, key = ?key, amount, "debit cancelled");
                let audience = match &player.connection_id {
                    Some(connection_id) => Audience::connection(connection_id),
                    None => Audience::identity(&identity_key),
                };
                emit(
                    state.publisher(),
                    audience,
                    ServerEvent::ResetStatus { balance },
                )
                .await;
                Ok(())
            }
            Err(err) => {
                error!(round_id, seat = seat_number, key = ?key, error = %err, "merchant refused rollback");
                if let Some(balance) = reply.total_balance() {
                    wallet::resync(state, &identity_key, balance).await?;
                }
                Ok(())
            }
        }
    }
}
