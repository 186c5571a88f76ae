use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use super::{invalid, GameFlowService};
use crate::cache::{keys, set_json};
use crate::domain::bets::cancel_amount;
use crate::domain::seats::{is_split_seat, BETTING_SEATS};
use crate::domain::ExternalKey;
use crate::error::AppError;
use crate::errors::domain::ValidationKind;
use crate::protocol::{Audience, ServerEvent, SessionContext, TakenSeats};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::rounds::require_round;
use crate::repos::{Round, RoundCreate};
use crate::services::common::{require_open_round, seat_external_id};
use crate::services::settlement::taken_seats;
use crate::services::table_config::table_config;
use crate::services::versioned::retry_on_conflict;
use crate::services::wallet;
use crate::state::AppState;
use crate::tasks::DeferredTask;

pub const ROUND_CODE_LEN: usize = 6;

/// Short public code shown to players for a round.
pub fn generate_round_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ROUND_CODE_LEN)
        .map(char::from)
        .collect()
}

impl GameFlowService {
    /// Open a round for the table unless one is already running.
    pub async fn ensure_open_round(&self, state: &AppState, table_id: &str) -> Result<Round, AppError> {
        table_config(state, table_id).await?;
        if let Some(round) = state.rounds.find_open(table_id).await? {
            return Ok(round);
        }
        let dealer_name = state.cache().get(&keys::dealer_name(table_id)).await?;
        let round = state
            .rounds
            .create(RoundCreate {
                table_id: table_id.to_string(),
                round_code: generate_round_code(),
                prev_round_id: None,
                dealer_name,
            })
            .await?;
        info!(table_id, round_id = round.id, "first round opened");
        Ok(round)
    }

    /// Close `prev_round_id` for good and open its successor. Running twice
    /// for the same previous round returns the successor already created.
    pub async fn start_new_round(
        &self,
        state: &AppState,
        table_id: &str,
        prev_round_id: i64,
        seats: TakenSeats,
    ) -> Result<Round, AppError> {
        if let Some(next) = state.rounds.find_successor(prev_round_id).await? {
            debug!(table_id, prev_round_id, "successor already open");
            return Ok(next);
        }
        let stale = state.rounds.finish_open(table_id).await?;
        if stale > 0 {
            debug!(table_id, stale, "finished stale open rounds");
        }
        let dealer_name = state.cache().get(&keys::dealer_name(table_id)).await?;
        let round = state
            .rounds
            .create(RoundCreate {
                table_id: table_id.to_string(),
                round_code: generate_round_code(),
                prev_round_id: Some(prev_round_id),
                dealer_name,
            })
            .await?;
        info!(table_id, round_id = round.id, prev_round_id, "new round");

        emit(
            state.publisher(),
            Audience::table(table_id),
            ServerEvent::StartNewRound {
                next_round_real_id: round.id,
                next_round_id: round.round_code.clone(),
                seats,
            },
        )
        .await;
        Ok(round)
    }

    /// Operator reset: void the round, refund every committed debit and roll
    /// over at once.
    pub async fn reset_round(&self, state: &AppState, session: &SessionContext) -> Result<Round, AppError> {
        let round = require_open_round(state, &session.table_id).await?;
        let Some(deadline) = round.betting_deadline else {
            return Err(invalid(ValidationKind::PhaseMismatch, "Game is reset already"));
        };
        if state.clock.now() <= deadline {
            return Err(invalid(
                ValidationKind::BettingOpen,
                "Can not reset the game before betting time is over",
            ));
        }

        let round_id = round.id;
        let round = retry_on_conflict(state.config.version_retries, "reset_round", || async {
            let mut round = require_round(state.rounds.as_ref(), round_id).await?;
            if round.finished {
                return Err(invalid(ValidationKind::PhaseMismatch, "Game is reset already"));
            }
            round.finished = true;
            round.was_reset = true;
            Ok(state.rounds.update_if_version(&round).await?)
        })
        .await?;
        info!(round_id, table_id = %round.table_id, "round reset");

        let players = state.players.list_by_round(round_id).await?;
        for player in &players {
            for key in ExternalKey::DEBITS {
                if !player.external_ids.contains_key(&key) {
                    continue;
                }
                let Some(cancel_key) = key.cancel_key() else {
                    continue;
                };
                let amount = cancel_amount(&player.actions, key);
                if amount <= 0.0 {
                    continue;
                }
                state
                    .scheduler
                    .schedule(
                        DeferredTask::CancelBet {
                            round_id,
                            seat_number: player.seat_number,
                            key,
                            amount,
                            external_id: seat_external_id(&round, player.seat_number, cancel_key),
                        },
                        std::time::Duration::ZERO,
                        state.config.task_retries,
                    )
                    .await?;
            }

            // Stakes the merchant never saw go straight back to the cached balance.
            // A split hand's stake went out with the owner seat's split debit.
            if !player.rejected
                && !is_split_seat(player.seat_number)
                && player.total_bet > 0.0
                && !player.external_ids.contains_key(&ExternalKey::Bet)
            {
                wallet::credit(state, &player.identity.key(), player.total_bet).await?;
            }

            let seat = player.seat_number;
            retry_on_conflict(state.config.version_retries, "archive_reset", || async {
                let mut player = require_player_round(state.players.as_ref(), round_id, seat).await?;
                player.archived = true;
                player.is_reset = true;
                player.finish_turn();
                player.decision_deadline = None;
                Ok(state.players.update_if_version(&player).await?)
            })
            .await?;
        }

        let seats = taken_seats(&players);
        set_json(state.cache(), &keys::taken_seats(&round.table_id), &seats, None).await?;
        self.start_new_round(state, &round.table_id, round_id, seats)
            .await
    }

    /// Nobody bet before the deadline: free the seats held over from the
    /// previous round.
    pub async fn clean_seats(&self, state: &AppState, table_id: &str, round_id: i64) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.finished {
            return Ok(());
        }
        let players = state.players.list_by_round(round_id).await?;
        if players.iter().any(|p| p.total_bet > 0.0 && !p.rejected) {
            return Ok(());
        }
        if let Some(prev_round_id) = round.prev_round_id {
            for seat in BETTING_SEATS {
                state.cache().delete(&keys::seat_claim(prev_round_id, seat)).await?;
            }
        }
        state.cache().delete(&keys::taken_seats(table_id)).await?;
        info!(table_id, round_id, "seats cleaned");
        emit(
            state.publisher(),
            Audience::table(table_id),
            ServerEvent::CleanSeats {},
        )
        .await;
        Ok(())
    }

    pub async fn change_dealer(
        &self,
        state: &AppState,
        session: &SessionContext,
        dealer_name: &str,
    ) -> Result<(), AppError> {
        let dealer_name = dealer_name.trim();
        if dealer_name.is_empty() {
            return Err(invalid(ValidationKind::Other, "Dealer name is required"));
        }
        state
            .cache()
            .set(&keys::dealer_name(&session.table_id), dealer_name)
            .await?;
        if let Some(open) = state.rounds.find_open(&session.table_id).await? {
            let round_id = open.id;
            retry_on_conflict(state.config.version_retries, "change_dealer", || async {
                let mut round = require_round(state.rounds.as_ref(), round_id).await?;
                round.dealer_name = Some(dealer_name.to_string());
                Ok(state.rounds.update_if_version(&round).await?)
            })
            .await?;
        }
        info!(table_id = %session.table_id, dealer_name, "dealer changed");
        emit(
            state.publisher(),
            Audience::table(&session.table_id),
            ServerEvent::DealerChanged {
                dealer_name: dealer_name.to_string(),
            },
        )
        .await;
        Ok(())
    }
}
