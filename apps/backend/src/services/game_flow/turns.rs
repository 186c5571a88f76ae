//! Turn sequencer over the cached seat order.

use std::time::Duration;

use tracing::{debug, info};

use super::GameFlowService;
use crate::domain::turns::{nudge_is_due, seats_after, TurnCheck};
use crate::domain::{gate_actions_by_balance, PlayerAction};
use crate::error::AppError;
use crate::protocol::{Audience, DecisionPrompt, ServerEvent, TurnCommand};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::rounds::require_round;
use crate::services::seat_order;
use crate::services::table_config::merchant_config;
use crate::services::versioned::retry_on_conflict;
use crate::services::wallet;
use crate::state::AppState;
use crate::tasks::DeferredTask;

impl GameFlowService {
    /// Hand the turn to the next seat after `current` that can still play.
    /// Seats that cannot continue are finished in passing, without a card.
    pub(crate) async fn advance(
        &self,
        state: &AppState,
        round_id: i64,
        current: Option<i16>,
    ) -> Result<(), AppError> {
        let order = seat_order::load(state, round_id).await?;
        for seat in seats_after(&order, current) {
            let Some(player) = state.players.find_by_seat(round_id, seat).await? else {
                continue;
            };
            if player.rejected || player.archived {
                continue;
            }
            if !player.hand().can_continue() {
                debug!(round_id, seat, score = player.hand().score(), "seat skipped");
                self.finish_turn(state, round_id, seat).await?;
                continue;
            }
            return self.start_turn(state, round_id, seat).await;
        }
        info!(round_id, "all players resolved");
        self.players_resolved(state, round_id).await
    }

    pub(super) async fn finish_turn(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
    ) -> Result<(), AppError> {
        retry_on_conflict(state.config.version_retries, "finish_turn", || async {
            let mut player = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
            player.finish_turn();
            player.decision_deadline = None;
            Ok(state.players.update_if_version(&player).await?)
        })
        .await?;
        Ok(())
    }

    pub(super) async fn finish_and_advance(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
    ) -> Result<(), AppError> {
        self.finish_turn(state, round_id, seat_number).await?;
        self.advance(state, round_id, Some(seat_number)).await
    }

    /// Open a decision window on `seat_number`, prompt its owner and tell
    /// the table who is deciding.
    pub(super) async fn start_turn(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
    ) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        let seated = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
        let merchant =
            merchant_config(state, &seated.identity.merchant_id, &round.table_id).await?;
        let decision_secs = merchant.decision_time_secs.max(1);
        let decision_time = Duration::from_secs(decision_secs.unsigned_abs());

        let player = retry_on_conflict(state.config.version_retries, "start_turn", || async {
            let mut player = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
            let now = state.clock.now();
            player.is_player_turn = true;
            player.is_making_decision = true;
            player.finished_turn = false;
            player.decision_deadline = Some(now + decision_time);
            if !player.is_active {
                player.inactivity_check_at = player.decision_deadline;
            }
            Ok(state.players.update_if_version(&player).await?)
        })
        .await?;

        let balance = wallet::balance(state, &player.identity.key()).await?;
        let actions: Vec<PlayerAction> = gate_actions_by_balance(
            player.hand().legal_actions(&[]),
            balance,
            player.primary_bet(),
        );
        debug!(round_id, seat = seat_number, ?actions, "turn started");

        emit(
            state.publisher(),
            Audience::identity(&player.identity.key()),
            ServerEvent::MakeDecision(DecisionPrompt {
                seat_number,
                cards: player.cards.clone(),
                score: player.hand().label(),
                actions,
                decision_time: decision_secs,
            }),
        )
        .await;
        emit(
            state.publisher(),
            Audience::table(&round.table_id),
            ServerEvent::DecisionMaker {
                seat_number,
                decision_timer: decision_secs,
            },
        )
        .await;

        if !player.is_active {
            state
                .scheduler
                .schedule(
                    DeferredTask::Nudge {
                        round_id,
                        seat_number,
                        action_count: player.actions.len(),
                    },
                    decision_time + Duration::from_secs(1),
                    state.config.task_retries,
                )
                .await?;
        }
        Ok(())
    }

    /// Force a stand on a seat that let its decision time run out, provided
    /// nothing happened on it since the nudge was scheduled.
    pub async fn nudge(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
        action_count: usize,
    ) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.finished {
            return Ok(());
        }
        let Some(player) = state.players.find_by_seat(round_id, seat_number).await? else {
            return Ok(());
        };
        let check = TurnCheck {
            action_count: player.actions.len(),
            is_making_decision: player.is_making_decision,
            decision_deadline: player.decision_deadline,
        };
        if !nudge_is_due(action_count, check, state.clock.now()) {
            debug!(round_id, seat = seat_number, "nudge not due");
            return Ok(());
        }
        info!(round_id, seat = seat_number, "decision time over, standing");
        self.apply_action(state, &round, seat_number, None, TurnCommand::AutoStand)
            .await
    }
}
