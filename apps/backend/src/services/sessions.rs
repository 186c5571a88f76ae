//! Joining and leaving a table: token validation, reconnect and the
//! disconnect path of the turn sequencer.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::common::{require_player, seconds_left};
use super::snapshot::table_snapshot;
use super::table_config::merchant_config;
use super::versioned::retry_on_conflict;
use super::wallet;
use crate::domain::turns::needs_inactivity_check;
use crate::error::AppError;
use crate::errors::domain::{DomainError, MerchantErrorKind, ValidationKind};
use crate::merchant::{TokenValidationRequest, ValidatedPlayer};
use crate::protocol::{Audience, ServerEvent, SessionContext};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::{PlayerIdentity, PlayerRound};
use crate::state::AppState;
use crate::tasks::DeferredTask;

/// The identity's seats in the table's open round.
async fn seats_in_open_round(
    state: &AppState,
    table_id: &str,
    identity: &PlayerIdentity,
) -> Result<Vec<PlayerRound>, AppError> {
    let Some(round) = state.rounds.find_open(table_id).await? else {
        return Ok(Vec::new());
    };
    let seats = state
        .players
        .list_open_by_identity(table_id, &identity.user_id, &identity.merchant_id)
        .await?;
    Ok(seats.into_iter().filter(|p| p.round_id == round.id).collect())
}

#[derive(Debug, Default)]
pub struct SessionService;

impl SessionService {
    pub fn new() -> Self {
        Self
    }

    /// Validate the launch token with the merchant and attach the player to
    /// the connection. Seats the player already holds become active again.
    pub async fn join_table(
        &self,
        state: &AppState,
        session: &SessionContext,
        token: &str,
        merchant_id: &str,
    ) -> Result<PlayerIdentity, AppError> {
        let merchant = merchant_config(state, merchant_id, &session.table_id).await?;
        let reply = state
            .merchant
            .validate_token(
                &merchant.validate_token_url,
                merchant.schema_type,
                &TokenValidationRequest::new(token),
            )
            .await?;
        let validated = ValidatedPlayer::try_from(&reply).map_err(|err| match err {
            DomainError::Merchant(MerchantErrorKind::Rejected, detail) => {
                warn!(merchant_id, %detail, "launch token refused");
                AppError::from(DomainError::validation(ValidationKind::Other, "Token is invalid"))
            }
            other => AppError::from(other),
        })?;

        let identity = PlayerIdentity {
            player_id: format!("{}{}", validated.user_id, merchant_id),
            user_id: validated.user_id,
            merchant_id: merchant_id.to_string(),
            user_name: validated.user_name,
            user_token: token.to_string(),
        };
        let key = identity.key();
        wallet::resync(state, &key, validated.total_balance).await?;

        for seat in seats_in_open_round(state, &session.table_id, &identity).await? {
            let (round_id, seat_number) = (seat.round_id, seat.seat_number);
            retry_on_conflict(state.config.version_retries, "reactivate_seat", || async {
                let mut player =
                    require_player_round(state.players.as_ref(), round_id, seat_number).await?;
                player.is_active = true;
                player.connection_id = Some(session.connection_id.clone());
                player.identity.user_token = token.to_string();
                Ok(state.players.update_if_version(&player).await?)
            })
            .await?;
            debug!(round_id, seat = seat_number, "seat reactivated");
        }
        info!(table_id = %session.table_id, player = %key, "player joined");

        emit(
            state.publisher(),
            Audience::connection(&session.connection_id),
            ServerEvent::UpdateBalance {
                balance: validated.total_balance,
            },
        )
        .await;
        let joined = SessionContext::player(
            session.connection_id.clone(),
            session.table_id.clone(),
            identity.clone(),
        );
        match table_snapshot(state, &joined).await {
            Ok(snapshot) => {
                emit(
                    state.publisher(),
                    Audience::connection(&session.connection_id),
                    ServerEvent::TableState(snapshot),
                )
                .await
            }
            Err(err) => warn!(table_id = %session.table_id, error = %err, "no table snapshot"),
        }
        Ok(identity)
    }

    /// Disconnect: the player's seats go inactive. A seat mid-decision gets
    /// one nudge per decision window.
    pub async fn leave_table(&self, state: &AppState, session: &SessionContext) -> Result<(), AppError> {
        let identity = require_player(session)?;
        for seat in seats_in_open_round(state, &session.table_id, identity).await? {
            let (round_id, seat_number) = (seat.round_id, seat.seat_number);
            let (player, nudge) =
                retry_on_conflict(state.config.version_retries, "deactivate_seat", || async {
                    let mut player =
                        require_player_round(state.players.as_ref(), round_id, seat_number)
                            .await?;
                    player.is_active = false;
                    let nudge = player.is_making_decision
                        && needs_inactivity_check(
                            player.decision_deadline,
                            player.inactivity_check_at,
                        );
                    if nudge {
                        player.inactivity_check_at = player.decision_deadline;
                    }
                    Ok((state.players.update_if_version(&player).await?, nudge))
                })
                .await?;

            if nudge {
                let left = seconds_left(player.decision_deadline, state.clock.now());
                state
                    .scheduler
                    .schedule(
                        DeferredTask::Nudge {
                            round_id,
                            seat_number,
                            action_count: player.actions.len(),
                        },
                        Duration::from_secs(left.unsigned_abs() + 1),
                        state.config.task_retries,
                    )
                    .await?;
            }
            debug!(round_id, seat = seat_number, nudge, "seat inactive");
        }
        info!(table_id = %session.table_id, player = %identity.key(), "player left");
        Ok(())
    }
}
