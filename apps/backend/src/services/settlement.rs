//! Round settlement: score every seat against the dealer, archive it and
//! queue its payout, then queue the rollover. Seats settle independently.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::common::seat_external_id;
use super::versioned::retry_on_conflict;
use crate::cache::{keys, set_json};
use crate::domain::seats::is_split_seat;
use crate::domain::{
    compute_winnings, Card, ExternalKey, InsuranceDecision, Outcome, SeatSettlement,
};
use crate::error::AppError;
use crate::protocol::{Audience, SeatResult, ServerEvent, TakenSeat, TakenSeats};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::rounds::require_round;
use crate::repos::{PlayerRound, Round};
use crate::state::AppState;
use crate::tasks::DeferredTask;

/// Seats the next round keeps reserved for their current holders.
pub fn taken_seats(players: &[PlayerRound]) -> TakenSeats {
    players
        .iter()
        .filter(|p| !is_split_seat(p.seat_number) && !p.rejected && p.total_bet > 0.0)
        .map(|p| TakenSeat {
            seat_number: p.seat_number,
            user_id: p.identity.user_id.clone(),
            merchant_id: p.identity.merchant_id.clone(),
            user_name: p.identity.user_name.clone(),
            player_id: p.identity.player_id.clone(),
        })
        .collect()
}

pub fn seat_winnings(player: &PlayerRound, dealer_cards: &[Card]) -> f64 {
    let seat = SeatSettlement {
        cards: &player.cards,
        last_action: player.last_action,
        primary_bet: player.primary_bet(),
        insured: player.insurance == InsuranceDecision::Taken,
        side_winnings: player.bets.side_winnings(),
    };
    compute_winnings(&seat, dealer_cards)
}

fn is_scored(player: &PlayerRound) -> bool {
    !player.rejected && player.primary_bet() > 0.0
}

#[derive(Debug, Default)]
pub struct SettlementService;

impl SettlementService {
    pub fn new() -> Self {
        Self
    }

    /// Settle the round once. A second call finds it finished and returns.
    ///
    /// A seat that cannot be settled is logged and left to a deferred
    /// `settle` item; the other seats and the rollover go ahead regardless.
    pub async fn settle(&self, state: &AppState, round_id: i64) -> Result<(), AppError> {
        let outcome = match self.finish_round(state, round_id).await {
            Ok((_, false)) => return Ok(()),
            Ok((round, true)) => self.settle_seats(state, &round, false).await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            warn!(round_id, error = %err, "settlement incomplete, deferring the rest");
            state
                .scheduler
                .schedule(
                    DeferredTask::Settle { round_id },
                    Duration::ZERO,
                    state.config.task_retries,
                )
                .await?;
        }
        Ok(())
    }

    /// Finish what an interrupted settlement left: seats not archived yet and
    /// payouts that may never have been queued. Safe to run any number of
    /// times; payout ids are derived per seat, so a duplicate pays once.
    pub async fn resume(&self, state: &AppState, round_id: i64) -> Result<(), AppError> {
        let (round, _) = self.finish_round(state, round_id).await?;
        if round.was_reset {
            debug!(round_id, "reset round needs no settlement");
            return Ok(());
        }
        self.settle_seats(state, &round, true).await
    }

    /// Mark the round finished. `true` when this call did it.
    async fn finish_round(&self, state: &AppState, round_id: i64) -> Result<(Round, bool), AppError> {
        retry_on_conflict(state.config.version_retries, "settle", || async {
            let mut round = require_round(state.rounds.as_ref(), round_id).await?;
            if round.finished {
                return Ok((round, false));
            }
            round.finished = true;
            round.show_dealer_cards = true;
            Ok((state.rounds.update_if_version(&round).await?, true))
        })
        .await
    }

    /// Score, archive and queue payouts seat by seat, then the rollover.
    /// Returns the first seat failure after every other seat had its turn.
    async fn settle_seats(&self, state: &AppState, round: &Round, resuming: bool) -> Result<(), AppError> {
        let round_id = round.id;
        let players = state.players.list_by_round(round_id).await?;
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut first_failure: Option<AppError> = None;

        for player in &players {
            let seat = player.seat_number;
            let settled = if resuming && player.archived {
                if !is_scored(player) || player.external_ids.contains_key(&ExternalKey::Win) {
                    continue;
                }
                self.queue_payout(state, round, seat).await.map(|()| None)
            } else {
                self.settle_seat(state, round, player).await
            };
            match settled {
                Ok(Some(winning)) => {
                    *totals.entry(player.identity.key()).or_default() += winning;
                }
                Ok(None) => {}
                Err(err) => {
                    error!(round_id, seat, error = %err, "seat settlement failed");
                    first_failure.get_or_insert(err);
                }
            }
        }

        for (identity_key, amount) in totals {
            emit(
                state.publisher(),
                Audience::identity(&identity_key),
                ServerEvent::TotalWinning { amount },
            )
            .await;
        }

        let seats = taken_seats(&players);
        if let Err(err) =
            set_json(state.cache(), &keys::taken_seats(&round.table_id), &seats, None).await
        {
            warn!(round_id, error = %err, "taken seats not cached");
        }
        state
            .scheduler
            .schedule(
                DeferredTask::StartNewRound {
                    table_id: round.table_id.clone(),
                    prev_round_id: round_id,
                    taken_seats: seats,
                },
                state.config.rollover_delay,
                state.config.task_retries,
            )
            .await?;
        info!(round_id, table_id = %round.table_id, seats = players.len(), resuming, "round settled");

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Archive one seat with its winnings and queue its payout. `Some` with
    /// the winnings for a scored seat.
    async fn settle_seat(
        &self,
        state: &AppState,
        round: &Round,
        player: &PlayerRound,
    ) -> Result<Option<f64>, AppError> {
        let round_id = round.id;
        let seat = player.seat_number;
        let scored = is_scored(player);
        let winning = if scored {
            seat_winnings(player, &round.dealer_cards)
        } else {
            0.0
        };

        retry_on_conflict(state.config.version_retries, "archive_seat", || async {
            let mut player = require_player_round(state.players.as_ref(), round_id, seat).await?;
            if scored {
                player.winning_amount = winning;
            }
            player.archived = true;
            player.finish_turn();
            player.decision_deadline = None;
            Ok(state.players.update_if_version(&player).await?)
        })
        .await?;
        if !scored {
            return Ok(None);
        }

        emit(
            state.publisher(),
            Audience::table(&round.table_id),
            ServerEvent::Result(SeatResult {
                outcome: Outcome::classify(winning, player.primary_bet()),
                seat_number: seat,
                winning_amount: winning,
            }),
        )
        .await;
        self.queue_payout(state, round, seat).await?;
        Ok(Some(winning))
    }

    async fn queue_payout(&self, state: &AppState, round: &Round, seat_number: i16) -> Result<(), AppError> {
        state
            .scheduler
            .schedule(
                DeferredTask::Payout {
                    round_id: round.id,
                    seat_number,
                    external_id: seat_external_id(round, seat_number, ExternalKey::Win),
                },
                Duration::ZERO,
                state.config.task_retries,
            )
            .await
    }
}
