use tracing::{debug, info};

use super::{emit_hand_value, invalid, GameFlowService};
use crate::domain::seats::{insert_split_seat, split_seat};
use crate::domain::{
    ActionEntry, ActionKind, BetKind, BetLedger, Card, ExternalIds, ExternalKey,
    InsuranceDecision, LastAction, PlayerAction,
};
use crate::error::AppError;
use crate::errors::domain::ValidationKind;
use crate::protocol::{Audience, PlayerActionNotice, ServerEvent, SessionContext, TurnCommand};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::{NewPlayerRound, PlayerIdentity, PlayerRound, Round};
use crate::services::common::{require_open_round, require_player};
use crate::services::payments::PaymentService;
use crate::services::seat_order;
use crate::services::versioned::retry_on_conflict;
use crate::services::wallet;
use crate::state::AppState;

const NOT_ENOUGH_FUNDS: &str = "Not enough funds";

fn not_your_turn() -> AppError {
    invalid(ValidationKind::OutOfTurn, "It is not your turn")
}

fn cannot_act() -> AppError {
    invalid(ValidationKind::ActionNotAllowed, "Can not make action")
}

fn not_decided() -> AppError {
    invalid(
        ValidationKind::PhaseMismatch,
        "Player has not made a decision yet",
    )
}

/// Re-read the seat and check it is still waiting on this decision.
fn ensure_deciding(player: &PlayerRound) -> Result<(), AppError> {
    if player.is_player_turn && player.is_making_decision {
        Ok(())
    } else {
        Err(not_your_turn())
    }
}

async fn emit_action(state: &AppState, player: &PlayerRound, action: &str) {
    emit(
        state.publisher(),
        Audience::table(&player.table_id),
        ServerEvent::PlayerAction(PlayerActionNotice {
            seat_number: player.seat_number,
            action: action.to_string(),
            cards: player.cards.clone(),
            score: player.hand().label(),
        }),
    )
    .await;
}

impl GameFlowService {
    pub async fn make_action(
        &self,
        state: &AppState,
        session: &SessionContext,
        seat_number: i16,
        command: TurnCommand,
    ) -> Result<(), AppError> {
        let identity = require_player(session)?;
        let round = require_open_round(state, &session.table_id).await?;
        self.apply_action(state, &round, seat_number, Some(identity), command)
            .await
    }

    /// Apply a decision for the seat whose turn it is. `owner` is `None` for
    /// stands forced by the inactivity nudge.
    pub(super) async fn apply_action(
        &self,
        state: &AppState,
        round: &Round,
        seat_number: i16,
        owner: Option<&PlayerIdentity>,
        command: TurnCommand,
    ) -> Result<(), AppError> {
        let player = state
            .players
            .find_by_seat(round.id, seat_number)
            .await?
            .ok_or_else(not_your_turn)?;
        if let Some(identity) = owner {
            if !player.is_owned_by(&identity.user_id, &identity.merchant_id) {
                return Err(not_your_turn());
            }
        }
        ensure_deciding(&player)?;

        let now = state.clock.now();
        if command != TurnCommand::AutoStand && player.decision_deadline.is_some_and(|d| now > d) {
            return Err(invalid(
                ValidationKind::DecisionExpired,
                "Time for making decision is over",
            ));
        }
        let hand = player.hand();
        if !hand.can_continue() {
            return Err(cannot_act());
        }
        let legal = hand.legal_actions(&[]);
        debug!(round_id = round.id, seat = seat_number, command = command.as_str(), "player action");

        match command {
            TurnCommand::Stand | TurnCommand::AutoStand => {
                self.stand(state, round, seat_number, command).await
            }
            TurnCommand::Hit => self.hit(state, round, seat_number).await,
            TurnCommand::Double if legal.contains(&PlayerAction::Double) => {
                self.double(state, round, &player).await
            }
            TurnCommand::Split if legal.contains(&PlayerAction::Split) => {
                self.split(state, round, &player).await
            }
            TurnCommand::Double | TurnCommand::Split => Err(cannot_act()),
        }
    }

    async fn stand(
        &self,
        state: &AppState,
        round: &Round,
        seat_number: i16,
        command: TurnCommand,
    ) -> Result<(), AppError> {
        let player = retry_on_conflict(state.config.version_retries, "stand", || async {
            let mut player = require_player_round(state.players.as_ref(), round.id, seat_number).await?;
            ensure_deciding(&player)?;
            let deadline = player.decision_deadline;
            player.last_action = Some(LastAction::Stand);
            player.finish_turn();
            player.decision_deadline = None;
            player
                .actions
                .push(ActionEntry::new(ActionKind::Stand, 0.0, deadline, state.clock.now()));
            Ok(state.players.update_if_version(&player).await?)
        })
        .await?;
        emit_action(state, &player, command.as_str()).await;
        self.advance(state, round.id, Some(seat_number)).await
    }

    async fn hit(&self, state: &AppState, round: &Round, seat_number: i16) -> Result<(), AppError> {
        let player = retry_on_conflict(state.config.version_retries, "hit", || async {
            let mut player = require_player_round(state.players.as_ref(), round.id, seat_number).await?;
            ensure_deciding(&player)?;
            let deadline = player.decision_deadline;
            player.last_action = Some(LastAction::Hit);
            player.is_making_decision = false;
            player
                .actions
                .push(ActionEntry::new(ActionKind::Hit, 0.0, deadline, state.clock.now()));
            Ok(state.players.update_if_version(&player).await?)
        })
        .await?;
        emit_action(state, &player, TurnCommand::Hit.as_str()).await;
        Ok(())
    }

    async fn double(
        &self,
        state: &AppState,
        round: &Round,
        current: &PlayerRound,
    ) -> Result<(), AppError> {
        let amount = current.primary_bet();
        let me = current.identity.key();
        let seat_number = current.seat_number;
        let balance_after = wallet::debit(state, &me, amount, NOT_ENOUGH_FUNDS).await?;

        let doubled = retry_on_conflict(state.config.version_retries, "double", || async {
            let mut player = require_player_round(state.players.as_ref(), round.id, seat_number).await?;
            ensure_deciding(&player)?;
            if player.cards.len() != 2 {
                return Err(cannot_act());
            }
            let deadline = player.decision_deadline;
            player.bets.line_mut(BetKind::Primary).add(amount);
            player.total_bet = player.bets.total();
            player.balance = balance_after;
            player.last_action = Some(LastAction::Double);
            player.is_making_decision = false;
            player
                .actions
                .push(ActionEntry::new(ActionKind::Double, amount, deadline, state.clock.now()));
            Ok(state.players.update_if_version(&player).await?)
        })
        .await;
        let player = match doubled {
            Ok(player) => player,
            Err(err) => {
                wallet::credit(state, &me, amount).await?;
                return Err(err);
            }
        };
        info!(round_id = round.id, seat = seat_number, amount, "double down");

        PaymentService::new()
            .commit_debit(state, &player, ExternalKey::Double, amount)
            .await?;
        emit_action(state, &player, TurnCommand::Double.as_str()).await;
        Ok(())
    }

    /// Move the second card to the sibling seat with the same stake. The
    /// sibling joins the seat order right after the original.
    async fn split(
        &self,
        state: &AppState,
        round: &Round,
        current: &PlayerRound,
    ) -> Result<(), AppError> {
        let amount = current.primary_bet();
        let me = current.identity.key();
        let seat_number = current.seat_number;
        let sibling_seat = split_seat(seat_number);
        let balance_after = wallet::debit(state, &me, amount, NOT_ENOUGH_FUNDS).await?;

        let split = retry_on_conflict(state.config.version_retries, "split", || async {
            let mut player = require_player_round(state.players.as_ref(), round.id, seat_number).await?;
            ensure_deciding(&player)?;
            let [first, second] = player.cards.as_slice() else {
                return Err(cannot_act());
            };
            let (first, second): (Card, Card) = (*first, *second);

            let sibling = match state.players.find_by_seat(round.id, sibling_seat).await? {
                Some(existing) => existing,
                None => {
                    let mut bets = BetLedger::default();
                    bets.line_mut(BetKind::Primary).add(amount);
                    state
                        .players
                        .insert(NewPlayerRound {
                            round_id: round.id,
                            table_id: player.table_id.clone(),
                            seat_number: sibling_seat,
                            identity: player.identity.clone(),
                            connection_id: player.connection_id.clone(),
                            balance: balance_after,
                            cards: vec![second],
                            bets,
                            total_bet: amount,
                            last_action: Some(LastAction::SplitSecond),
                            external_ids: ExternalIds::new(),
                        })
                        .await?
                }
            };

            let deadline = player.decision_deadline;
            player.cards = vec![first];
            player.balance = balance_after;
            player.last_action = Some(LastAction::SplitFirst);
            player.is_making_decision = false;
            player
                .actions
                .push(ActionEntry::new(ActionKind::Split, amount, deadline, state.clock.now()));
            let player = state.players.update_if_version(&player).await?;
            Ok((player, sibling))
        })
        .await;
        let (player, sibling) = match split {
            Ok(pair) => pair,
            Err(err) => {
                wallet::credit(state, &me, amount).await?;
                return Err(err);
            }
        };

        let mut order = seat_order::load(state, round.id).await?;
        insert_split_seat(&mut order, seat_number);
        seat_order::store(state, round.id, &order).await?;
        info!(round_id = round.id, seat = seat_number, sibling = sibling_seat, amount, "split");

        PaymentService::new()
            .commit_debit(state, &player, ExternalKey::Split, amount)
            .await?;
        emit_action(state, &player, TurnCommand::Split.as_str()).await;
        emit_hand_value(state, &sibling).await;
        Ok(())
    }

    /// A card scanned after the initial deal, routed by the current seat's
    /// last action.
    pub(super) async fn deal_to_turn(
        &self,
        state: &AppState,
        round: Round,
        card: Card,
    ) -> Result<(), AppError> {
        let current = state
            .players
            .find_current_turn(round.id)
            .await?
            .ok_or_else(not_decided)?;
        if current.is_making_decision {
            return Err(not_decided());
        }
        let seat_number = current.seat_number;

        match current.last_action {
            Some(LastAction::Hit) => {
                let player = self.push_card(state, round.id, seat_number, card, None).await?;
                emit_hand_value(state, &player).await;
                if player.hand().can_continue() {
                    self.start_turn(state, round.id, seat_number).await
                } else {
                    self.finish_and_advance(state, round.id, seat_number).await
                }
            }
            Some(LastAction::Double) => {
                let player = self.push_card(state, round.id, seat_number, card, None).await?;
                emit_hand_value(state, &player).await;
                self.finish_and_advance(state, round.id, seat_number).await
            }
            Some(LastAction::SplitFirst) => {
                let player = self
                    .push_card(state, round.id, seat_number, card, Some(LastAction::SplitSecond))
                    .await?;
                emit_hand_value(state, &player).await;
                Ok(())
            }
            Some(LastAction::SplitSecond) => {
                let sibling = self
                    .push_card(state, round.id, split_seat(seat_number), card, None)
                    .await?;
                emit_hand_value(state, &sibling).await;
                let first = require_player_round(state.players.as_ref(), round.id, seat_number).await?;
                if first.hand().can_continue() {
                    self.start_turn(state, round.id, seat_number).await
                } else {
                    self.finish_and_advance(state, round.id, seat_number).await
                }
            }
            Some(LastAction::Stand) | None => Err(not_decided()),
        }
    }

    async fn push_card(
        &self,
        state: &AppState,
        round_id: i64,
        seat_number: i16,
        card: Card,
        last_action: Option<LastAction>,
    ) -> Result<PlayerRound, AppError> {
        retry_on_conflict(state.config.version_retries, "deal_card", || async {
            let mut player = require_player_round(state.players.as_ref(), round_id, seat_number).await?;
            player.cards.push(card);
            if last_action.is_some() {
                player.last_action = last_action;
            }
            Ok(state.players.update_if_version(&player).await?)
        })
        .await
    }

    /// Take or decline insurance while the window is open.
    pub async fn make_insurance(
        &self,
        state: &AppState,
        session: &SessionContext,
        seat_number: i16,
        take: bool,
    ) -> Result<(), AppError> {
        let identity = require_player(session)?;
        let round = require_open_round(state, &session.table_id).await?;
        if !round.insurance_open(state.clock.now()) {
            return Err(invalid(
                ValidationKind::DecisionExpired,
                "Insurance decision time is over",
            ));
        }
        let player = match state.players.find_by_seat(round.id, seat_number).await? {
            Some(p) if p.is_owned_by(&identity.user_id, &identity.merchant_id) => p,
            _ => {
                return Err(invalid(
                    ValidationKind::NoBet,
                    "Player has not placed any bet yet",
                ))
            }
        };
        if player.insurance != InsuranceDecision::Undecided {
            return Err(invalid(
                ValidationKind::ActionNotAllowed,
                "Insurance decision is already made",
            ));
        }
        let up_card = &round.dealer_cards[..round.dealer_cards.len().min(1)];
        if !player.hand().insurance_offered(up_card) {
            return Err(invalid(
                ValidationKind::ActionNotAllowed,
                "Insurance is not available",
            ));
        }

        let me = identity.key();
        let amount = if take { player.primary_bet() / 2.0 } else { 0.0 };
        let balance_after = if take {
            wallet::debit(state, &me, amount, NOT_ENOUGH_FUNDS).await?
        } else {
            player.balance
        };

        let decided = retry_on_conflict(state.config.version_retries, "insurance", || async {
            let mut player = require_player_round(state.players.as_ref(), round.id, seat_number).await?;
            if player.insurance != InsuranceDecision::Undecided {
                return Err(invalid(
                    ValidationKind::ActionNotAllowed,
                    "Insurance decision is already made",
                ));
            }
            if take {
                player.insurance = InsuranceDecision::Taken;
                player.insurance_amount = amount;
                player.balance = balance_after;
                player.actions.push(ActionEntry::new(
                    ActionKind::Insurance,
                    amount,
                    round.insurance_deadline,
                    state.clock.now(),
                ));
            } else {
                player.insurance = InsuranceDecision::Declined;
            }
            Ok(state.players.update_if_version(&player).await?)
        })
        .await;
        let player = match decided {
            Ok(player) => player,
            Err(err) => {
                if take {
                    wallet::credit(state, &me, amount).await?;
                }
                return Err(err);
            }
        };
        info!(round_id = round.id, seat = seat_number, take, amount, "insurance decided");

        if take {
            PaymentService::new()
                .commit_debit(state, &player, ExternalKey::Insurance, amount)
                .await?;
        }
        let action = if take { "insurance" } else { "no_insurance" };
        emit_action(state, &player, action).await;
        Ok(())
    }
}
