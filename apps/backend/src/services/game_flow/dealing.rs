use tracing::{debug, info, warn};

use super::{emit_dealer_score, emit_hand_value, invalid, GameFlowService};
use crate::domain::{
    BetKind, Card, DealOrder, DealProgress, DealTarget, Hand, InsuranceDecision, SideBetPayouts,
};
use crate::error::AppError;
use crate::errors::domain::ValidationKind;
use crate::protocol::{Audience, ServerEvent, SessionContext};
use crate::realtime::emit;
use crate::repos::player_rounds::require_player_round;
use crate::repos::rounds::require_round;
use crate::repos::{PlayerRound, Round, TableConfig};
use crate::services::common::require_open_round;
use crate::services::seat_order;
use crate::services::settlement::SettlementService;
use crate::services::table_config::table_config;
use crate::services::versioned::retry_on_conflict;
use crate::state::AppState;
use crate::tasks::DeferredTask;

/// Score both side bets once a seat holds its first two cards.
pub(super) fn settle_side_bets(
    player: &mut PlayerRound,
    dealer_cards: &[Card],
    payouts: &SideBetPayouts,
) {
    let pair_stake = player.bets.amount(BetKind::PerfectPair);
    if pair_stake > 0.0 {
        let result = payouts.evaluate_perfect_pair(pair_stake, &player.cards);
        let line = player.bets.line_mut(BetKind::PerfectPair);
        line.winning = result.winning;
        line.combination = result.combination;
    }
    let trio_stake = player.bets.amount(BetKind::TwentyOnePlusThree);
    if trio_stake > 0.0 {
        let result =
            payouts.evaluate_twenty_one_plus_three(trio_stake, &player.cards, dealer_cards);
        let line = player.bets.line_mut(BetKind::TwentyOnePlusThree);
        line.winning = result.winning;
        line.combination = result.combination;
    }
}

/// Hand a player's deal slot back when the card never reached the seat, so
/// the same card can be scanned again.
async fn release_deal_slot(state: &AppState, taken: &Round, card_count: i32) {
    let mut restored = taken.clone();
    restored.card_count = card_count;
    restored.finished_dealing = false;
    if let Err(err) = state.rounds.update_if_version(&restored).await {
        warn!(round_id = taken.id, error = %err, "deal slot not released");
    }
}

impl GameFlowService {
    /// A card from the dealer's scanner. Before the deal completes it lands
    /// where the table's deal order says; afterwards it goes to the seat
    /// whose turn it is, or to the dealer once every seat is resolved.
    pub async fn scan_card(
        &self,
        state: &AppState,
        session: &SessionContext,
        card: &str,
    ) -> Result<(), AppError> {
        let card: Card = card.parse()?;
        let round = require_open_round(state, &session.table_id).await?;
        let now = state.clock.now();
        if round.betting_open(now) {
            return Err(invalid(
                ValidationKind::BettingOpen,
                "Betting time is not over",
            ));
        }
        if round.insurance_open(now) {
            return Err(invalid(
                ValidationKind::InsuranceOpen,
                "Insurance decision time is not over",
            ));
        }

        if !round.finished_dealing {
            return self.deal_initial(state, round, card).await;
        }
        if round.show_dealer_cards {
            return self.dealer_card(state, round, card).await;
        }
        self.deal_to_turn(state, round, card).await
    }

    async fn deal_initial(
        &self,
        state: &AppState,
        round: Round,
        card: Card,
    ) -> Result<(), AppError> {
        let table = table_config(state, &round.table_id).await?;
        let order = if round.dealer_cards.is_empty() && round.card_count == 0 {
            seat_order::rebuild(state, round.id).await?
        } else {
            seat_order::load(state, round.id).await?
        };

        let progress = DealProgress {
            dealer_cards: round.dealer_cards.len(),
            card_count: usize::try_from(round.card_count).unwrap_or_default(),
            seats: order.len(),
        };
        let target = table.deal_order.strategy().next_target(progress)?;
        debug!(round_id = round.id, ?target, card = %card, "initial deal");

        let mut next = round.clone();
        next.card_count = i32::try_from(target.next_card_count(progress)).unwrap_or(i32::MAX);
        if matches!(target, DealTarget::Dealer | DealTarget::SecondDealer) {
            next.dealer_cards.push(card);
        }
        if target.completes_deal() {
            next.finished_dealing = true;
        }
        let slot_before = round.card_count;
        // Two scanners racing for the same slot: the loser gets a conflict.
        let round = state.rounds.update_if_version(&next).await?;

        match target {
            DealTarget::Player(idx) | DealTarget::LastPlayer(idx) => {
                let Some(seat) = order.get(idx).copied() else {
                    release_deal_slot(state, &round, slot_before).await;
                    return Err(invalid(
                        ValidationKind::ActionNotAllowed,
                        "Seat order changed mid-deal",
                    ));
                };
                let dealer_cards = round.dealer_cards.clone();
                let payouts = table.side_bet_payouts;
                let dealt =
                    retry_on_conflict(state.config.version_retries, "deal_card", || async {
                        let mut player =
                            require_player_round(state.players.as_ref(), round.id, seat).await?;
                        player.cards.push(card);
                        if player.cards.len() == 2 {
                            settle_side_bets(&mut player, &dealer_cards, &payouts);
                        }
                        Ok(state.players.update_if_version(&player).await?)
                    })
                    .await;
                let player = match dealt {
                    Ok(player) => player,
                    Err(err) => {
                        release_deal_slot(state, &round, slot_before).await;
                        return Err(err);
                    }
                };
                emit_hand_value(state, &player).await;
            }
            DealTarget::Dealer | DealTarget::SecondDealer => {
                emit_dealer_score(state, &round).await;
            }
        }

        if target.completes_deal() {
            info!(round_id = round.id, seats = order.len(), "initial deal complete");
            self.after_initial_deal(state, &round, &table, &order).await?;
        }
        Ok(())
    }

    /// Decide between the insurance window, settling a dealer blackjack and
    /// the first player turn.
    async fn after_initial_deal(
        &self,
        state: &AppState,
        round: &Round,
        table: &TableConfig,
        order: &[i16],
    ) -> Result<(), AppError> {
        let players = state.players.list_by_round(round.id).await?;
        let up_card = &round.dealer_cards[..round.dealer_cards.len().min(1)];
        let insurable: Vec<i16> = players
            .iter()
            .filter(|p| order.contains(&p.seat_number))
            .filter(|p| p.hand().insurance_offered(up_card))
            .map(|p| p.seat_number)
            .collect();
        let ace_up = round.up_card().is_some_and(Card::is_ace);
        let dealer_blackjack = Hand::dealer(&round.dealer_cards).is_blackjack();

        if ace_up && !insurable.is_empty() {
            return self.open_insurance(state, round, insurable).await;
        }
        if table.deal_order == DealOrder::UpfrontTwoCard && dealer_blackjack {
            info!(round_id = round.id, "dealer blackjack, settling");
            return SettlementService::new().settle(state, round.id).await;
        }
        self.advance(state, round.id, None).await
    }

    async fn open_insurance(
        &self,
        state: &AppState,
        round: &Round,
        insurable_seats: Vec<i16>,
    ) -> Result<(), AppError> {
        let window = state.config.insurance_window;
        let round_id = round.id;
        retry_on_conflict(state.config.version_retries, "open_insurance", || async {
            let mut round = require_round(state.rounds.as_ref(), round_id).await?;
            round.insurance_deadline = Some(state.clock.now() + window);
            Ok(state.rounds.update_if_version(&round).await?)
        })
        .await?;
        info!(round_id, seats = ?insurable_seats, "insurance window open");

        emit(
            state.publisher(),
            Audience::table(&round.table_id),
            ServerEvent::MakeInsurance {
                decision_time: state.config.insurance_decision_secs(),
                insurable_seats,
            },
        )
        .await;
        state
            .scheduler
            .schedule(
                DeferredTask::InsuranceTimeout { round_id },
                window,
                state.config.task_retries,
            )
            .await
    }

    /// The insurance window closed. Undecided seats decline; then either a
    /// dealer blackjack settles the round or the first turn starts.
    pub async fn insurance_timeout(&self, state: &AppState, round_id: i64) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.finished || round.insurance_deadline.is_none() {
            return Ok(());
        }
        let players = state.players.list_by_round(round_id).await?;
        if players.iter().any(|p| p.is_player_turn || p.finished_turn) {
            debug!(round_id, "insurance timeout after turns started");
            return Ok(());
        }

        for player in players
            .iter()
            .filter(|p| p.insurance == InsuranceDecision::Undecided && p.cards.len() == 2)
        {
            let seat = player.seat_number;
            retry_on_conflict(state.config.version_retries, "decline_insurance", || async {
                let mut player = require_player_round(state.players.as_ref(), round_id, seat).await?;
                if player.insurance != InsuranceDecision::Undecided {
                    return Ok(player);
                }
                player.insurance = InsuranceDecision::Declined;
                Ok(state.players.update_if_version(&player).await?)
            })
            .await?;
        }

        let table = table_config(state, &round.table_id).await?;
        if table.deal_order == DealOrder::UpfrontTwoCard
            && Hand::dealer(&round.dealer_cards).is_blackjack()
        {
            info!(round_id, "dealer blackjack after insurance, settling");
            return SettlementService::new().settle(state, round_id).await;
        }
        self.advance(state, round_id, None).await
    }
}
