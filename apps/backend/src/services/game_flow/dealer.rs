use tracing::{debug, info};

use super::{emit_dealer_score, invalid, GameFlowService};
use crate::domain::{Card, Hand};
use crate::error::AppError;
use crate::errors::domain::ValidationKind;
use crate::protocol::{Audience, ServerEvent, SessionContext};
use crate::realtime::emit;
use crate::repos::rounds::require_round;
use crate::repos::{PlayerRound, Round};
use crate::services::common::require_open_round;
use crate::services::seat_order;
use crate::services::settlement::SettlementService;
use crate::services::versioned::retry_on_conflict;
use crate::state::AppState;

/// Whether the players' hands already decide the round: every hand is bust
/// or a blackjack the up-card cannot match.
fn nothing_left_to_play<'a>(
    hands: impl IntoIterator<Item = Hand<'a>>,
    up_card: Option<&Card>,
) -> bool {
    let exposed = up_card.is_some_and(|c| c.is_ace() || c.rank.is_ten_value());
    hands
        .into_iter()
        .all(|hand| hand.is_bust() || (hand.is_blackjack() && !exposed))
}

impl GameFlowService {
    /// Every seat is done. Settle straight away when the dealer's hand can
    /// not change anything, otherwise reveal it and ask for dealer cards.
    pub(super) async fn players_resolved(
        &self,
        state: &AppState,
        round_id: i64,
    ) -> Result<(), AppError> {
        let round = require_round(state.rounds.as_ref(), round_id).await?;
        if round.finished || round.show_dealer_cards {
            return Ok(());
        }
        let order = seat_order::load(state, round_id).await?;
        let players = state.players.list_by_round(round_id).await?;
        let in_play: Vec<&PlayerRound> = players
            .iter()
            .filter(|p| order.contains(&p.seat_number) && !p.rejected)
            .collect();

        let dealer = Hand::dealer(&round.dealer_cards);
        let dealer_stands = round.dealer_cards.len() >= 2 && !dealer.dealer_should_hit();
        let settle_now =
            nothing_left_to_play(in_play.iter().map(|p| p.hand()), round.up_card()) || dealer_stands;

        let round = retry_on_conflict(state.config.version_retries, "reveal_dealer", || async {
            let mut round = require_round(state.rounds.as_ref(), round_id).await?;
            round.show_dealer_cards = true;
            Ok(state.rounds.update_if_version(&round).await?)
        })
        .await?;
        emit_dealer_score(state, &round).await;

        if settle_now {
            info!(round_id, dealer_stands, "dealer turn not needed, settling");
            return SettlementService::new().settle(state, round_id).await;
        }
        emit(
            state.publisher(),
            Audience::table(&round.table_id),
            ServerEvent::ScanDealerCard {},
        )
        .await;
        Ok(())
    }

    pub async fn scan_dealer_card(
        &self,
        state: &AppState,
        session: &SessionContext,
        card: &str,
    ) -> Result<(), AppError> {
        let card: Card = card.parse()?;
        let round = require_open_round(state, &session.table_id).await?;
        if !round.show_dealer_cards {
            return Err(invalid(
                ValidationKind::PhaseMismatch,
                "Players have not finished their turns",
            ));
        }
        self.dealer_card(state, round, card).await
    }

    /// Dealer draws while under 17 and settles once standing.
    pub(super) async fn dealer_card(
        &self,
        state: &AppState,
        round: Round,
        card: Card,
    ) -> Result<(), AppError> {
        if !Hand::dealer(&round.dealer_cards).dealer_should_hit() {
            return Err(invalid(
                ValidationKind::ActionNotAllowed,
                "Scanning dealer-card over 16 is not allowed",
            ));
        }
        let mut next = round;
        next.dealer_cards.push(card);
        let round = state.rounds.update_if_version(&next).await?;
        let dealer = Hand::dealer(&round.dealer_cards);
        debug!(round_id = round.id, card = %card, score = dealer.score(), "dealer card");
        emit_dealer_score(state, &round).await;

        if dealer.dealer_should_hit() {
            return Ok(());
        }
        SettlementService::new().settle(state, round.id).await
    }
}
