//! Inbound message routing. Failures go back to the sending connection as
//! an `error` event; nothing here is fatal to the table.

use tracing::{debug, error, info_span, Instrument};

use super::game_flow::GameFlowService;
use super::ledger::LedgerService;
use super::sessions::SessionService;
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::protocol::{Audience, ClientAction, ServerEvent, SessionContext};
use crate::realtime::emit;
use crate::state::AppState;

async fn route(
    state: &AppState,
    session: &mut SessionContext,
    action: ClientAction,
) -> Result<(), AppError> {
    if action.is_dealer_only() && !session.is_dealer() {
        return Err(DomainError::validation(
            ValidationKind::ActionNotAllowed,
            "Only the dealer can do that",
        )
        .into());
    }
    let ledger = LedgerService::new();
    let flow = GameFlowService::new();
    match action {
        ClientAction::PlaceBet {
            seat_number,
            bet_type,
            amount,
        } => ledger
            .place_bet(state, session, seat_number, &bet_type, amount)
            .await
            .map(drop),
        ClientAction::MakeRollback {
            seat_number,
            bet_type,
        } => ledger
            .rollback(state, session, seat_number, &bet_type)
            .await
            .map(drop),
        ClientAction::MakeRepeat => ledger.repeat(state, session).await.map(drop),
        ClientAction::MakeAction {
            seat_number,
            action,
        } => flow.make_action(state, session, seat_number, action).await,
        ClientAction::MakeInsurance { seat_number, value } => {
            flow.make_insurance(state, session, seat_number, value).await
        }
        ClientAction::ScanCard { card } => flow.scan_card(state, session, &card).await,
        ClientAction::ScanDealerCard { card } => {
            flow.scan_dealer_card(state, session, &card).await
        }
        ClientAction::ResetRound => flow.reset_round(state, session).await.map(drop),
        ClientAction::ChangeDealer { dealer_name } => {
            flow.change_dealer(state, session, &dealer_name).await
        }
        ClientAction::JoinTable { token, merchant_id } => {
            let identity = SessionService::new()
                .join_table(state, session, &token, &merchant_id)
                .await?;
            session.player = Some(identity);
            Ok(())
        }
        ClientAction::LeaveTable => {
            SessionService::new().leave_table(state, session).await?;
            session.player = None;
            Ok(())
        }
    }
}

/// Handle one inbound message for a connection.
pub async fn dispatch(
    state: &AppState,
    session: &mut SessionContext,
    action: ClientAction,
) -> Result<(), AppError> {
    let name = action.name();
    let span = info_span!(
        "dispatch",
        action = name,
        table_id = %session.table_id,
        connection_id = %session.connection_id
    );
    let connection_id = session.connection_id.clone();

    let result = route(state, session, action).instrument(span).await;
    if let Err(err) = &result {
        if err.is_user_facing() {
            debug!(action = name, code = %err.code(), detail = %err.detail(), "request refused");
        } else {
            error!(action = name, code = %err.code(), error = %err, "request failed");
        }
        emit(
            state.publisher(),
            Audience::connection(&connection_id),
            ServerEvent::error(err.user_message()),
        )
        .await;
    }
    result
}
