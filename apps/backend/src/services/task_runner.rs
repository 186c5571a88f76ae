//! Executes deferred tasks against the engine services.

use async_trait::async_trait;
use tracing::{debug, info_span, Instrument};

use super::game_flow::GameFlowService;
use super::payments::PaymentService;
use super::settlement::SettlementService;
use crate::error::AppError;
use crate::state::AppState;
use crate::tasks::{DeferredTask, TaskExecutor};

pub struct EngineTasks {
    state: AppState,
}

impl EngineTasks {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    async fn run(&self, task: DeferredTask) -> Result<(), AppError> {
        let state = &self.state;
        let payments = PaymentService::new();
        let flow = GameFlowService::new();
        match task {
            DeferredTask::PushBets { table_id, round_id } => {
                payments.push_bets(state, &table_id, round_id).await
            }
            DeferredTask::PushSeatBet {
                round_id,
                seat_number,
                external_id,
            } => {
                payments
                    .push_seat_bet(state, round_id, seat_number, &external_id)
                    .await
            }
            DeferredTask::CleanSeats { table_id, round_id } => {
                flow.clean_seats(state, &table_id, round_id).await
            }
            DeferredTask::InsuranceTimeout { round_id } => {
                flow.insurance_timeout(state, round_id).await
            }
            DeferredTask::Nudge {
                round_id,
                seat_number,
                action_count,
            } => flow.nudge(state, round_id, seat_number, action_count).await,
            DeferredTask::Settle { round_id } => SettlementService::new().resume(state, round_id).await,
            DeferredTask::Payout {
                round_id,
                seat_number,
                external_id,
            } => {
                payments
                    .payout(state, round_id, seat_number, &external_id)
                    .await
            }
            DeferredTask::CancelBet {
                round_id,
                seat_number,
                key,
                amount,
                external_id,
            } => {
                payments
                    .cancel_bet(state, round_id, seat_number, key, amount, &external_id)
                    .await
            }
            DeferredTask::StartNewRound {
                table_id,
                prev_round_id,
                taken_seats,
            } => flow
                .start_new_round(state, &table_id, prev_round_id, taken_seats)
                .await
                .map(drop),
        }
    }
}

#[async_trait]
impl TaskExecutor for EngineTasks {
    async fn execute(&self, task: DeferredTask) -> Result<(), AppError> {
        let name = task.name();
        debug!(task = name, "task fired");
        self.run(task)
            .instrument(info_span!("task", task = name))
            .await
    }
}
