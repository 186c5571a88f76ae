//! Deferred work: explicit payloads, a scheduler seam and the tokio runner.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ExternalKey;
use crate::error::AppError;
use crate::protocol::TakenSeats;

pub mod runner;

pub use runner::{TaskReceiver, TokioScheduler};

/// Work the engine defers. Every item re-reads state when it fires, so a
/// stale or duplicated item is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum DeferredTask {
    /// Betting closed: fan out one merchant bet per seat.
    PushBets { table_id: String, round_id: i64 },
    /// Debit one seat's total bet.
    PushSeatBet {
        round_id: i64,
        seat_number: i16,
        external_id: String,
    },
    /// Nobody bet this round: clear the previous round's seats.
    CleanSeats { table_id: String, round_id: i64 },
    /// Insurance window closed.
    InsuranceTimeout { round_id: i64 },
    /// Force a stand on an inactive seat whose decision time ran out.
    Nudge {
        round_id: i64,
        seat_number: i16,
        action_count: usize,
    },
    /// Settle what an interrupted settlement left behind.
    Settle { round_id: i64 },
    /// Credit one settled seat.
    Payout {
        round_id: i64,
        seat_number: i16,
        external_id: String,
    },
    /// Refund one committed debit of a reset round.
    CancelBet {
        round_id: i64,
        seat_number: i16,
        key: ExternalKey,
        amount: f64,
        external_id: String,
    },
    StartNewRound {
        table_id: String,
        prev_round_id: i64,
        taken_seats: TakenSeats,
    },
}

impl DeferredTask {
    pub fn name(&self) -> &'static str {
        match self {
            DeferredTask::PushBets { .. } => "push_bets",
            DeferredTask::PushSeatBet { .. } => "push_seat_bet",
            DeferredTask::CleanSeats { .. } => "clean_seats",
            DeferredTask::InsuranceTimeout { .. } => "insurance_timeout",
            DeferredTask::Nudge { .. } => "nudge",
            DeferredTask::Settle { .. } => "settle",
            DeferredTask::Payout { .. } => "payout",
            DeferredTask::CancelBet { .. } => "cancel_bet",
            DeferredTask::StartNewRound { .. } => "start_new_round",
        }
    }
}

/// Deferred item with its delivery parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub task: DeferredTask,
    pub delay: Duration,
    pub max_retries: u32,
}

#[async_trait]
pub trait TaskScheduler: Send + Sync {
    async fn schedule(
        &self,
        task: DeferredTask,
        delay: Duration,
        max_retries: u32,
    ) -> Result<(), AppError>;
}

/// Runs a fired task. Implemented by the engine.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: DeferredTask) -> Result<(), AppError>;
}
