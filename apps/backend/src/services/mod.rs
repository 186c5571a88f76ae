pub mod clock;
pub mod common;
pub mod dispatch;
pub mod game_flow;
pub mod ledger;
pub mod payments;
pub mod seat_order;
pub mod sessions;
pub mod settlement;
pub mod snapshot;
pub mod table_config;
pub mod task_runner;
pub mod versioned;
pub mod wallet;

pub use dispatch::dispatch;
pub use game_flow::GameFlowService;
pub use ledger::LedgerService;
pub use payments::PaymentService;
pub use sessions::SessionService;
pub use settlement::SettlementService;
pub use task_runner::EngineTasks;
