use std::sync::Arc;

use blackjack_backend::config::db::DbKind;
use blackjack_backend::infra::state::build_state;
use blackjack_backend::services::GameFlowService;
use blackjack_backend::{EngineTasks, TokioScheduler};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod telemetry;

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - DATABASE_URL (unless DB_KIND=sqlite), REDIS_URL
    // - optional engine timings, see EngineConfig::from_env
    let (scheduler, receiver) = TokioScheduler::channel();

    let state = match build_state()
        .with_db(DbKind::from_env())
        .with_redis()
        .with_scheduler(Arc::new(scheduler))
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };
    info!(config = ?state.config, "engine state ready");

    let shutdown = CancellationToken::new();
    let runner = receiver.run(Arc::new(EngineTasks::new(state.clone())), shutdown.clone());

    let tables = match state.tables.list_tables().await {
        Ok(tables) => tables,
        Err(e) => {
            error!(error = %e, "failed to list tables");
            std::process::exit(1);
        }
    };
    let flow = GameFlowService::new();
    let opened = join_all(
        tables
            .iter()
            .map(|table| flow.ensure_open_round(&state, &table.id)),
    )
    .await;
    for (table, result) in tables.iter().zip(opened) {
        match result {
            Ok(round) => info!(table_id = %table.id, round_id = round.id, "table open"),
            Err(e) => warn!(table_id = %table.id, error = %e, "table has no open round"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
    shutdown.cancel();
    if let Err(e) = runner.await {
        warn!(error = %e, "task runner did not stop cleanly");
    }
}
