use std::future::Future;
use std::time::Duration;

use migration::MigrationCommand;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::{info, warn};

use crate::config::db::{database_url, DbKind};
use crate::error::AppError;

const CONNECT_ATTEMPTS: u32 = 5;
const CONNECT_INTERVAL_MS: u64 = 500;

/// Retry a connection attempt with fixed interval delays.
async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    loop {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(attempts = attempt, interval_ms, "connection retry succeeded");
                }
                return Ok(result);
            }
            Err(e) if attempt < max_attempts => {
                warn!(attempt, max_attempts, interval_ms, error = %e, "connection attempt failed");
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Connect without running migrations.
pub async fn connect_db(kind: &DbKind) -> Result<DatabaseConnection, AppError> {
    let url = database_url(kind)?;
    let mut options = ConnectOptions::new(url);
    options.sqlx_logging(false);
    if *kind == DbKind::SqliteMemory {
        // Every pooled connection would otherwise get its own empty database.
        options.max_connections(1).min_connections(1);
    }

    retry_connection(
        || {
            let options = options.clone();
            async move { Ok(Database::connect(options).await?) }
        },
        CONNECT_ATTEMPTS,
        CONNECT_INTERVAL_MS,
    )
    .await
}

/// Connect and bring the schema up to date.
pub async fn bootstrap_db(kind: &DbKind) -> Result<DatabaseConnection, AppError> {
    let conn = connect_db(kind).await?;
    migration::migrate(&conn, MigrationCommand::Up).await?;
    Ok(conn)
}
