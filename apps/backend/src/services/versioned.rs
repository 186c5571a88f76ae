//! Bounded retry for version-checked updates.

use std::future::Future;

use tracing::debug;

use crate::error::AppError;
use crate::errors::ErrorCode;

fn is_version_conflict(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Conflict {
            code: ErrorCode::OptimisticLock,
            ..
        }
    )
}

/// Run `op` until it stops losing version races, at most `attempts` times.
/// Each attempt must re-read and re-validate the state it writes.
pub async fn retry_on_conflict<T, F, Fut>(
    attempts: u32,
    what: &'static str,
    mut op: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Err(err) if is_version_conflict(&err) && attempt < attempts => {
                debug!(what, attempt, "version conflict, retrying");
                attempt += 1;
                tokio::task::yield_now().await;
            }
            Err(err) if is_version_conflict(&err) => {
                return Err(AppError::conflict(
                    ErrorCode::OptimisticLock,
                    format!("{what}: too many concurrent updates"),
                ));
            }
            other => return other,
        }
    }
}
