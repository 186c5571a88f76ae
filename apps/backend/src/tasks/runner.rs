//! In-process scheduler: tasks travel over an mpsc channel and each fired
//! task runs on its own tokio task after its delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::{DeferredTask, ScheduledTask, TaskExecutor, TaskScheduler};
use crate::error::AppError;
use crate::errors::ErrorCode;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<ScheduledTask>,
}

/// Receiving half; drive it with [`TaskReceiver::run`] once the executor exists.
pub struct TaskReceiver {
    receiver: mpsc::UnboundedReceiver<ScheduledTask>,
    retry_delay: Duration,
}

impl TokioScheduler {
    pub fn channel() -> (TokioScheduler, TaskReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            TokioScheduler { sender },
            TaskReceiver {
                receiver,
                retry_delay: DEFAULT_RETRY_DELAY,
            },
        )
    }
}

#[async_trait]
impl TaskScheduler for TokioScheduler {
    async fn schedule(
        &self,
        task: DeferredTask,
        delay: Duration,
        max_retries: u32,
    ) -> Result<(), AppError> {
        debug!(task = task.name(), delay_ms = delay.as_millis() as u64, "scheduling task");
        self.sender
            .send(ScheduledTask {
                task,
                delay,
                max_retries,
            })
            .map_err(|err| {
                AppError::internal(ErrorCode::TaskError, "Task runner is not running", err)
            })
    }
}

impl TaskReceiver {
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Consume scheduled tasks until the channel closes or `shutdown` fires.
    pub fn run(
        mut self,
        executor: Arc<dyn TaskExecutor>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let scheduled = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    next = self.receiver.recv() => match next {
                        Some(scheduled) => scheduled,
                        None => break,
                    },
                };
                let executor = executor.clone();
                let shutdown = shutdown.clone();
                let retry_delay = self.retry_delay;
                tokio::spawn(async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = fire(executor, scheduled, retry_delay) => {}
                    }
                });
            }
            debug!("task runner stopped");
        })
    }
}

async fn fire(executor: Arc<dyn TaskExecutor>, scheduled: ScheduledTask, retry_delay: Duration) {
    tokio::time::sleep(scheduled.delay).await;
    let name = scheduled.task.name();
    let mut attempt = 0u32;
    loop {
        match executor.execute(scheduled.task.clone()).await {
            Ok(()) => return,
            Err(err) if err.is_retryable() && attempt < scheduled.max_retries => {
                attempt += 1;
                warn!(task = name, attempt, error = %err, "task failed, retrying");
                tokio::time::sleep(retry_delay).await;
            }
            Err(err) => {
                error!(task = name, attempt, error = %err, "task failed");
                return;
            }
        }
    }
}
