//! Scheduler that queues tasks for the test to fire by hand.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use blackjack_backend::error::AppError;
use blackjack_backend::errors::ErrorCode;
use blackjack_backend::tasks::{DeferredTask, ScheduledTask, TaskScheduler};

#[derive(Debug, Default)]
pub struct RecordingScheduler {
    queue: Mutex<Vec<ScheduledTask>>,
    refused: Mutex<Vec<&'static str>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Vec<ScheduledTask> {
        self.queue.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.queue.lock().iter().map(|s| s.task.name()).collect()
    }

    /// Remove and return queued tasks with the given name, oldest first.
    pub fn take_named(&self, name: &str) -> Vec<ScheduledTask> {
        let mut queue = self.queue.lock();
        let (taken, rest): (Vec<_>, Vec<_>) =
            queue.drain(..).partition(|s| s.task.name() == name);
        *queue = rest;
        taken
    }

    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Fail the next schedule call for a task with this name.
    pub fn refuse_once(&self, name: &'static str) {
        self.refused.lock().push(name);
    }
}

#[async_trait]
impl TaskScheduler for RecordingScheduler {
    async fn schedule(
        &self,
        task: DeferredTask,
        delay: Duration,
        max_retries: u32,
    ) -> Result<(), AppError> {
        {
            let mut refused = self.refused.lock();
            if let Some(at) = refused.iter().position(|n| *n == task.name()) {
                refused.remove(at);
                return Err(AppError::Db {
                    code: ErrorCode::DbUnavailable,
                    detail: format!("queue unavailable for {}", task.name()),
                });
            }
        }
        self.queue.lock().push(ScheduledTask {
            task,
            delay,
            max_retries,
        });
        Ok(())
    }
}
