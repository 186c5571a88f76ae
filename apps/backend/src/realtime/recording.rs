use async_trait::async_trait;
use parking_lot::Mutex;

use super::EventPublisher;
use crate::error::AppError;
use crate::protocol::{Audience, ServerEvent};

/// Keeps every published event in memory. Used by single-process runs and
/// tests that assert on what a table would have seen.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(Audience, ServerEvent)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Audience, ServerEvent)> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<(Audience, ServerEvent)> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(_, e)| e.name()).collect()
    }

    /// Events with the given name, in publish order.
    pub fn named(&self, name: &str) -> Vec<(Audience, ServerEvent)> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| e.name() == name)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, audience: Audience, event: ServerEvent) -> Result<(), AppError> {
        tracing::debug!(event = event.name(), channel = %audience.channel(), "recorded event");
        self.events.lock().push((audience, event));
        Ok(())
    }
}
