//! Outbound event delivery.
//!
//! The engine hands every event to an [`EventPublisher`] together with its
//! [`Audience`]; fan-out to sockets happens on the other side of the channel.

use async_trait::async_trait;

use crate::error::AppError;
use crate::protocol::{Audience, ServerEvent};

pub mod recording;
pub mod redis_publisher;

pub use recording::RecordingPublisher;
pub use redis_publisher::RedisPublisher;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, audience: Audience, event: ServerEvent) -> Result<(), AppError>;
}

/// Publish and log a failure instead of returning it. Game state has already
/// been committed when events go out, so a lost event never unwinds it.
pub async fn emit(publisher: &dyn EventPublisher, audience: Audience, event: ServerEvent) {
    let name = event.name();
    if let Err(err) = publisher.publish(audience, event).await {
        tracing::warn!(event = name, error = %err, "Failed to publish event");
    }
}
