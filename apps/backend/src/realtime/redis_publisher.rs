use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use super::EventPublisher;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::protocol::{Audience, ServerEvent};

const PUBLISHER_MAX_ATTEMPTS: u32 = 3;
const PUBLISHER_INITIAL_RETRY_DELAY_MS: u64 = 50;
const PUBLISHER_MAX_RETRY_DELAY_MS: u64 = 200;

/// What goes over the wire: the event plus enough routing for the socket
/// layer to honour a skipped sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub audience: Audience,
    #[serde(flatten)]
    pub event: ServerEvent,
}

/// Publishes envelopes on Redis pub/sub channels named after the audience.
#[derive(Clone)]
pub struct RedisPublisher {
    manager: ConnectionManager,
}

impl RedisPublisher {
    pub async fn connect(redis_url: &str) -> Result<Self, AppError> {
        let client = Client::open(redis_url)
            .map_err(|err| AppError::config(format!("Invalid REDIS_URL: {err}")))?;
        let manager = ConnectionManager::new(client).await.map_err(|err| {
            AppError::internal(
                ErrorCode::PublishError,
                "Unable to initialize Redis connection manager",
                err,
            )
        })?;
        Ok(Self { manager })
    }

    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    async fn publish_to_channel(&self, channel: String, encoded: String) -> Result<(), AppError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let mut publisher = self.manager.clone();
            match publisher
                .publish::<_, _, ()>(channel.clone(), encoded.clone())
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let transient = is_transient_error(&err);
                    let app_err = AppError::internal(
                        ErrorCode::PublishError,
                        "Failed to publish realtime event to Redis",
                        err,
                    );
                    if attempt >= PUBLISHER_MAX_ATTEMPTS || !transient {
                        return Err(app_err);
                    }

                    let delay_ms = retry_delay_ms(attempt);
                    warn!(
                        error = %app_err,
                        channel = %channel,
                        attempt,
                        retry_delay_ms = delay_ms,
                        "Redis publish failed, retrying"
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl EventPublisher for RedisPublisher {
    async fn publish(&self, audience: Audience, event: ServerEvent) -> Result<(), AppError> {
        let channel = audience.channel();
        let envelope = EventEnvelope { audience, event };
        let encoded = serde_json::to_string(&envelope).map_err(|err| {
            AppError::internal(
                ErrorCode::Internal,
                "Failed to serialize realtime envelope",
                err,
            )
        })?;
        self.publish_to_channel(channel, encoded).await
    }
}

fn retry_delay_ms(attempt: u32) -> u64 {
    PUBLISHER_INITIAL_RETRY_DELAY_MS
        .saturating_mul(2_u64.pow(attempt.saturating_sub(1)))
        .min(PUBLISHER_MAX_RETRY_DELAY_MS)
}

fn is_transient_error(err: &redis::RedisError) -> bool {
    if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
        return true;
    }

    let error_msg = err.to_string().to_lowercase();
    if error_msg.contains("authentication failed") || error_msg.contains("unsupported") {
        return false;
    }

    error_msg.contains("connection refused")
        || error_msg.contains("connection reset")
        || error_msg.contains("broken pipe")
        || error_msg.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn retry_delay_doubles_up_to_cap() {
        assert_eq!(retry_delay_ms(1), 50);
        assert_eq!(retry_delay_ms(2), 100);
        assert_eq!(retry_delay_ms(3), 200);
        assert_eq!(retry_delay_ms(4), 200);
    }

    #[test]
    fn envelope_keeps_event_tag_at_top_level() {
        let envelope = EventEnvelope {
            audience: Audience::table_except("t1", "c1"),
            event: ServerEvent::DealerChanged {
                dealer_name: "Anna".into(),
            },
        };
        let encoded = serde_json::to_value(&envelope).unwrap();
        assert_eq!(encoded["event"], json!("dealer_changed"));
        assert_eq!(encoded["data"]["dealer_name"], json!("Anna"));
        assert_eq!(encoded["audience"]["skip"], json!("c1"));
    }
}
