//! HTTP wallet client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::inflection::{inflect_request, normalize_response, KeyCase};
use super::types::{MerchantReply, TokenValidationRequest, TransactionRequest};
use crate::error::AppError;
use crate::errors::domain::{DomainError, MerchantErrorKind};

/// Outbound wallet calls. `url` and `case` come from the merchant-table
/// configuration snapshot.
#[async_trait]
pub trait MerchantGateway: Send + Sync {
    async fn transact(
        &self,
        url: &str,
        case: KeyCase,
        request: &TransactionRequest,
    ) -> Result<MerchantReply, AppError>;

    async fn validate_token(
        &self,
        url: &str,
        case: KeyCase,
        request: &TokenValidationRequest,
    ) -> Result<MerchantReply, AppError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone)]
pub struct HttpMerchant {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpMerchant {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("Unable to build merchant HTTP client: {e}")))?;
        Ok(Self { client, retry })
    }

    async fn post<T: Serialize + Sync>(
        &self,
        url: &str,
        case: KeyCase,
        payload: &T,
    ) -> Result<MerchantReply, AppError> {
        let Value::Object(body) = serde_json::to_value(payload)? else {
            return Err(DomainError::merchant(
                MerchantErrorKind::BadResponse,
                "Merchant payload must be an object",
            )
            .into());
        };
        let body = inflect_request(body, case);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.post(url).json(&body).send().await {
                Ok(resp) => {
                    let http_status = resp.status().as_u16();
                    let raw: Value = resp.json().await.map_err(|e| {
                        AppError::from(DomainError::merchant(
                            MerchantErrorKind::BadResponse,
                            format!("Merchant reply is not JSON: {e}"),
                        ))
                    })?;
                    let body = match raw {
                        Value::Object(map) => normalize_response(map),
                        _ => Map::new(),
                    };
                    debug!(url, http_status, attempt, "merchant replied");
                    return Ok(MerchantReply { http_status, body });
                }
                Err(err) if is_transient(&err) && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        url,
                        attempt,
                        retry_delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "merchant call failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "merchant unreachable");
                    return Err(DomainError::merchant(
                        MerchantErrorKind::Unavailable,
                        format!("Merchant unreachable: {err}"),
                    )
                    .into());
                }
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

#[async_trait]
impl MerchantGateway for HttpMerchant {
    async fn transact(
        &self,
        url: &str,
        case: KeyCase,
        request: &TransactionRequest,
    ) -> Result<MerchantReply, AppError> {
        self.post(url, case, request).await
    }

    async fn validate_token(
        &self,
        url: &str,
        case: KeyCase,
        request: &TokenValidationRequest,
    ) -> Result<MerchantReply, AppError> {
        self.post(url, case, request).await
    }
}
