//! Wallet call payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::domain::{DomainError, MerchantErrorKind};

pub const CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Bet,
    Win,
    Rollback,
}

/// One wallet transaction. Keys are snake_case here and inflected on the
/// way out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub token: String,
    pub amount: f64,
    pub currency: String,
    pub game_id: String,
    pub round_id: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bet_external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_external_id: Option<String>,
    pub hash: String,
    pub transaction_type: TransactionType,
}

impl TransactionRequest {
    pub fn new(
        transaction_type: TransactionType,
        token: impl Into<String>,
        amount: f64,
        table_id: impl Into<String>,
        round_id: i64,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            amount,
            currency: CURRENCY.to_string(),
            game_id: table_id.into(),
            round_id: round_id.to_string(),
            external_id: external_id.into(),
            bet_external_id: None,
            canceled_external_id: None,
            hash: String::new(),
            transaction_type,
        }
    }

    pub fn with_bet_external_id(mut self, id: Option<String>) -> Self {
        self.bet_external_id = id;
        self
    }

    pub fn with_canceled_external_id(mut self, id: impl Into<String>) -> Self {
        self.canceled_external_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenValidationRequest {
    pub launch_token: String,
    pub request_scope: String,
}

impl TokenValidationRequest {
    pub fn new(launch_token: impl Into<String>) -> Self {
        Self {
            launch_token: launch_token.into(),
            request_scope: "country".to_string(),
        }
    }
}

/// Merchant answer with keys already normalised to snake case.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantReply {
    pub http_status: u16,
    pub body: Map<String, Value>,
}

impl MerchantReply {
    pub fn status(&self) -> Option<&str> {
        self.body.get("status").and_then(Value::as_str)
    }

    /// HTTP 200 and `status` equal to "ok" in any case.
    pub fn is_ok(&self) -> bool {
        self.http_status == 200 && self.status().is_some_and(|s| s.eq_ignore_ascii_case("ok"))
    }

    pub fn total_balance(&self) -> Option<f64> {
        match self.body.get("total_balance")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn str_field(&self, key: &str) -> Option<String> {
        match self.body.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// The new balance of an accepted transaction.
    pub fn accepted_balance(&self) -> Result<f64, DomainError> {
        if !self.is_ok() {
            return Err(DomainError::merchant(
                MerchantErrorKind::Rejected,
                format!(
                    "Merchant refused the transaction (http {}, status {:?})",
                    self.http_status,
                    self.status()
                ),
            ));
        }
        self.total_balance().ok_or_else(|| {
            DomainError::merchant(
                MerchantErrorKind::BadResponse,
                "Merchant reply has no total_balance",
            )
        })
    }
}

/// Player details returned by a successful token validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlayer {
    pub user_id: String,
    pub user_name: String,
    pub total_balance: f64,
}

impl TryFrom<&MerchantReply> for ValidatedPlayer {
    type Error = DomainError;

    fn try_from(reply: &MerchantReply) -> Result<Self, Self::Error> {
        let total_balance = reply.accepted_balance()?;
        let missing = |field: &str| {
            DomainError::merchant(
                MerchantErrorKind::BadResponse,
                format!("Token validation reply has no {field}"),
            )
        };
        Ok(Self {
            user_id: reply.str_field("user_id").ok_or_else(|| missing("user_id"))?,
            user_name: reply
                .str_field("user_name")
                .ok_or_else(|| missing("user_name"))?,
            total_balance,
        })
    }
}
