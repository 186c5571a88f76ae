//! In-memory wallet standing in for a merchant's HTTP endpoints.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use blackjack_backend::error::AppError;
use blackjack_backend::errors::domain::{DomainError, MerchantErrorKind};
use blackjack_backend::merchant::{
    KeyCase, MerchantGateway, MerchantReply, TokenValidationRequest, TransactionRequest,
    TransactionType,
};

/// How the next wallet calls are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Accept,
    /// HTTP 200 with a failed status and the current balance.
    Refuse,
    /// Transport failure; retryable.
    Unavailable,
}

#[derive(Debug)]
pub struct FakeMerchant {
    balance: Mutex<f64>,
    answer: Mutex<Answer>,
    calls: Mutex<Vec<(String, TransactionRequest)>>,
    user_name: String,
}

impl FakeMerchant {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: Mutex::new(balance),
            answer: Mutex::new(Answer::Accept),
            calls: Mutex::new(Vec::new()),
            user_name: "Player".to_string(),
        }
    }

    pub fn answer_with(&self, answer: Answer) {
        *self.answer.lock() = answer;
    }

    pub fn set_balance(&self, balance: f64) {
        *self.balance.lock() = balance;
    }

    pub fn balance(&self) -> f64 {
        *self.balance.lock()
    }

    pub fn calls(&self) -> Vec<(String, TransactionRequest)> {
        self.calls.lock().clone()
    }

    pub fn calls_of(&self, kind: TransactionType) -> Vec<TransactionRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, r)| r.transaction_type == kind)
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn reply(status: &str, balance: f64) -> MerchantReply {
        let Value::Object(body) = json!({ "status": status, "total_balance": balance }) else {
            unreachable!()
        };
        MerchantReply {
            http_status: 200,
            body,
        }
    }

    fn unavailable() -> AppError {
        DomainError::merchant(MerchantErrorKind::Unavailable, "merchant is down").into()
    }
}

#[async_trait]
impl MerchantGateway for FakeMerchant {
    async fn transact(
        &self,
        url: &str,
        _case: KeyCase,
        request: &TransactionRequest,
    ) -> Result<MerchantReply, AppError> {
        let answer = *self.answer.lock();
        if answer == Answer::Unavailable {
            return Err(Self::unavailable());
        }
        self.calls.lock().push((url.to_string(), request.clone()));

        let mut balance = self.balance.lock();
        if answer == Answer::Refuse {
            return Ok(Self::reply("failed", *balance));
        }
        match request.transaction_type {
            TransactionType::Bet => {
                if request.amount > *balance {
                    return Ok(Self::reply("failed", *balance));
                }
                *balance -= request.amount;
            }
            TransactionType::Win | TransactionType::Rollback => *balance += request.amount,
        }
        Ok(Self::reply("OK", *balance))
    }

    async fn validate_token(
        &self,
        _url: &str,
        _case: KeyCase,
        request: &TokenValidationRequest,
    ) -> Result<MerchantReply, AppError> {
        match *self.answer.lock() {
            Answer::Unavailable => Err(Self::unavailable()),
            Answer::Refuse => Ok(Self::reply("failed", 0.0)),
            Answer::Accept => {
                let mut body = Map::new();
                body.insert("status".into(), json!("ok"));
                body.insert("total_balance".into(), json!(*self.balance.lock()));
                body.insert("user_id".into(), json!(request.launch_token.clone()));
                body.insert("user_name".into(), json!(self.user_name.clone()));
                Ok(MerchantReply {
                    http_status: 200,
                    body,
                })
            }
        }
    }
}
