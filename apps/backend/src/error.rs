use std::error::Error as StdError;

use thiserror::Error;

use crate::errors::domain::{
    ConflictKind, DomainError, InfraErrorKind, MerchantErrorKind, NotFoundKind, ValidationKind,
};
use crate::errors::ErrorCode;

/// Message sent to a connection when the failure is not the caller's fault.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong, please try again";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {detail}")]
    Validation { code: ErrorCode, detail: String },
    #[error("Not found: {detail}")]
    NotFound { code: ErrorCode, detail: String },
    #[error("Conflict: {detail}")]
    Conflict { code: ErrorCode, detail: String },
    #[error("Merchant error: {detail}")]
    Merchant { code: ErrorCode, detail: String },
    #[error("Database error: {detail}")]
    Db { code: ErrorCode, detail: String },
    #[error("Internal error: {detail}")]
    Internal {
        code: ErrorCode,
        detail: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl AppError {
    /// Error code of any variant
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Merchant { code, .. }
            | AppError::Db { code, .. }
            | AppError::Internal { code, .. } => *code,
            AppError::Config { .. } => ErrorCode::ConfigError,
        }
    }

    /// Human-readable detail of any variant
    pub fn detail(&self) -> String {
        match self {
            AppError::Validation { detail, .. }
            | AppError::NotFound { detail, .. }
            | AppError::Conflict { detail, .. }
            | AppError::Merchant { detail, .. }
            | AppError::Db { detail, .. }
            | AppError::Internal { detail, .. }
            | AppError::Config { detail } => detail.clone(),
        }
    }

    /// True for errors caused by the caller's own input (reported verbatim).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. } | AppError::Conflict { .. } | AppError::NotFound { .. }
        )
    }

    /// Text for the outbound `error{message}` event.
    pub fn user_message(&self) -> String {
        if self.is_user_facing() {
            self.detail()
        } else {
            GENERIC_ERROR_MESSAGE.to_string()
        }
    }

    /// Whether a deferred task failing with this error should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Db { code, .. } => *code == ErrorCode::DbUnavailable,
            AppError::Merchant { code, .. } => *code == ErrorCode::MerchantUnavailable,
            AppError::Conflict { code, .. } => *code == ErrorCode::OptimisticLock,
            AppError::Internal { code, .. } => *code == ErrorCode::CacheError,
            _ => false,
        }
    }

    pub fn invalid(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Validation {
            code,
            detail: detail.into(),
        }
    }

    pub fn not_found(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            detail: detail.into(),
        }
    }

    pub fn conflict(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            detail: detail.into(),
        }
    }

    pub fn internal<E>(code: ErrorCode, detail: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Internal {
            code,
            detail: detail.into(),
            source: Box::new(source),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }
}

impl From<ValidationKind> for ErrorCode {
    fn from(kind: ValidationKind) -> Self {
        match kind {
            ValidationKind::InvalidCard => ErrorCode::InvalidCard,
            ValidationKind::InvalidSeat => ErrorCode::InvalidSeat,
            ValidationKind::InvalidBetKind => ErrorCode::InvalidBetKind,
            ValidationKind::InvalidAmount => ErrorCode::InvalidAmount,
            ValidationKind::BetLimit => ErrorCode::BetLimit,
            ValidationKind::SideBetLimit => ErrorCode::SideBetLimit,
            ValidationKind::InsufficientFunds => ErrorCode::InsufficientFunds,
            ValidationKind::BettingClosed => ErrorCode::BettingClosed,
            ValidationKind::BettingOpen => ErrorCode::BettingOpen,
            ValidationKind::InsuranceOpen => ErrorCode::InsuranceOpen,
            ValidationKind::NoActiveRound => ErrorCode::NoActiveRound,
            ValidationKind::NoBet => ErrorCode::NoBet,
            ValidationKind::RepeatUnavailable => ErrorCode::RepeatUnavailable,
            ValidationKind::OutOfTurn => ErrorCode::OutOfTurn,
            ValidationKind::DecisionExpired => ErrorCode::DecisionExpired,
            ValidationKind::ActionNotAllowed => ErrorCode::ActionNotAllowed,
            ValidationKind::PhaseMismatch => ErrorCode::PhaseMismatch,
            ValidationKind::Other => ErrorCode::ValidationError,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(kind, detail) => AppError::Validation {
                code: kind.into(),
                detail,
            },
            DomainError::Conflict(kind, detail) => {
                let code = match kind {
                    ConflictKind::SeatTaken => ErrorCode::SeatTaken,
                    ConflictKind::SeatLocked => ErrorCode::SeatLocked,
                    ConflictKind::OptimisticLock => ErrorCode::OptimisticLock,
                    ConflictKind::Other(_) => ErrorCode::Conflict,
                };
                AppError::Conflict { code, detail }
            }
            DomainError::NotFound(kind, detail) => {
                let code = match kind {
                    NotFoundKind::Round => ErrorCode::RoundNotFound,
                    NotFoundKind::PlayerRound => ErrorCode::PlayerRoundNotFound,
                    NotFoundKind::Table => ErrorCode::TableNotFound,
                    NotFoundKind::Merchant => ErrorCode::MerchantNotFound,
                    NotFoundKind::Other(_) => ErrorCode::NotFound,
                };
                AppError::NotFound { code, detail }
            }
            DomainError::Merchant(kind, detail) => {
                let code = match kind {
                    MerchantErrorKind::Rejected => ErrorCode::MerchantRejected,
                    MerchantErrorKind::BadResponse => ErrorCode::MerchantBadResponse,
                    MerchantErrorKind::Unavailable => ErrorCode::MerchantUnavailable,
                };
                AppError::Merchant { code, detail }
            }
            DomainError::Infra(kind, detail) => match kind {
                InfraErrorKind::DbUnavailable | InfraErrorKind::Timeout => AppError::Db {
                    code: ErrorCode::DbUnavailable,
                    detail,
                },
                InfraErrorKind::DataCorruption => AppError::Db {
                    code: ErrorCode::DataCorruption,
                    detail,
                },
                InfraErrorKind::CacheUnavailable => AppError::internal(
                    ErrorCode::CacheError,
                    detail.clone(),
                    DomainError::Infra(InfraErrorKind::CacheUnavailable, detail),
                ),
                InfraErrorKind::Other(_) => AppError::Db {
                    code: ErrorCode::DbError,
                    detail,
                },
            },
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(e: sea_orm::DbErr) -> Self {
        crate::infra::db_errors::map_db_err(e).into()
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::internal(ErrorCode::CacheError, "Shared cache operation failed", e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::internal(ErrorCode::DataCorruption, "Failed to decode stored JSON", e)
    }
}

impl From<std::env::VarError> for AppError {
    fn from(e: std::env::VarError) -> Self {
        AppError::config(format!("env var error: {e}"))
    }
}
