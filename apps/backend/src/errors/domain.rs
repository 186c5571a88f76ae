//! Domain-level error type used across services and adapters.
//!
//! This error type is transport- and DB-agnostic. Services return
//! `Result<T, crate::error::AppError>` and convert from `DomainError`
//! using the provided `From<DomainError> for AppError` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Infra error kinds to distinguish operational failures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InfraErrorKind {
    Timeout,
    DbUnavailable,
    CacheUnavailable,
    DataCorruption,
    Other(String),
}

/// Domain-level not found entities
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    Round,
    PlayerRound,
    Table,
    Merchant,
    Other(String),
}

/// Domain-level conflict kinds
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    SeatTaken,
    SeatLocked,
    OptimisticLock,
    Other(String),
}

/// Validation failures caused by the player or dealer input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationKind {
    InvalidCard,
    InvalidSeat,
    InvalidBetKind,
    InvalidAmount,
    BetLimit,
    SideBetLimit,
    InsufficientFunds,
    BettingClosed,
    BettingOpen,
    InsuranceOpen,
    NoActiveRound,
    NoBet,
    RepeatUnavailable,
    OutOfTurn,
    DecisionExpired,
    ActionNotAllowed,
    PhaseMismatch,
    Other,
}

/// Merchant (wallet) call failures
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MerchantErrorKind {
    /// Merchant answered but refused the transaction.
    Rejected,
    /// Non-200 response or undecodable body.
    BadResponse,
    /// Transport failure after retries.
    Unavailable,
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input/user validation or business rule violation
    Validation(ValidationKind, String),
    /// Semantic conflict
    Conflict(ConflictKind, String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
    /// External wallet failure
    Merchant(MerchantErrorKind, String),
    /// Infrastructure/operational failures
    Infra(InfraErrorKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(kind, d) => write!(f, "validation error {kind:?}: {d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
            DomainError::Merchant(kind, d) => write!(f, "merchant {kind:?}: {d}"),
            DomainError::Infra(kind, d) => write!(f, "infra {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(kind: ValidationKind, detail: impl Into<String>) -> Self {
        Self::Validation(kind, detail.into())
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }
    pub fn merchant(kind: MerchantErrorKind, detail: impl Into<String>) -> Self {
        Self::Merchant(kind, detail.into())
    }
    pub fn infra(kind: InfraErrorKind, detail: impl Into<String>) -> Self {
        Self::Infra(kind, detail.into())
    }

    /// Shorthand for the most common case: a plain message for the caller.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::Validation(ValidationKind::Other, detail.into())
    }

    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, DomainError::Conflict(ConflictKind::OptimisticLock, _))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_detail() {
        let err = DomainError::validation(ValidationKind::InvalidAmount, "Unsupported amount");
        assert_eq!(
            err.to_string(),
            "validation error InvalidAmount: Unsupported amount"
        );
    }

    #[test]
    fn optimistic_lock_detection() {
        assert!(DomainError::conflict(ConflictKind::OptimisticLock, "x").is_optimistic_lock());
        assert!(!DomainError::conflict(ConflictKind::SeatTaken, "x").is_optimistic_lock());
    }
}
