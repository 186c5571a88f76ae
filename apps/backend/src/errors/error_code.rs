//! Error codes for the blackjack table engine.
//!
//! Add new codes here; never pass ad-hoc strings as error codes.
//!
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in logs and in outbound `error` events.

use core::fmt;

/// Centralized error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Player / dealer input validation
    /// Card token is not `<deck><rank><suit>`
    InvalidCard,
    /// Seat outside the table layout
    InvalidSeat,
    /// Unknown bet kind
    InvalidBetKind,
    /// Non-positive or malformed amount
    InvalidAmount,
    /// Bet above max or below min
    BetLimit,
    /// Side bet above the primary bet or the table cap
    SideBetLimit,
    /// Cached balance cannot cover the operation
    InsufficientFunds,
    /// Betting window already closed
    BettingClosed,
    /// Betting window still open
    BettingOpen,
    /// Insurance window still open
    InsuranceOpen,
    /// No open round on the table
    NoActiveRound,
    /// Nothing to roll back or act upon
    NoBet,
    /// Repeat data missing or already applied
    RepeatUnavailable,
    /// Acting player is not the one deciding
    OutOfTurn,
    /// Decision deadline passed
    DecisionExpired,
    /// Action not legal for the hand
    ActionNotAllowed,
    /// Operation not valid in the current round phase
    PhaseMismatch,
    /// Generic validation failure
    ValidationError,

    // Resource Not Found
    /// Round does not exist
    RoundNotFound,
    /// Seat participation does not exist
    PlayerRoundNotFound,
    /// Table does not exist
    TableNotFound,
    /// Merchant is not configured for the table
    MerchantNotFound,
    /// Generic not found
    NotFound,

    // Conflicts
    /// Seat held by another identity
    SeatTaken,
    /// Seat held by another identity in the previous round
    SeatLocked,
    /// Version-checked update lost the race
    OptimisticLock,
    /// Generic conflict
    Conflict,

    // External wallet
    /// Merchant refused the transaction
    MerchantRejected,
    /// Merchant returned a non-200 status or a malformed body
    MerchantBadResponse,
    /// Merchant unreachable after retries
    MerchantUnavailable,

    // System Errors
    /// Database error
    DbError,
    /// Database unreachable
    DbUnavailable,
    /// Shared cache error
    CacheError,
    /// Realtime publish failed
    PublishError,
    /// Deferred task could not be scheduled or decoded
    TaskError,
    /// Stored data could not be decoded
    DataCorruption,
    /// Internal error
    Internal,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCard => "INVALID_CARD",
            Self::InvalidSeat => "INVALID_SEAT",
            Self::InvalidBetKind => "INVALID_BET_KIND",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::BetLimit => "BET_LIMIT",
            Self::SideBetLimit => "SIDE_BET_LIMIT",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::BettingClosed => "BETTING_CLOSED",
            Self::BettingOpen => "BETTING_OPEN",
            Self::InsuranceOpen => "INSURANCE_OPEN",
            Self::NoActiveRound => "NO_ACTIVE_ROUND",
            Self::NoBet => "NO_BET",
            Self::RepeatUnavailable => "REPEAT_UNAVAILABLE",
            Self::OutOfTurn => "OUT_OF_TURN",
            Self::DecisionExpired => "DECISION_EXPIRED",
            Self::ActionNotAllowed => "ACTION_NOT_ALLOWED",
            Self::PhaseMismatch => "PHASE_MISMATCH",
            Self::ValidationError => "VALIDATION_ERROR",

            Self::RoundNotFound => "ROUND_NOT_FOUND",
            Self::PlayerRoundNotFound => "PLAYER_ROUND_NOT_FOUND",
            Self::TableNotFound => "TABLE_NOT_FOUND",
            Self::MerchantNotFound => "MERCHANT_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::SeatTaken => "SEAT_TAKEN",
            Self::SeatLocked => "SEAT_LOCKED",
            Self::OptimisticLock => "OPTIMISTIC_LOCK",
            Self::Conflict => "CONFLICT",

            Self::MerchantRejected => "MERCHANT_REJECTED",
            Self::MerchantBadResponse => "MERCHANT_BAD_RESPONSE",
            Self::MerchantUnavailable => "MERCHANT_UNAVAILABLE",

            Self::DbError => "DB_ERROR",
            Self::DbUnavailable => "DB_UNAVAILABLE",
            Self::CacheError => "CACHE_ERROR",
            Self::PublishError => "PUBLISH_ERROR",
            Self::TaskError => "TASK_ERROR",
            Self::DataCorruption => "DATA_CORRUPTION",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
