//! Merchant wallet integration.

pub mod client;
pub mod inflection;
pub mod types;

pub use client::{HttpMerchant, MerchantGateway, RetryPolicy};
pub use inflection::KeyCase;
pub use types::{
    MerchantReply, TokenValidationRequest, TransactionRequest, TransactionType, ValidatedPlayer,
};
