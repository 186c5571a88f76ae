//! Typed access to JSON columns.

use sea_orm::entity::prelude::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

use crate::errors::domain::{DomainError, InfraErrorKind};

pub fn decode<T: DeserializeOwned>(value: Json, column: &'static str) -> Result<T, DomainError> {
    serde_json::from_value(value).map_err(|e| {
        error!(column, error = %e, "JSON column could not be decoded");
        DomainError::infra(
            InfraErrorKind::DataCorruption,
            format!("Stored {column} is corrupt"),
        )
    })
}

pub fn encode<T: Serialize>(value: &T, column: &'static str) -> Result<Json, DomainError> {
    serde_json::to_value(value).map_err(|e| {
        DomainError::infra(
            InfraErrorKind::DataCorruption,
            format!("Failed to encode {column}: {e}"),
        )
    })
}
