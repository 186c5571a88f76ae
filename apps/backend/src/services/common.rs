//! Lookups shared by the table services.

use crate::domain::ExternalKey;
use crate::error::AppError;
use crate::errors::domain::{DomainError, ValidationKind};
use crate::protocol::SessionContext;
use crate::repos::{PlayerIdentity, Round};
use crate::state::AppState;

pub fn require_player(session: &SessionContext) -> Result<&PlayerIdentity, AppError> {
    session.player.as_ref().ok_or_else(|| {
        DomainError::validation(ValidationKind::Other, "Player is not authorized").into()
    })
}

pub async fn require_open_round(state: &AppState, table_id: &str) -> Result<Round, AppError> {
    state.rounds.find_open(table_id).await?.ok_or_else(|| {
        DomainError::validation(ValidationKind::NoActiveRound, "There is no active round").into()
    })
}

/// Whole seconds from `now` until `deadline`, never negative.
pub fn seconds_left(deadline: Option<time::OffsetDateTime>, now: time::OffsetDateTime) -> i64 {
    deadline.map_or(0, |d| (d - now).whole_seconds().max(0))
}

/// Fresh id for one merchant transaction.
pub fn new_external_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Id for the single `key` transaction of one seat in `round`. Derived, not
/// random: every replay of the same deferred item sends the same id.
pub fn seat_external_id(round: &Round, seat_number: i16, key: ExternalKey) -> String {
    let name = format!(
        "{}:{}:{}:{}",
        round.round_code,
        round.id,
        seat_number,
        key.as_str()
    );
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
