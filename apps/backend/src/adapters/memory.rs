//! In-process record store used by tests and single-node runs.
//!
//! Mirrors the relational adapters: version-checked updates, one row per
//! (round, seat) and at most one open round per table.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use time::OffsetDateTime;

use crate::domain::InsuranceDecision;
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind};
use crate::repos::player_rounds::{NewPlayerRound, PlayerRound, PlayerRoundRepo};
use crate::repos::rounds::{Round, RoundCreate, RoundRepo};
use crate::repos::tables::{MerchantConfig, TableConfig, TableRepo};

#[derive(Default)]
struct Inner {
    next_round_id: i64,
    next_player_round_id: i64,
    rounds: BTreeMap<i64, Round>,
    player_rounds: BTreeMap<i64, PlayerRound>,
    tables: BTreeMap<String, TableConfig>,
    merchants: BTreeMap<(String, String), MerchantConfig>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn version_conflict(expected: i32, actual: i32) -> DomainError {
    DomainError::conflict(
        ConflictKind::OptimisticLock,
        format!(
            "Record was modified concurrently (expected version {expected}, actual version {actual})"
        ),
    )
}

#[async_trait]
impl RoundRepo for MemoryStore {
    async fn find_by_id(&self, round_id: i64) -> Result<Option<Round>, DomainError> {
        Ok(self.inner.read().rounds.get(&round_id).cloned())
    }

    async fn find_open(&self, table_id: &str) -> Result<Option<Round>, DomainError> {
        Ok(self
            .inner
            .read()
            .rounds
            .values()
            .rev()
            .find(|r| r.table_id == table_id && !r.finished)
            .cloned())
    }

    async fn find_successor(&self, prev_round_id: i64) -> Result<Option<Round>, DomainError> {
        Ok(self
            .inner
            .read()
            .rounds
            .values()
            .find(|r| r.prev_round_id == Some(prev_round_id))
            .cloned())
    }

    async fn create(&self, dto: RoundCreate) -> Result<Round, DomainError> {
        let mut inner = self.inner.write();
        if inner
            .rounds
            .values()
            .any(|r| r.table_id == dto.table_id && !r.finished)
        {
            return Err(DomainError::conflict(
                ConflictKind::Other("OpenRound".into()),
                "Table already has an open round",
            ));
        }
        inner.next_round_id += 1;
        let now = OffsetDateTime::now_utc();
        let round = Round {
            id: inner.next_round_id,
            table_id: dto.table_id,
            round_code: dto.round_code,
            dealer_cards: Vec::new(),
            card_count: 0,
            betting_deadline: None,
            insurance_deadline: None,
            finished: false,
            finished_dealing: false,
            show_dealer_cards: false,
            was_reset: false,
            prev_round_id: dto.prev_round_id,
            dealer_name: dto.dealer_name,
            created_at: now,
            updated_at: now,
            lock_version: 1,
        };
        inner.rounds.insert(round.id, round.clone());
        Ok(round)
    }

    async fn update_if_version(&self, round: &Round) -> Result<Round, DomainError> {
        let mut inner = self.inner.write();
        let stored = inner.rounds.get_mut(&round.id).ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Round, format!("Round {} not found", round.id))
        })?;
        if stored.lock_version != round.lock_version {
            return Err(version_conflict(round.lock_version, stored.lock_version));
        }
        let mut next = round.clone();
        next.table_id = stored.table_id.clone();
        next.round_code = stored.round_code.clone();
        next.prev_round_id = stored.prev_round_id;
        next.created_at = stored.created_at;
        next.updated_at = OffsetDateTime::now_utc();
        next.lock_version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn finish_open(&self, table_id: &str) -> Result<u64, DomainError> {
        let mut inner = self.inner.write();
        let mut touched = 0;
        for round in inner
            .rounds
            .values_mut()
            .filter(|r| r.table_id == table_id && !r.finished)
        {
            round.finished = true;
            round.lock_version += 1;
            round.updated_at = OffsetDateTime::now_utc();
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl PlayerRoundRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<PlayerRound>, DomainError> {
        Ok(self.inner.read().player_rounds.get(&id).cloned())
    }

    async fn find_by_seat(
        &self,
        round_id: i64,
        seat_number: i16,
    ) -> Result<Option<PlayerRound>, DomainError> {
        Ok(self
            .inner
            .read()
            .player_rounds
            .values()
            .find(|p| p.round_id == round_id && p.seat_number == seat_number)
            .cloned())
    }

    async fn list_by_round(&self, round_id: i64) -> Result<Vec<PlayerRound>, DomainError> {
        let mut seats: Vec<PlayerRound> = self
            .inner
            .read()
            .player_rounds
            .values()
            .filter(|p| p.round_id == round_id)
            .cloned()
            .collect();
        seats.sort_by_key(|p| p.seat_number);
        Ok(seats)
    }

    async fn list_open_by_identity(
        &self,
        table_id: &str,
        user_id: &str,
        merchant_id: &str,
    ) -> Result<Vec<PlayerRound>, DomainError> {
        let mut seats: Vec<PlayerRound> = self
            .inner
            .read()
            .player_rounds
            .values()
            .filter(|p| p.table_id == table_id && !p.archived && p.is_owned_by(user_id, merchant_id))
            .cloned()
            .collect();
        seats.sort_by_key(|p| p.seat_number);
        Ok(seats)
    }

    async fn find_current_turn(&self, round_id: i64) -> Result<Option<PlayerRound>, DomainError> {
        Ok(self
            .inner
            .read()
            .player_rounds
            .values()
            .find(|p| p.round_id == round_id && p.is_player_turn)
            .cloned())
    }

    async fn insert(&self, dto: NewPlayerRound) -> Result<PlayerRound, DomainError> {
        let mut inner = self.inner.write();
        if inner
            .player_rounds
            .values()
            .any(|p| p.round_id == dto.round_id && p.seat_number == dto.seat_number)
        {
            return Err(DomainError::conflict(
                ConflictKind::SeatTaken,
                "Seat is already taken",
            ));
        }
        inner.next_player_round_id += 1;
        let now = OffsetDateTime::now_utc();
        let player = PlayerRound {
            id: inner.next_player_round_id,
            round_id: dto.round_id,
            table_id: dto.table_id,
            seat_number: dto.seat_number,
            identity: dto.identity,
            connection_id: dto.connection_id,
            cards: dto.cards,
            bets: dto.bets,
            total_bet: dto.total_bet,
            insurance_amount: 0.0,
            actions: Vec::new(),
            is_player_turn: false,
            is_making_decision: false,
            finished_turn: false,
            decision_deadline: None,
            last_action: dto.last_action,
            insurance: InsuranceDecision::Undecided,
            external_ids: dto.external_ids,
            balance: dto.balance,
            winning_amount: 0.0,
            archived: false,
            rejected: false,
            is_reset: false,
            is_active: true,
            detail: None,
            inactivity_check_at: None,
            created_at: now,
            updated_at: now,
            lock_version: 1,
        };
        inner.player_rounds.insert(player.id, player.clone());
        Ok(player)
    }

    async fn update_if_version(&self, player: &PlayerRound) -> Result<PlayerRound, DomainError> {
        let mut inner = self.inner.write();
        let stored = inner.player_rounds.get_mut(&player.id).ok_or_else(|| {
            DomainError::not_found(
                NotFoundKind::PlayerRound,
                format!("Player round {} not found", player.id),
            )
        })?;
        if stored.lock_version != player.lock_version {
            return Err(version_conflict(player.lock_version, stored.lock_version));
        }
        let mut next = player.clone();
        next.round_id = stored.round_id;
        next.table_id = stored.table_id.clone();
        next.seat_number = stored.seat_number;
        next.created_at = stored.created_at;
        next.updated_at = OffsetDateTime::now_utc();
        next.lock_version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn sum_total_bet(
        &self,
        round_id: i64,
        user_id: &str,
        merchant_id: &str,
    ) -> Result<f64, DomainError> {
        Ok(self
            .inner
            .read()
            .player_rounds
            .values()
            .filter(|p| p.round_id == round_id && p.is_owned_by(user_id, merchant_id))
            .map(|p| p.total_bet)
            .sum())
    }
}

#[async_trait]
impl TableRepo for MemoryStore {
    async fn find_table(&self, table_id: &str) -> Result<Option<TableConfig>, DomainError> {
        Ok(self.inner.read().tables.get(table_id).cloned())
    }

    async fn list_tables(&self) -> Result<Vec<TableConfig>, DomainError> {
        Ok(self.inner.read().tables.values().cloned().collect())
    }

    async fn find_merchant_config(
        &self,
        merchant_id: &str,
        table_id: &str,
    ) -> Result<Option<MerchantConfig>, DomainError> {
        Ok(self
            .inner
            .read()
            .merchants
            .get(&(merchant_id.to_string(), table_id.to_string()))
            .cloned())
    }

    async fn list_merchant_configs(
        &self,
        table_id: &str,
    ) -> Result<Vec<MerchantConfig>, DomainError> {
        Ok(self
            .inner
            .read()
            .merchants
            .values()
            .filter(|m| m.table_id == table_id && m.is_active)
            .cloned()
            .collect())
    }

    async fn upsert_table(&self, table: &TableConfig) -> Result<(), DomainError> {
        self.inner
            .write()
            .tables
            .insert(table.id.clone(), table.clone());
        Ok(())
    }

    async fn upsert_merchant_config(&self, config: &MerchantConfig) -> Result<(), DomainError> {
        self.inner.write().merchants.insert(
            (config.merchant_id.clone(), config.table_id.clone()),
            config.clone(),
        );
        Ok(())
    }
}
