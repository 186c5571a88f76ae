//! One table on an in-memory engine: store, cache, clock, publisher,
//! scheduler and merchant are all fakes the test can inspect and drive.

use std::sync::Arc;

use time::macros::datetime;

use blackjack_backend::adapters::MemoryStore;
use blackjack_backend::cache::MemoryCache;
use blackjack_backend::config::EngineConfig;
use blackjack_backend::domain::DealOrder;
use blackjack_backend::error::AppError;
use blackjack_backend::merchant::KeyCase;
use blackjack_backend::protocol::{SessionContext, TurnCommand};
use blackjack_backend::realtime::RecordingPublisher;
use blackjack_backend::repos::{MerchantConfig, PlayerIdentity, PlayerRound, Round, TableConfig, TableRepo};
use blackjack_backend::services::clock::ManualClock;
use blackjack_backend::services::{wallet, EngineTasks, GameFlowService, LedgerService};
use blackjack_backend::state::AppState;
use blackjack_backend::tasks::TaskExecutor;

use super::fake_merchant::FakeMerchant;
use super::recording_scheduler::RecordingScheduler;

pub const TABLE: &str = "table-1";
pub const MERCHANT: &str = "m1";
pub const DEALER_CONN: &str = "dealer-conn";

pub struct TestTable {
    pub state: AppState,
    pub merchant: Arc<FakeMerchant>,
    pub scheduler: Arc<RecordingScheduler>,
    pub publisher: Arc<RecordingPublisher>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

pub fn merchant_config() -> MerchantConfig {
    MerchantConfig {
        merchant_id: MERCHANT.to_string(),
        table_id: TABLE.to_string(),
        min_bet: 1.0,
        max_bet: 500.0,
        bet_range: vec![1.0, 5.0, 25.0, 100.0],
        decision_time_secs: 15,
        bet_url: "http://merchant.test/bet".to_string(),
        win_url: "http://merchant.test/win".to_string(),
        rollback_url: "http://merchant.test/rollback".to_string(),
        validate_token_url: "http://merchant.test/validate".to_string(),
        schema_type: KeyCase::Snake,
        is_active: true,
    }
}

pub fn identity(user: &str) -> PlayerIdentity {
    PlayerIdentity {
        user_id: user.to_string(),
        merchant_id: MERCHANT.to_string(),
        user_name: format!("{user}-name"),
        user_token: format!("tok-{user}"),
        player_id: format!("{user}{MERCHANT}"),
    }
}

pub fn seat_key(user: &str) -> String {
    identity(user).key()
}

impl TestTable {
    pub async fn new() -> Self {
        Self::with_order(DealOrder::SequentialHoleCard).await
    }

    pub async fn with_order(deal_order: DealOrder) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut table = TableConfig::new(TABLE, "Table One");
        table.deal_order = deal_order;
        store.upsert_table(&table).await.unwrap();
        store.upsert_merchant_config(&merchant_config()).await.unwrap();

        let merchant = Arc::new(FakeMerchant::new(1_000.0));
        let scheduler = Arc::new(RecordingScheduler::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let clock = Arc::new(ManualClock::new(datetime!(2026-03-01 18:00 UTC)));

        let state = AppState::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MemoryCache::new()),
            merchant.clone(),
            publisher.clone(),
            scheduler.clone(),
            clock.clone(),
            EngineConfig::default(),
        );
        GameFlowService::new()
            .ensure_open_round(&state, TABLE)
            .await
            .unwrap();

        Self {
            state,
            merchant,
            scheduler,
            publisher,
            clock,
            store,
        }
    }

    pub fn session(&self, user: &str) -> SessionContext {
        SessionContext::player(format!("conn-{user}"), TABLE, identity(user))
    }

    pub fn dealer(&self) -> SessionContext {
        SessionContext::dealer(DEALER_CONN, TABLE)
    }

    /// Cache a balance for `user` as a token validation would.
    pub async fn fund(&self, user: &str, balance: f64) {
        wallet::resync(&self.state, &seat_key(user), balance)
            .await
            .unwrap();
    }

    pub async fn balance(&self, user: &str) -> f64 {
        wallet::balance(&self.state, &seat_key(user)).await.unwrap()
    }

    pub async fn bet(&self, user: &str, seat: i16, amount: f64) -> Result<(), AppError> {
        LedgerService::new()
            .place_bet(&self.state, &self.session(user), seat, "primary", amount)
            .await
            .map(drop)
    }

    pub async fn side_bet(
        &self,
        user: &str,
        seat: i16,
        kind: &str,
        amount: f64,
    ) -> Result<(), AppError> {
        LedgerService::new()
            .place_bet(&self.state, &self.session(user), seat, kind, amount)
            .await
            .map(drop)
    }

    pub async fn act(&self, user: &str, seat: i16, command: TurnCommand) -> Result<(), AppError> {
        GameFlowService::new()
            .make_action(&self.state, &self.session(user), seat, command)
            .await
    }

    pub async fn insure(&self, user: &str, seat: i16, take: bool) -> Result<(), AppError> {
        GameFlowService::new()
            .make_insurance(&self.state, &self.session(user), seat, take)
            .await
    }

    /// Move the clock past the betting deadline.
    pub fn close_betting(&self) {
        let window = self.state.config.betting_window.as_secs() as i64;
        self.clock.advance(time::Duration::seconds(window + 1));
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(time::Duration::seconds(secs));
    }

    pub async fn scan(&self, card: &str) -> Result<(), AppError> {
        GameFlowService::new()
            .scan_card(&self.state, &self.dealer(), card)
            .await
    }

    pub async fn scan_all(&self, cards: &[&str]) {
        for card in cards {
            self.scan(card)
                .await
                .unwrap_or_else(|e| panic!("scan {card} failed: {e}"));
        }
    }

    pub async fn scan_dealer(&self, card: &str) -> Result<(), AppError> {
        GameFlowService::new()
            .scan_dealer_card(&self.state, &self.dealer(), card)
            .await
    }

    pub async fn open_round(&self) -> Round {
        self.state.rounds.find_open(TABLE).await.unwrap().unwrap()
    }

    pub async fn round(&self, round_id: i64) -> Round {
        self.state.rounds.find_by_id(round_id).await.unwrap().unwrap()
    }

    pub async fn seat(&self, round_id: i64, seat: i16) -> PlayerRound {
        self.state
            .players
            .find_by_seat(round_id, seat)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no row for seat {seat}"))
    }

    /// Fire every queued task with `name`, in the order queued.
    pub async fn run(&self, name: &str) -> Vec<Result<(), AppError>> {
        let executor = EngineTasks::new(self.state.clone());
        let mut results = Vec::new();
        for scheduled in self.scheduler.take_named(name) {
            results.push(executor.execute(scheduled.task).await);
        }
        results
    }

    /// Fire queued tasks and require each to succeed.
    pub async fn run_ok(&self, name: &str) -> usize {
        let results = self.run(name).await;
        for result in &results {
            if let Err(e) = result {
                panic!("{name} failed: {e}");
            }
        }
        results.len()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.publisher.names()
    }
}
