use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{MemoryStore, PlayerRoundRepoSea, RoundRepoSea, TableRepoSea};
use crate::cache::{MemoryCache, RedisCache, SharedCache};
use crate::config::db::{redis_url, DbKind};
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::merchant::{HttpMerchant, MerchantGateway, RetryPolicy};
use crate::realtime::{EventPublisher, RecordingPublisher, RedisPublisher};
use crate::repos::{PlayerRoundRepo, RoundRepo, TableRepo};
use crate::services::clock::{Clock, SystemClock};
use crate::state::app_state::AppState;
use crate::tasks::TaskScheduler;

const MERCHANT_TIMEOUT: Duration = Duration::from_secs(10);

enum StoreChoice {
    Memory,
    Db(DbKind),
}

enum BackendChoice {
    Memory,
    Redis,
}

/// Builder for [`AppState`], used by `main` and by tests.
pub struct StateBuilder {
    store: StoreChoice,
    backend: BackendChoice,
    config: Option<EngineConfig>,
    merchant: Option<Arc<dyn MerchantGateway>>,
    publisher: Option<Arc<dyn EventPublisher>>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
    clock: Option<Arc<dyn Clock>>,
    cache: Option<Arc<dyn SharedCache>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            store: StoreChoice::Memory,
            backend: BackendChoice::Memory,
            config: None,
            merchant: None,
            publisher: None,
            scheduler: None,
            clock: None,
            cache: None,
        }
    }

    pub fn with_db(mut self, kind: DbKind) -> Self {
        self.store = StoreChoice::Db(kind);
        self
    }

    /// Use Redis for the shared cache and event publishing.
    pub fn with_redis(mut self) -> Self {
        self.backend = BackendChoice::Redis;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_merchant(mut self, merchant: Arc<dyn MerchantGateway>) -> Self {
        self.merchant = Some(merchant);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn SharedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let scheduler = self
            .scheduler
            .ok_or_else(|| AppError::config("A task scheduler is required"))?;

        let (rounds, players, tables): (
            Arc<dyn RoundRepo>,
            Arc<dyn PlayerRoundRepo>,
            Arc<dyn TableRepo>,
        ) = match self.store {
            StoreChoice::Memory => {
                let store = Arc::new(MemoryStore::new());
                let rounds: Arc<dyn RoundRepo> = store.clone();
                let players: Arc<dyn PlayerRoundRepo> = store.clone();
                let tables: Arc<dyn TableRepo> = store;
                (rounds, players, tables)
            }
            StoreChoice::Db(kind) => {
                let conn = bootstrap_db(&kind).await?;
                let rounds: Arc<dyn RoundRepo> = Arc::new(RoundRepoSea::new(conn.clone()));
                let players: Arc<dyn PlayerRoundRepo> =
                    Arc::new(PlayerRoundRepoSea::new(conn.clone()));
                let tables: Arc<dyn TableRepo> = Arc::new(TableRepoSea::new(conn));
                (rounds, players, tables)
            }
        };

        let (cache, publisher): (Arc<dyn SharedCache>, Arc<dyn EventPublisher>) =
            match self.backend {
                BackendChoice::Memory => (
                    self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new())),
                    self.publisher
                        .unwrap_or_else(|| Arc::new(RecordingPublisher::new())),
                ),
                BackendChoice::Redis => {
                    let url = redis_url()?;
                    let cache: Arc<dyn SharedCache> = match self.cache {
                        Some(cache) => cache,
                        None => Arc::new(RedisCache::connect(&url).await?),
                    };
                    let publisher: Arc<dyn EventPublisher> = match self.publisher {
                        Some(publisher) => publisher,
                        None => Arc::new(RedisPublisher::connect(&url).await?),
                    };
                    (cache, publisher)
                }
            };

        let merchant: Arc<dyn MerchantGateway> = match self.merchant {
            Some(merchant) => merchant,
            None => Arc::new(HttpMerchant::new(MERCHANT_TIMEOUT, RetryPolicy::default())?),
        };

        let config = match self.config {
            Some(config) => config,
            None => EngineConfig::from_env()?,
        };

        Ok(AppState::new(
            rounds,
            players,
            tables,
            cache,
            merchant,
            publisher,
            scheduler,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config,
        ))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
