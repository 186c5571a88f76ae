use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::cache::SharedCache;
use crate::config::EngineConfig;
use crate::merchant::MerchantGateway;
use crate::realtime::EventPublisher;
use crate::repos::{PlayerRoundRepo, RoundRepo, TableConfig, TableRepo};
use crate::services::clock::Clock;
use crate::tasks::TaskScheduler;

/// Table configuration rarely changes; keep a short-lived local copy.
const TABLE_CACHE_TTL: Duration = Duration::from_secs(60);
const TABLE_CACHE_CAPACITY: u64 = 256;

/// Shared handles the engine runs on. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub rounds: Arc<dyn RoundRepo>,
    pub players: Arc<dyn PlayerRoundRepo>,
    pub tables: Arc<dyn TableRepo>,
    pub cache: Arc<dyn SharedCache>,
    pub merchant: Arc<dyn MerchantGateway>,
    pub publisher: Arc<dyn EventPublisher>,
    pub scheduler: Arc<dyn TaskScheduler>,
    pub clock: Arc<dyn Clock>,
    pub config: EngineConfig,
    table_configs: Cache<String, TableConfig>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rounds: Arc<dyn RoundRepo>,
        players: Arc<dyn PlayerRoundRepo>,
        tables: Arc<dyn TableRepo>,
        cache: Arc<dyn SharedCache>,
        merchant: Arc<dyn MerchantGateway>,
        publisher: Arc<dyn EventPublisher>,
        scheduler: Arc<dyn TaskScheduler>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            rounds,
            players,
            tables,
            cache,
            merchant,
            publisher,
            scheduler,
            clock,
            config,
            table_configs: Cache::builder()
                .max_capacity(TABLE_CACHE_CAPACITY)
                .time_to_live(TABLE_CACHE_TTL)
                .build(),
        }
    }

    pub fn cache(&self) -> &dyn SharedCache {
        self.cache.as_ref()
    }

    pub fn publisher(&self) -> &dyn EventPublisher {
        self.publisher.as_ref()
    }

    pub(crate) fn table_configs(&self) -> &Cache<String, TableConfig> {
        &self.table_configs
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
