#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod entities;
pub mod error;
pub mod errors;
pub mod infra;
pub mod merchant;
pub mod protocol;
pub mod realtime;
pub mod repos;
pub mod services;
pub mod state;
pub mod tasks;

#[cfg(test)]
pub mod test_bootstrap;

// Re-exports for public API
pub use config::db::{database_url, redis_url, DbKind};
pub use config::EngineConfig;
pub use error::AppError;
pub use infra::state::build_state;
pub use protocol::{Audience, ClientAction, ServerEvent, SessionContext};
pub use services::{dispatch, EngineTasks};
pub use state::app_state::AppState;
pub use tasks::{DeferredTask, TaskReceiver, TokioScheduler};

// Prelude for test convenience
pub mod prelude {
    pub use super::domain::*;
    pub use super::error::*;
    pub use super::protocol::*;
    pub use super::repos::*;
    pub use super::services::*;
    pub use super::state::*;
}

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}
