//! Adapters for external dependencies.

pub mod json_columns;
pub mod memory;
pub mod player_rounds_sea;
pub mod rounds_sea;
pub mod tables_sea;

pub use memory::MemoryStore;
pub use player_rounds_sea::PlayerRoundRepoSea;
pub use rounds_sea::RoundRepoSea;
pub use tables_sea::TableRepoSea;
