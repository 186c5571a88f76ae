//! Repository traits for the record store.

pub mod player_rounds;
pub mod rounds;
pub mod tables;

pub use player_rounds::{NewPlayerRound, PlayerIdentity, PlayerRound, PlayerRoundRepo};
pub use rounds::{Round, RoundCreate, RoundRepo};
pub use tables::{MerchantConfig, TableConfig, TableRepo};
