pub mod merchant_tables;
pub mod player_rounds;
pub mod rounds;
pub mod tables;

pub use merchant_tables::Entity as MerchantTables;
pub use merchant_tables::Model as MerchantTable;
pub use player_rounds::Entity as PlayerRounds;
pub use player_rounds::Model as PlayerRound;
pub use rounds::Entity as Rounds;
pub use rounds::Model as Round;
pub use tables::Entity as Tables;
pub use tables::Model as Table;
