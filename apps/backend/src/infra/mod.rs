//! Infrastructure layer: database bootstrap, error mapping and state wiring.

pub mod db;
pub mod db_errors;
pub mod state;
