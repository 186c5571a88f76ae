//! Wire messages between table clients and the engine.

pub mod messages;
pub mod payloads;
pub mod table_state;

pub use messages::{
    Audience, ClientAction, ServerEvent, SessionContext, SessionRole, TurnCommand,
};
pub use payloads::{
    BetReceipt, DecisionPrompt, HandValue, PlayerActionNotice, RepeatReceipt, SeatResult,
    TakenSeat, TakenSeats,
};
pub use table_state::{SeatView, TableSnapshot};
