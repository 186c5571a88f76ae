use serde::{Deserialize, Serialize};

use super::payloads::{
    BetReceipt, DecisionPrompt, HandValue, PlayerActionNotice, RepeatReceipt, SeatResult,
    TakenSeats,
};
use super::table_state::TableSnapshot;
use crate::domain::Card;
use crate::repos::player_rounds::PlayerIdentity;

/// Whether a connection runs the table or plays at it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    Dealer,
    #[default]
    Player,
}

/// Who a connection is. Dealers carry no player identity; a player
/// connection has one once it joined the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub connection_id: String,
    pub table_id: String,
    #[serde(default)]
    pub role: SessionRole,
    pub player: Option<PlayerIdentity>,
}

impl SessionContext {
    pub fn dealer(connection_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            table_id: table_id.into(),
            role: SessionRole::Dealer,
            player: None,
        }
    }

    pub fn player(
        connection_id: impl Into<String>,
        table_id: impl Into<String>,
        identity: PlayerIdentity,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            table_id: table_id.into(),
            role: SessionRole::Player,
            player: Some(identity),
        }
    }

    /// A player connection that has not joined yet.
    pub fn guest(connection_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            table_id: table_id.into(),
            role: SessionRole::Player,
            player: None,
        }
    }

    pub fn is_dealer(&self) -> bool {
        self.role == SessionRole::Dealer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnCommand {
    Hit,
    Stand,
    Double,
    Split,
    AutoStand,
}

impl TurnCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnCommand::Hit => "hit",
            TurnCommand::Stand => "stand",
            TurnCommand::Double => "double",
            TurnCommand::Split => "split",
            TurnCommand::AutoStand => "auto_stand",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    PlaceBet {
        seat_number: i16,
        bet_type: String,
        amount: f64,
    },
    MakeRollback {
        seat_number: i16,
        bet_type: String,
    },
    MakeRepeat,
    MakeAction {
        seat_number: i16,
        action: TurnCommand,
    },
    MakeInsurance {
        seat_number: i16,
        value: bool,
    },
    ScanCard {
        card: String,
    },
    ScanDealerCard {
        card: String,
    },
    ResetRound,
    ChangeDealer {
        dealer_name: String,
    },
    JoinTable {
        token: String,
        merchant_id: String,
    },
    LeaveTable,
}

impl ClientAction {
    pub fn name(&self) -> &'static str {
        match self {
            ClientAction::PlaceBet { .. } => "place_bet",
            ClientAction::MakeRollback { .. } => "make_rollback",
            ClientAction::MakeRepeat => "make_repeat",
            ClientAction::MakeAction { .. } => "make_action",
            ClientAction::MakeInsurance { .. } => "make_insurance",
            ClientAction::ScanCard { .. } => "scan_card",
            ClientAction::ScanDealerCard { .. } => "scan_dealer_card",
            ClientAction::ResetRound => "reset_round",
            ClientAction::ChangeDealer { .. } => "change_dealer",
            ClientAction::JoinTable { .. } => "join_table",
            ClientAction::LeaveTable => "leave_table",
        }
    }

    /// Scanner and operator actions.
    pub fn is_dealer_only(&self) -> bool {
        matches!(
            self,
            ClientAction::ScanCard { .. }
                | ClientAction::ScanDealerCard { .. }
                | ClientAction::ResetRound
                | ClientAction::ChangeDealer { .. }
        )
    }
}

/// Delivery scope of an outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Audience {
    Connection { id: String },
    Table { id: String, skip: Option<String> },
    /// Every connection of one `{user}:{merchant}` identity.
    Identity { key: String },
}

impl Audience {
    pub fn connection(id: impl Into<String>) -> Self {
        Audience::Connection { id: id.into() }
    }

    pub fn table(id: impl Into<String>) -> Self {
        Audience::Table {
            id: id.into(),
            skip: None,
        }
    }

    pub fn table_except(id: impl Into<String>, skip: impl Into<String>) -> Self {
        Audience::Table {
            id: id.into(),
            skip: Some(skip.into()),
        }
    }

    pub fn identity(key: impl Into<String>) -> Self {
        Audience::Identity { key: key.into() }
    }

    /// Pub/sub channel carrying this audience.
    pub fn channel(&self) -> String {
        match self {
            Audience::Connection { id } => format!("conn:{id}"),
            Audience::Table { id, .. } => format!("table:{id}"),
            Audience::Identity { key } => format!("identity:{key}"),
        }
    }
}

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    BetStatus(BetReceipt),
    NewBet(BetReceipt),
    RollbackStatus(BetReceipt),
    NewRollback(BetReceipt),
    RepeatStatus(RepeatReceipt),
    StartTimer {
        seconds: i64,
    },
    MakeDecision(DecisionPrompt),
    DecisionMaker {
        seat_number: i16,
        decision_timer: i64,
    },
    SendHandValue(HandValue),
    DealerScore {
        score: String,
        cards: Vec<Card>,
    },
    PlayerAction(PlayerActionNotice),
    MakeInsurance {
        decision_time: i64,
        insurable_seats: Vec<i16>,
    },
    ScanDealerCard {},
    Result(SeatResult),
    UpdateBalance {
        balance: f64,
    },
    TotalWinning {
        amount: f64,
    },
    InsufficientBalance {
        message: String,
        balance: f64,
    },
    StartNewRound {
        next_round_real_id: i64,
        next_round_id: String,
        seats: TakenSeats,
    },
    RepeatBetting {},
    CleanSeats {},
    ResetStatus {
        balance: f64,
    },
    DealerChanged {
        dealer_name: String,
    },
    TableState(TableSnapshot),
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::BetStatus(_) => "bet_status",
            ServerEvent::NewBet(_) => "new_bet",
            ServerEvent::RollbackStatus(_) => "rollback_status",
            ServerEvent::NewRollback(_) => "new_rollback",
            ServerEvent::RepeatStatus(_) => "repeat_status",
            ServerEvent::StartTimer { .. } => "start_timer",
            ServerEvent::MakeDecision(_) => "make_decision",
            ServerEvent::DecisionMaker { .. } => "decision_maker",
            ServerEvent::SendHandValue(_) => "send_hand_value",
            ServerEvent::DealerScore { .. } => "dealer_score",
            ServerEvent::PlayerAction(_) => "player_action",
            ServerEvent::MakeInsurance { .. } => "make_insurance",
            ServerEvent::ScanDealerCard {} => "scan_dealer_card",
            ServerEvent::Result(_) => "result",
            ServerEvent::UpdateBalance { .. } => "update_balance",
            ServerEvent::TotalWinning { .. } => "total_winning",
            ServerEvent::InsufficientBalance { .. } => "insufficient_balance",
            ServerEvent::StartNewRound { .. } => "start_new_round",
            ServerEvent::RepeatBetting {} => "repeat_betting",
            ServerEvent::CleanSeats {} => "clean_seats",
            ServerEvent::ResetStatus { .. } => "reset_status",
            ServerEvent::DealerChanged { .. } => "dealer_changed",
            ServerEvent::TableState(_) => "table_state",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}
