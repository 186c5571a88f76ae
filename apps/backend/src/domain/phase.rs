//! Round phase, derived from round flags and the clock rather than stored.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Open round, no bet placed yet.
    Waiting,
    Betting,
    Insurance,
    Dealing,
    PlayerTurns,
    DealerTurn,
    /// Finished, waiting for the next round to open.
    Settlement,
}

/// Round flags the phase is derived from.
#[derive(Debug, Clone, Copy)]
pub struct PhaseInputs {
    pub finished: bool,
    pub betting_deadline: Option<OffsetDateTime>,
    pub insurance_deadline: Option<OffsetDateTime>,
    pub finished_dealing: bool,
    pub show_dealer_cards: bool,
}

impl RoundPhase {
    pub fn derive(inputs: PhaseInputs, now: OffsetDateTime) -> RoundPhase {
        if inputs.finished {
            return RoundPhase::Settlement;
        }
        let Some(betting_deadline) = inputs.betting_deadline else {
            return RoundPhase::Waiting;
        };
        if now < betting_deadline {
            return RoundPhase::Betting;
        }
        if inputs.insurance_deadline.is_some_and(|d| now < d) {
            return RoundPhase::Insurance;
        }
        if !inputs.finished_dealing {
            return RoundPhase::Dealing;
        }
        if inputs.show_dealer_cards {
            RoundPhase::DealerTurn
        } else {
            RoundPhase::PlayerTurns
        }
    }

    pub fn accepts_bets(self) -> bool {
        matches!(self, RoundPhase::Waiting | RoundPhase::Betting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoundPhase::Waiting => "waiting",
            RoundPhase::Betting => "betting",
            RoundPhase::Insurance => "insurance",
            RoundPhase::Dealing => "dealing",
            RoundPhase::PlayerTurns => "player_turns",
            RoundPhase::DealerTurn => "dealer_turn",
            RoundPhase::Settlement => "settlement",
        }
    }
}
