//! Side-bet games settled on the first cards of a seat: Perfect Pair (the
//! player's two cards) and 21+3 (the player's two cards plus the dealer's
//! up-card). Multipliers include the returned stake.

use serde::{Deserialize, Serialize};

use super::cards_types::{Card, Rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairCombination {
    PerfectPair,
    ColoredPair,
    MixedPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TwentyOnePlusThreeCombination {
    SuitedTrips,
    StraightFlush,
    ThreeOfAKind,
    Straight,
    Flush,
}

/// Either game's winning combination, as stored on the bet line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SideBetCombination {
    Pair(PairCombination),
    TwentyOnePlusThree(TwentyOnePlusThreeCombination),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerfectPairPayouts {
    pub perfect: f64,
    pub colored: f64,
    pub mixed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwentyOnePlusThreePayouts {
    pub suited_trips: f64,
    pub straight_flush: f64,
    pub three_of_a_kind: f64,
    pub straight: f64,
    pub flush: f64,
}

/// Per-table multiplier tables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideBetPayouts {
    pub perfect_pair: PerfectPairPayouts,
    pub twenty_one_plus_three: TwentyOnePlusThreePayouts,
}

impl Default for SideBetPayouts {
    fn default() -> Self {
        Self {
            perfect_pair: PerfectPairPayouts {
                perfect: 26.0,
                colored: 13.0,
                mixed: 7.0,
            },
            twenty_one_plus_three: TwentyOnePlusThreePayouts {
                suited_trips: 101.0,
                straight_flush: 41.0,
                three_of_a_kind: 31.0,
                straight: 11.0,
                flush: 6.0,
            },
        }
    }
}

/// Result of evaluating one side bet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideBetResult {
    pub winning: f64,
    pub combination: Option<SideBetCombination>,
}

impl SideBetResult {
    fn lost() -> Self {
        Self {
            winning: 0.0,
            combination: None,
        }
    }
}

pub fn pair_combination(first: &Card, second: &Card) -> Option<PairCombination> {
    if first.rank != second.rank {
        return None;
    }
    if first.suit == second.suit {
        Some(PairCombination::PerfectPair)
    } else if first.suit.is_red() == second.suit.is_red() {
        Some(PairCombination::ColoredPair)
    } else {
        Some(PairCombination::MixedPair)
    }
}

/// Three ranks in consecutive order 2..K,A; A-2-3 also counts.
pub fn is_straight(ranks: [Rank; 3]) -> bool {
    let mut idx = ranks.map(Rank::straight_index);
    idx.sort_unstable();
    let consecutive = idx[1] == idx[0] + 1 && idx[2] == idx[1] + 1;
    let wheel = idx
        == [
            Rank::Two.straight_index(),
            Rank::Three.straight_index(),
            Rank::Ace.straight_index(),
        ];
    consecutive || wheel
}

pub fn twenty_one_plus_three_combination(
    cards: [&Card; 3],
) -> Option<TwentyOnePlusThreeCombination> {
    let ranks = cards.map(|c| c.rank);
    let same_rank = ranks[0] == ranks[1] && ranks[1] == ranks[2];
    let same_suit = cards[0].suit == cards[1].suit && cards[1].suit == cards[2].suit;
    let straight = is_straight(ranks);

    if same_rank && same_suit {
        Some(TwentyOnePlusThreeCombination::SuitedTrips)
    } else if same_suit && straight {
        Some(TwentyOnePlusThreeCombination::StraightFlush)
    } else if same_rank {
        Some(TwentyOnePlusThreeCombination::ThreeOfAKind)
    } else if straight {
        Some(TwentyOnePlusThreeCombination::Straight)
    } else if same_suit {
        Some(TwentyOnePlusThreeCombination::Flush)
    } else {
        None
    }
}

impl SideBetPayouts {
    pub fn pair_multiplier(&self, combination: PairCombination) -> f64 {
        match combination {
            PairCombination::PerfectPair => self.perfect_pair.perfect,
            PairCombination::ColoredPair => self.perfect_pair.colored,
            PairCombination::MixedPair => self.perfect_pair.mixed,
        }
    }

    pub fn twenty_one_plus_three_multiplier(
        &self,
        combination: TwentyOnePlusThreeCombination,
    ) -> f64 {
        let table = &self.twenty_one_plus_three;
        match combination {
            TwentyOnePlusThreeCombination::SuitedTrips => table.suited_trips,
            TwentyOnePlusThreeCombination::StraightFlush => table.straight_flush,
            TwentyOnePlusThreeCombination::ThreeOfAKind => table.three_of_a_kind,
            TwentyOnePlusThreeCombination::Straight => table.straight,
            TwentyOnePlusThreeCombination::Flush => table.flush,
        }
    }

    /// Perfect Pair on the player's first two cards.
    pub fn evaluate_perfect_pair(&self, stake: f64, player_cards: &[Card]) -> SideBetResult {
        let [first, second] = match player_cards {
            [a, b, ..] => [a, b],
            _ => return SideBetResult::lost(),
        };
        match pair_combination(first, second) {
            Some(combination) if stake > 0.0 => SideBetResult {
                winning: stake * self.pair_multiplier(combination),
                combination: Some(SideBetCombination::Pair(combination)),
            },
            _ => SideBetResult::lost(),
        }
    }

    /// 21+3 on the player's first two cards and the dealer's first card.
    pub fn evaluate_twenty_one_plus_three(
        &self,
        stake: f64,
        player_cards: &[Card],
        dealer_cards: &[Card],
    ) -> SideBetResult {
        let (Some(up_card), [first, second, ..]) = (dealer_cards.first(), player_cards) else {
            return SideBetResult::lost();
        };
        match twenty_one_plus_three_combination([first, second, up_card]) {
            Some(combination) if stake > 0.0 => SideBetResult {
                winning: stake * self.twenty_one_plus_three_multiplier(combination),
                combination: Some(SideBetCombination::TwentyOnePlusThree(combination)),
            },
            _ => SideBetResult::lost(),
        }
    }
}
