//! Card parsing from scanner tokens (e.g., "1AC", "6TD")

use std::fmt;
use std::str::FromStr;

use super::cards_types::{Card, Rank, Suit};
use crate::errors::domain::{DomainError, ValidationKind};

/// Message reported for any token the shoe scanner should never produce.
pub const INCORRECT_CARD: &str = "Incorrect card";

/// Highest deck number in a shoe.
pub const MAX_DECKS: u8 = 6;

fn incorrect_card() -> DomainError {
    DomainError::validation(ValidationKind::InvalidCard, INCORRECT_CARD)
}

impl Rank {
    pub fn from_char(ch: char) -> Option<Rank> {
        let rank = match ch {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return None,
        };
        Some(rank)
    }

    pub fn as_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }
}

impl Suit {
    pub fn from_char(ch: char) -> Option<Suit> {
        match ch {
            'S' => Some(Suit::Spades),
            'C' => Some(Suit::Clubs),
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Suit::Spades => 'S',
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
        }
    }
}

impl FromStr for Card {
    type Err = DomainError;

    /// Token layout is `<deck 1-6><rank><suit>`, exactly three ASCII chars.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(deck_ch), Some(rank_ch), Some(suit_ch), None) =
            (chars.next(), chars.next(), chars.next(), chars.next())
        else {
            return Err(incorrect_card());
        };

        let deck = deck_ch
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .filter(|d| (1..=MAX_DECKS).contains(d))
            .ok_or_else(incorrect_card)?;
        let rank = Rank::from_char(rank_ch).ok_or_else(incorrect_card)?;
        let suit = Suit::from_char(suit_ch).ok_or_else(incorrect_card)?;

        Ok(Card { deck, rank, suit })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.deck, self.rank.as_char(), self.suit.as_char())
    }
}

/// Non-panicking helper to parse scanner tokens into cards.
pub fn try_parse_cards<I, S>(tokens: I) -> Result<Vec<Card>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|s| s.as_ref().parse::<Card>())
        .collect()
}
