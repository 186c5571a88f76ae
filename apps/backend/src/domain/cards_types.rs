//! Core card-related types: Card, Rank, Suit

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Suit {
    Spades,
    Clubs,
    Diamonds,
    Hearts,
}

impl Suit {
    /// Diamonds and hearts are red; used by the coloured-pair side bet.
    pub fn is_red(self) -> bool {
        matches!(self, Suit::Diamonds | Suit::Hearts)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// Blackjack point value with the ace counted high.
    pub fn points(self) -> u8 {
        match self {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }

    pub fn is_ace(self) -> bool {
        self == Rank::Ace
    }

    pub fn is_ten_value(self) -> bool {
        matches!(self, Rank::Ten | Rank::Jack | Rank::Queen | Rank::King)
    }

    /// Position in the straight order 2..K,A (0-based).
    pub fn straight_index(self) -> u8 {
        self as u8
    }
}

/// A scanned card. `deck` identifies the shoe deck (1-6) the card came from and
/// only matters for the token round trip; equality of play is rank and suit.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Card {
    pub deck: u8,
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(deck: u8, rank: Rank, suit: Suit) -> Self {
        Self { deck, rank, suit }
    }

    pub fn is_ace(&self) -> bool {
        self.rank.is_ace()
    }
}
