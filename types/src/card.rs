//! Shared playing-card model.
//!
//! Cards are indexed as `0..=51`, where:
//! - suit = index / 13 (0..=3, in the order hearts, diamonds, clubs, spades)
//! - rank = index % 13 + 1 (1..=13), where 1 is Ace and 13 is King
//!
//! Blackjack value is fixed per rank: Ace counts 11, faces count 10.

use std::fmt;

/// Total cards in a standard deck.
pub const CARDS_PER_DECK: u8 = 52;

/// Ranks per suit.
pub const RANKS_PER_SUIT: u8 = 13;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Hearts = 0,
    Diamonds = 1,
    Clubs = 2,
    Spades = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn symbol(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }
}

impl TryFrom<u8> for Suit {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Suit::Hearts),
            1 => Ok(Suit::Diamonds),
            2 => Ok(Suit::Clubs),
            3 => Ok(Suit::Spades),
            other => Err(other),
        }
    }
}

/// Card rank, encoded 1..=13 with Ace low.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Blackjack value of the rank (Ace=11, face=10, number=face value).
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Jack | Rank::Queen | Rank::King => 10,
            number => number as u8,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=13 => Ok(Rank::ALL[usize::from(value - 1)]),
            other => Err(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Returns the card at `index`, or `None` if it is outside `0..CARDS_PER_DECK`.
    pub fn from_index(index: u8) -> Option<Self> {
        if index >= CARDS_PER_DECK {
            return None;
        }
        let rank = Rank::ALL[usize::from(index % RANKS_PER_SUIT)];
        let suit = Suit::ALL[usize::from(index / RANKS_PER_SUIT)];
        Some(Self { rank, suit })
    }

    pub fn index(self) -> u8 {
        (self.suit as u8) * RANKS_PER_SUIT + (self.rank as u8 - 1)
    }

    pub fn value(self) -> u8 {
        self.rank.value()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}
