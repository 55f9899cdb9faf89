//! Single 52-card deck, shuffled uniformly and drawn from the top.

use leafjack_types::{Card, CARDS_PER_DECK};
use rand::{seq::SliceRandom, Rng};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck exhausted")]
    Exhausted,
}

/// Ordered cards; the top of the deck is the end of the vector.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    /// Full deck shuffled with the thread-local RNG.
    pub fn new() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self {
            cards: Vec::with_capacity(usize::from(CARDS_PER_DECK)),
        };
        deck.reshuffle(rng);
        deck
    }

    /// Deck that deals `cards` in the given order.
    #[cfg(any(test, feature = "mocks"))]
    pub fn stacked(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut cards: Vec<Card> = cards.into_iter().collect();
        cards.reverse();
        Self { cards }
    }

    /// Restores all 52 cards and shuffles them.
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.clear();
        self.cards
            .extend((0..CARDS_PER_DECK).filter_map(Card::from_index));
        self.cards.shuffle(rng);
    }

    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards.pop().ok_or(DeckError::Exhausted)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafjack_types::{Rank, Suit};
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn drain(deck: &mut Deck) -> Vec<Card> {
        std::iter::from_fn(|| deck.draw().ok()).collect()
    }

    #[test]
    fn new_deck_holds_every_card_once() {
        let mut deck = Deck::new();
        assert_eq!(deck.remaining(), 52);
        let cards = drain(&mut deck);
        let unique: HashSet<Card> = cards.iter().copied().collect();
        assert_eq!(cards.len(), 52);
        assert_eq!(unique.len(), 52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                assert!(unique.contains(&Card::new(rank, suit)), "missing {rank:?} {suit:?}");
            }
        }
    }

    #[test]
    fn exhausted_deck_reports_error_until_reshuffled() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut deck = Deck::with_rng(&mut rng);
        drain(&mut deck);
        assert_eq!(deck.draw(), Err(DeckError::Exhausted));
        assert_eq!(deck.draw(), Err(DeckError::Exhausted));

        deck.reshuffle(&mut rng);
        assert_eq!(deck.remaining(), 52);
        assert!(deck.draw().is_ok());
    }

    #[test]
    fn same_seed_gives_same_order() {
        let a = drain(&mut Deck::with_rng(&mut StdRng::seed_from_u64(42)));
        let b = drain(&mut Deck::with_rng(&mut StdRng::seed_from_u64(42)));
        assert_eq!(a, b);
    }

    #[test]
    fn stacked_deck_deals_in_order() {
        let first = Card::new(Rank::Ten, Suit::Spades);
        let second = Card::new(Rank::Nine, Suit::Clubs);
        let mut deck = Deck::stacked([first, second]);
        assert_eq!(deck.draw(), Ok(first));
        assert_eq!(deck.draw(), Ok(second));
        assert_eq!(deck.draw(), Err(DeckError::Exhausted));
    }

    proptest! {
        #[test]
        fn prop_shuffled_deck_is_a_permutation(seed in any::<u64>()) {
            let mut deck = Deck::with_rng(&mut StdRng::seed_from_u64(seed));
            let mut indices: Vec<u8> = drain(&mut deck).into_iter().map(Card::index).collect();
            indices.sort_unstable();
            prop_assert_eq!(indices, (0..CARDS_PER_DECK).collect::<Vec<_>>());
        }
    }
}
