use leafjack_types::Card;

/// Highest non-bust total.
pub const BLACKJACK: u8 = 21;

/// Cards held by one participant during a round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Plain sum of card values, recomputed on every call.
    pub fn total(&self) -> u8 {
        let total: u16 = self.cards.iter().map(|card| u16::from(card.value())).sum();
        total.min(255) as u8
    }

    pub fn is_bust(&self) -> bool {
        self.total() > BLACKJACK
    }
}

impl FromIterator<Card> for Hand {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Self {
            cards: iter.into_iter().collect(),
        }
    }
}
