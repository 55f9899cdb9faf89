//! One hand of blackjack as an explicit state machine.
//!
//! ```text
//! Dealt --begin_player_turn--> PlayerTurn --stand--> DealerTurn --play_dealer--> Resolved
//!   |                            |
//!   +-- opening bust (A+A) ------+-- hit past 21 ------------------------------> Resolved(Loss)
//! ```
//!
//! House rules:
//! - Single fresh deck per round; cards are drawn player, dealer, player, dealer.
//! - Ace is always 11, so the only opening over 21 is a pair of aces (22). A
//!   player opening of 22 is a bust. A dealer opening of 22 busts under the
//!   ordinary dealer rule.
//! - Dealer draws while below 17 and stands on any 17.
//! - Equal non-bust totals tie; there are no further tiebreaks.

use crate::deck::{Deck, DeckError};
use crate::hand::{Hand, BLACKJACK};
use leafjack_types::{Card, Outcome, RoundSummary};
use std::fmt;
use thiserror::Error;

/// Dealer stops drawing once its total reaches this value.
pub const DEALER_STANDS_ON: u8 = 17;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Dealt,
    PlayerTurn,
    DealerTurn,
    Resolved(Outcome),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    BeginPlayerTurn,
    Hit,
    Stand,
    PlayDealer,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::BeginPlayerTurn => "begin player turn",
            Action::Hit => "hit",
            Action::Stand => "stand",
            Action::PlayDealer => "play dealer",
        })
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoundError {
    #[error("cannot {action} in stage {stage:?}")]
    InvalidTransition { stage: Stage, action: Action },
    #[error(transparent)]
    Deck(#[from] DeckError),
}

pub struct Round {
    deck: Deck,
    player: Hand,
    dealer: Hand,
    stage: Stage,
}

impl Round {
    /// Deals two cards each from `deck`, which the round owns from here on.
    pub fn deal(mut deck: Deck) -> Result<Self, RoundError> {
        let mut player = Hand::new();
        let mut dealer = Hand::new();
        for _ in 0..2 {
            player.push(deck.draw()?);
            dealer.push(deck.draw()?);
        }
        Ok(Self {
            deck,
            player,
            dealer,
            stage: Stage::Dealt,
        })
    }

    pub fn begin_player_turn(&mut self) -> Result<Stage, RoundError> {
        self.expect(Stage::Dealt, Action::BeginPlayerTurn)?;
        self.stage = if self.player.is_bust() {
            Stage::Resolved(Outcome::Loss)
        } else {
            Stage::PlayerTurn
        };
        Ok(self.stage)
    }

    /// Draws one card for the player. Busting resolves the round as a loss
    /// and skips the dealer entirely.
    pub fn hit(&mut self) -> Result<Card, RoundError> {
        self.expect(Stage::PlayerTurn, Action::Hit)?;
        let card = self.deck.draw()?;
        self.player.push(card);
        if self.player.is_bust() {
            self.stage = Stage::Resolved(Outcome::Loss);
        }
        Ok(card)
    }

    pub fn stand(&mut self) -> Result<(), RoundError> {
        self.expect(Stage::PlayerTurn, Action::Stand)?;
        self.stage = Stage::DealerTurn;
        Ok(())
    }

    /// Runs the dealer policy to completion and resolves the round. Returns
    /// the cards the dealer drew beyond the opening two.
    pub fn play_dealer(&mut self) -> Result<Vec<Card>, RoundError> {
        self.expect(Stage::DealerTurn, Action::PlayDealer)?;
        let mut drawn = Vec::new();
        while self.dealer.total() < DEALER_STANDS_ON {
            let card = self.deck.draw()?;
            self.dealer.push(card);
            drawn.push(card);
        }
        self.stage = Stage::Resolved(compare_totals(self.player.total(), self.dealer.total()));
        Ok(drawn)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn player(&self) -> &Hand {
        &self.player
    }

    pub fn dealer(&self) -> &Hand {
        &self.dealer
    }

    /// The dealer card shown to the player from the start.
    pub fn dealer_upcard(&self) -> Card {
        self.dealer.cards()[0]
    }

    /// The dealer card kept face down until the dealer plays.
    pub fn dealer_hole(&self) -> Card {
        self.dealer.cards()[1]
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.stage {
            Stage::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<RoundSummary> {
        self.outcome().map(|outcome| RoundSummary {
            outcome,
            player_total: self.player.total(),
            dealer_total: self.dealer.total(),
        })
    }

    fn expect(&self, stage: Stage, action: Action) -> Result<(), RoundError> {
        if self.stage != stage {
            return Err(RoundError::InvalidTransition {
                stage: self.stage,
                action,
            });
        }
        Ok(())
    }
}

/// Outcome for a player who stood on `player` against a finished dealer hand.
pub fn compare_totals(player: u8, dealer: u8) -> Outcome {
    if dealer > BLACKJACK || player > dealer {
        Outcome::Win
    } else if player < dealer {
        Outcome::Loss
    } else {
        Outcome::Tie
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafjack_types::{Rank, Suit};
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    const fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    /// Stacks `player` and `dealer` openings in deal order, then `rest`.
    fn rigged(player: [Card; 2], dealer: [Card; 2], rest: &[Card]) -> Round {
        let mut order = vec![player[0], dealer[0], player[1], dealer[1]];
        order.extend_from_slice(rest);
        Round::deal(Deck::stacked(order)).unwrap()
    }

    fn standing_seventeen(rest: &[Card]) -> Round {
        let mut round = rigged(
            [card(Rank::Ten, Suit::Spades), card(Rank::Seven, Suit::Diamonds)],
            [card(Rank::Nine, Suit::Clubs), card(Rank::Five, Suit::Hearts)],
            rest,
        );
        assert_eq!(round.begin_player_turn(), Ok(Stage::PlayerTurn));
        assert_eq!(round.player().total(), 17);
        assert_eq!(round.dealer().total(), 14);
        round.stand().unwrap();
        round
    }

    #[test]
    fn dealer_draws_past_sixteen_then_higher_total_wins() {
        let mut round = standing_seventeen(&[
            card(Rank::Two, Suit::Diamonds),
            card(Rank::Three, Suit::Spades),
        ]);
        let drawn = round.play_dealer().unwrap();
        assert_eq!(drawn.len(), 2);
        assert_eq!(round.dealer().total(), 19);
        assert_eq!(round.stage(), Stage::Resolved(Outcome::Loss));
        assert_eq!(
            round.summary(),
            Some(RoundSummary {
                outcome: Outcome::Loss,
                player_total: 17,
                dealer_total: 19,
            })
        );
    }

    #[test]
    fn equal_totals_tie() {
        let mut round = standing_seventeen(&[card(Rank::Three, Suit::Spades)]);
        round.play_dealer().unwrap();
        assert_eq!(round.dealer().total(), 17);
        assert_eq!(round.outcome(), Some(Outcome::Tie));
    }

    #[test]
    fn dealer_bust_is_player_win() {
        let mut round = standing_seventeen(&[
            card(Rank::Two, Suit::Diamonds),
            card(Rank::Ace, Suit::Clubs),
        ]);
        round.play_dealer().unwrap();
        assert_eq!(round.dealer().total(), 27);
        assert_eq!(round.outcome(), Some(Outcome::Win));
    }

    #[test]
    fn player_bust_skips_dealer() {
        let mut round = rigged(
            [card(Rank::King, Suit::Diamonds), card(Rank::Queen, Suit::Clubs)],
            [card(Rank::Nine, Suit::Clubs), card(Rank::Two, Suit::Hearts)],
            &[card(Rank::Five, Suit::Hearts)],
        );
        round.begin_player_turn().unwrap();
        assert_eq!(round.player().total(), 20);
        assert_eq!(round.hit(), Ok(card(Rank::Five, Suit::Hearts)));
        assert_eq!(round.player().total(), 25);
        assert_eq!(round.stage(), Stage::Resolved(Outcome::Loss));
        assert_eq!(round.dealer().len(), 2);

        let resolved = Stage::Resolved(Outcome::Loss);
        assert_eq!(
            round.hit(),
            Err(RoundError::InvalidTransition {
                stage: resolved,
                action: Action::Hit
            })
        );
        assert_eq!(
            round.stand(),
            Err(RoundError::InvalidTransition {
                stage: resolved,
                action: Action::Stand
            })
        );
        assert!(round.play_dealer().is_err());
    }

    #[test]
    fn pair_of_aces_opening_is_immediate_loss() {
        let mut round = rigged(
            [card(Rank::Ace, Suit::Hearts), card(Rank::Ace, Suit::Spades)],
            [card(Rank::Nine, Suit::Clubs), card(Rank::Two, Suit::Hearts)],
            &[],
        );
        assert_eq!(round.player().total(), 22);
        assert_eq!(
            round.begin_player_turn(),
            Ok(Stage::Resolved(Outcome::Loss))
        );
        assert!(round.hit().is_err());
    }

    #[test]
    fn dealer_pair_of_aces_busts_without_drawing() {
        let mut round = rigged(
            [card(Rank::Ten, Suit::Hearts), card(Rank::Two, Suit::Spades)],
            [card(Rank::Ace, Suit::Clubs), card(Rank::Ace, Suit::Diamonds)],
            &[],
        );
        round.begin_player_turn().unwrap();
        round.stand().unwrap();
        assert_eq!(round.play_dealer(), Ok(Vec::new()));
        assert_eq!(round.outcome(), Some(Outcome::Win));
    }

    #[test]
    fn actions_out_of_order_are_rejected() {
        let mut round = rigged(
            [card(Rank::Ten, Suit::Hearts), card(Rank::Two, Suit::Spades)],
            [card(Rank::Nine, Suit::Clubs), card(Rank::Eight, Suit::Diamonds)],
            &[],
        );
        assert_eq!(
            round.hit(),
            Err(RoundError::InvalidTransition {
                stage: Stage::Dealt,
                action: Action::Hit
            })
        );
        assert!(round.play_dealer().is_err());
        round.begin_player_turn().unwrap();
        assert!(round.begin_player_turn().is_err());
        assert!(round.play_dealer().is_err());
    }

    #[test]
    fn exhausted_deck_surfaces_as_error() {
        let mut round = rigged(
            [card(Rank::Two, Suit::Hearts), card(Rank::Three, Suit::Spades)],
            [card(Rank::Nine, Suit::Clubs), card(Rank::Four, Suit::Diamonds)],
            &[],
        );
        round.begin_player_turn().unwrap();
        assert_eq!(round.hit(), Err(RoundError::Deck(DeckError::Exhausted)));
        round.stand().unwrap();
        assert_eq!(
            round.play_dealer(),
            Err(RoundError::Deck(DeckError::Exhausted))
        );
        assert_eq!(round.outcome(), None);
    }

    #[test]
    fn dealer_upcard_and_hole_follow_deal_order() {
        let up = card(Rank::Nine, Suit::Clubs);
        let hole = card(Rank::Eight, Suit::Diamonds);
        let round = rigged(
            [card(Rank::Ten, Suit::Hearts), card(Rank::Two, Suit::Spades)],
            [up, hole],
            &[],
        );
        assert_eq!(round.dealer_upcard(), up);
        assert_eq!(round.dealer_hole(), hole);
    }

    #[test]
    fn compare_totals_follows_comparison_rule() {
        assert_eq!(compare_totals(20, 22), Outcome::Win);
        assert_eq!(compare_totals(18, 17), Outcome::Win);
        assert_eq!(compare_totals(17, 18), Outcome::Loss);
        assert_eq!(compare_totals(19, 19), Outcome::Tie);
    }

    proptest! {
        #[test]
        fn prop_round_respects_bust_and_dealer_rules(
            seed in any::<u64>(),
            hits in proptest::collection::vec(any::<bool>(), 0..12),
        ) {
            let deck = Deck::with_rng(&mut StdRng::seed_from_u64(seed));
            let mut round = Round::deal(deck).unwrap();
            prop_assert!(round.player().total() <= 22);

            round.begin_player_turn().unwrap();
            for hit in hits {
                if round.stage() != Stage::PlayerTurn {
                    break;
                }
                if hit {
                    round.hit().unwrap();
                    if round.player().total() > BLACKJACK {
                        prop_assert_eq!(round.outcome(), Some(Outcome::Loss));
                        prop_assert!(round.hit().is_err());
                        prop_assert!(round.stand().is_err());
                    }
                } else {
                    round.stand().unwrap();
                }
            }
            if round.stage() == Stage::PlayerTurn {
                round.stand().unwrap();
            }

            if round.stage() == Stage::DealerTurn {
                let before = round.dealer().len();
                let drawn = round.play_dealer().unwrap();
                prop_assert_eq!(round.dealer().len(), before + drawn.len());
                let dealer = round.dealer().total();
                prop_assert!(dealer >= DEALER_STANDS_ON);
                // Every draw happened below 17.
                let mut running = round.dealer().cards()[..2]
                    .iter()
                    .map(|card| card.value())
                    .sum::<u8>();
                for card in &drawn {
                    prop_assert!(running < DEALER_STANDS_ON);
                    running += card.value();
                }
                prop_assert_eq!(
                    round.outcome(),
                    Some(compare_totals(round.player().total(), dealer))
                );
            }
            prop_assert!(round.outcome().is_some());
        }
    }
}
