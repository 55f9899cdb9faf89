//! Leafjack round engine.
//!
//! A [`Round`] owns a freshly shuffled [`Deck`] and the two [`Hand`]s of a
//! single blackjack hand. Callers drive it through explicit transitions and
//! receive [`RoundError::InvalidTransition`] for anything out of order, so a
//! session loop can never double-deal or resolve a round twice.
//!
//! ```rust
//! use leafjack_execution::{Deck, Round, Stage};
//!
//! let mut round = Round::deal(Deck::new()).unwrap();
//! if round.begin_player_turn().unwrap() == Stage::PlayerTurn {
//!     round.stand().unwrap();
//!     round.play_dealer().unwrap();
//! }
//! assert!(round.summary().is_some());
//! ```

pub mod deck;
pub mod hand;
pub mod round;

pub use deck::{Deck, DeckError};
pub use hand::{Hand, BLACKJACK};
pub use round::{compare_totals, Action, Round, RoundError, Stage, DEALER_STANDS_ON};
