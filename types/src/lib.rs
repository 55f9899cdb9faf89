//! Types shared by leafjack servers and players: the card model, session
//! tallies and the fixed-layout wire codec.

pub mod card;
pub mod tally;
pub mod wire;

pub use card::{Card, Rank, Suit, CARDS_PER_DECK, RANKS_PER_SUIT};
pub use tally::{Outcome, RoundSummary, Tally};
pub use wire::{
    packet_size, CodecError, Decision, Message, MessageType, Offer, Payload, Request, Seat,
    HEADER_SIZE, MAGIC, NAME_SIZE, OFFER_PORT,
};
