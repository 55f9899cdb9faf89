//! Player side of a leafjack table: listen for server offers, open a session
//! and drive it with a [`Strategy`].

pub mod backoff;
pub mod connection;
pub mod discovery;
pub mod driver;

pub use connection::Connection;
pub use discovery::{Discovery, Listener, ServerOffer};
pub use driver::{RoundView, SessionDriver, SessionStats, StandOn, Strategy};

use leafjack_execution::RoundError;
use leafjack_types::{CodecError, MessageType, Tally};
use std::time::Duration;
use thiserror::Error;

/// Error type for discovery and session operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid packet: {0}")]
    Codec(#[from] CodecError),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("protocol mismatch: {0}")]
    ProtocolMismatch(String),
    #[error("unexpected {0:?} message")]
    UnexpectedMessage(MessageType),
    #[error("send while waiting for the peer's reply")]
    OutOfTurn,
    #[error("session summary mismatch: server {server:?}, local {local:?}")]
    SummaryMismatch { server: Tally, local: Tally },
    #[error("round engine: {0}")]
    Engine(#[from] RoundError),
}

impl Error {
    /// Whether the peer went away or stopped answering, as opposed to
    /// misbehaving.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Error::ConnectionClosed | Error::Timeout(_) | Error::Io(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
