//! Plays one session against a server on behalf of a [`Strategy`].

use crate::{Connection, Error, Result};
use leafjack_execution::Hand;
use leafjack_types::{
    Card, Decision, Message, MessageType, Payload, Request, RoundSummary, Seat, Tally,
};
use std::future::Future;
use tracing::{debug, info};

/// What the player knows about the current round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundView {
    pub round: u8,
    pub player: Hand,
    /// Up-card first; the hole card and any draws arrive once the dealer plays.
    pub dealer: Hand,
}

impl RoundView {
    fn new(round: u8, dealer_upcard: Card) -> Self {
        Self {
            round,
            player: Hand::new(),
            dealer: [dealer_upcard].into_iter().collect(),
        }
    }

    pub fn player_total(&self) -> u8 {
        self.player.total()
    }

    pub fn dealer_total(&self) -> u8 {
        self.dealer.total()
    }
}

/// Source of hit/stand decisions, typically a human at a terminal.
pub trait Strategy {
    fn decide(&mut self, view: &RoundView) -> impl Future<Output = Decision> + Send;

    /// Called once per round with the final view and the server's result.
    fn round_finished(&mut self, _view: &RoundView, _summary: &RoundSummary) {}
}

/// Hits while the player total is below the threshold.
#[derive(Clone, Copy, Debug)]
pub struct StandOn(pub u8);

impl Strategy for StandOn {
    async fn decide(&mut self, view: &RoundView) -> Decision {
        if view.player_total() < self.0 {
            Decision::Hit
        } else {
            Decision::Stand
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionStats {
    pub rounds_requested: u8,
    pub tally: Tally,
    pub rounds: Vec<RoundSummary>,
}

impl SessionStats {
    pub fn win_rate(&self) -> Option<f64> {
        self.tally.win_rate()
    }
}

pub struct SessionDriver {
    connection: Connection,
    rounds: u8,
    client_name: String,
}

impl SessionDriver {
    pub fn new(connection: Connection, rounds: u8, client_name: impl Into<String>) -> Self {
        Self {
            connection,
            rounds,
            client_name: client_name.into(),
        }
    }

    /// Sends the request and plays until the server's session summary, which
    /// must agree with the results seen along the way.
    pub async fn run<S: Strategy>(mut self, strategy: &mut S) -> Result<SessionStats> {
        let peer = self.connection.peer();
        self.connection
            .send(&Message::Request(Request {
                rounds: self.rounds,
                client_name: self.client_name.clone(),
            }))
            .await?;
        info!(%peer, rounds = self.rounds, "session requested");

        let mut tally = Tally::default();
        let mut rounds = Vec::with_capacity(usize::from(self.rounds));
        let mut view = RoundView::default();
        loop {
            let payload = match self.connection.recv().await? {
                Message::Payload(payload) => payload,
                other => return Err(Error::UnexpectedMessage(other.message_type())),
            };
            match payload {
                Payload::RoundStart {
                    round,
                    dealer_upcard,
                } => {
                    debug!(round, %dealer_upcard, "round started");
                    view = RoundView::new(round, dealer_upcard);
                }
                Payload::CardDealt { seat, card } => match seat {
                    Seat::Player => view.player.push(card),
                    Seat::Dealer => view.dealer.push(card),
                },
                Payload::TurnPrompt { player_total, .. } => {
                    if player_total != view.player_total() {
                        debug!(
                            player_total,
                            local = view.player_total(),
                            "prompt total differs from dealt cards"
                        );
                    }
                    let decision = strategy.decide(&view).await;
                    debug!(round = view.round, ?decision, "decided");
                    self.connection
                        .send(&Payload::Decision(decision).into())
                        .await?;
                }
                Payload::RoundResult(summary) => {
                    if rounds.len() == usize::from(self.rounds) {
                        return Err(Error::UnexpectedMessage(MessageType::RoundResult));
                    }
                    info!(
                        round = view.round,
                        outcome = ?summary.outcome,
                        player = summary.player_total,
                        dealer = summary.dealer_total,
                        "round finished"
                    );
                    tally.record(summary.outcome);
                    rounds.push(summary);
                    strategy.round_finished(&view, &summary);
                }
                Payload::SessionSummary(server) => {
                    if server != tally {
                        return Err(Error::SummaryMismatch {
                            server,
                            local: tally,
                        });
                    }
                    info!(%peer, wins = tally.wins, losses = tally.losses, ties = tally.ties, "session complete");
                    // The server closes right after the summary, so a failed
                    // shutdown here does not affect the result.
                    if let Err(err) = self.connection.close().await {
                        debug!(?err, "close after summary failed");
                    }
                    return Ok(SessionStats {
                        rounds_requested: self.rounds,
                        tally,
                        rounds,
                    });
                }
                Payload::Decision(_) => {
                    return Err(Error::UnexpectedMessage(MessageType::Decision))
                }
            }
        }
    }
}
