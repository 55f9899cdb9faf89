//! Server side of one player session.
//!
//! Per round the player sees, in order: ROUND_START with the dealer up-card,
//! two CARD_DEALT for their opening hand, then TURN_PROMPT / DECISION pairs
//! (each hit answered by a CARD_DEALT), the dealer's hole card and draws if
//! the dealer plays, and finally ROUND_RESULT. A SESSION_SUMMARY follows the
//! last round.

use leafjack_client::{Connection, Error, Result};
use leafjack_execution::{Action, Deck, Round, RoundError, Stage};
use leafjack_types::{Card, Decision, Message, Payload, RoundSummary, Seat, Tally};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub client_name: String,
    pub rounds: u8,
    pub tally: Tally,
}

/// Runs one session to completion, dealing each round from a fresh deck
/// produced by `new_deck`. The connection is closed on return.
pub async fn run(
    mut connection: Connection,
    mut new_deck: impl FnMut() -> Deck,
) -> Result<SessionReport> {
    let peer = connection.peer();
    let request = match connection.recv().await {
        Ok(Message::Request(request)) => request,
        Ok(other) => {
            return Err(Error::ProtocolMismatch(format!(
                "expected a request, got {:?}",
                other.message_type()
            )))
        }
        Err(Error::Codec(err)) => return Err(Error::ProtocolMismatch(err.to_string())),
        Err(err) => return Err(err),
    };
    info!(%peer, client = %request.client_name, rounds = request.rounds, "session started");

    let mut tally = Tally::default();
    for number in 1..=request.rounds {
        let summary = play_round(&mut connection, number, new_deck()).await?;
        tally.record(summary.outcome);
        info!(
            %peer,
            round = number,
            outcome = ?summary.outcome,
            player = summary.player_total,
            dealer = summary.dealer_total,
            "round resolved"
        );
    }

    connection
        .send(&Payload::SessionSummary(tally).into())
        .await?;
    if let Err(err) = connection.close().await {
        debug!(%peer, ?err, "close after summary failed");
    }
    Ok(SessionReport {
        client_name: request.client_name,
        rounds: request.rounds,
        tally,
    })
}

async fn deal(connection: &mut Connection, seat: Seat, card: Card) -> Result<()> {
    connection
        .send(&Payload::CardDealt { seat, card }.into())
        .await
}

async fn play_round(
    connection: &mut Connection,
    number: u8,
    deck: Deck,
) -> Result<RoundSummary> {
    let mut round = Round::deal(deck)?;
    let dealer_upcard = round.dealer_upcard();
    connection
        .send(
            &Payload::RoundStart {
                round: number,
                dealer_upcard,
            }
            .into(),
        )
        .await?;
    let opening = [round.player().cards()[0], round.player().cards()[1]];
    for card in opening {
        deal(connection, Seat::Player, card).await?;
    }

    let mut stage = round.begin_player_turn()?;
    while stage == Stage::PlayerTurn {
        connection
            .send(
                &Payload::TurnPrompt {
                    player_total: round.player().total(),
                    dealer_showing: dealer_upcard.value(),
                }
                .into(),
            )
            .await?;
        let decision = match connection.recv().await? {
            Message::Payload(Payload::Decision(decision)) => decision,
            other => return Err(Error::UnexpectedMessage(other.message_type())),
        };
        debug!(peer = %connection.peer(), round = number, ?decision, "decision");
        match decision {
            Decision::Hit => {
                let card = round.hit()?;
                deal(connection, Seat::Player, card).await?;
            }
            Decision::Stand => round.stand()?,
        }
        stage = round.stage();
    }

    if stage == Stage::DealerTurn {
        deal(connection, Seat::Dealer, round.dealer_hole()).await?;
        for card in round.play_dealer()? {
            deal(connection, Seat::Dealer, card).await?;
        }
    }

    let summary = round.summary().ok_or(RoundError::InvalidTransition {
        stage: round.stage(),
        action: Action::PlayDealer,
    })?;
    connection
        .send(&Payload::RoundResult(summary).into())
        .await?;
    Ok(summary)
}
