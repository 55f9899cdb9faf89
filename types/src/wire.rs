//! Fixed-layout packet codec.
//!
//! Every packet is `[magic:u32 BE][type:u8][body]`. The type byte fixes the
//! body size, so there are no delimiters or length prefixes:
//!
//! | type             | byte   | body                                                   | size |
//! |------------------|--------|--------------------------------------------------------|------|
//! | `Offer`          | `0x02` | `[port:u16][server_name:32]`                           | 39   |
//! | `Request`        | `0x03` | `[rounds:u8][client_name:32]`                          | 38   |
//! | `Decision`       | `0x04` | `"Hittt"` or `"Stand"`                                 | 10   |
//! | `RoundStart`     | `0x05` | `[round:u8][upcard rank:u16][upcard suit:u8]`          | 9    |
//! | `TurnPrompt`     | `0x06` | `[player_total:u8][dealer_showing:u8][reserved:2]`     | 9    |
//! | `CardDealt`      | `0x07` | `[seat:u8][rank:u16][suit:u8]`                         | 9    |
//! | `RoundResult`    | `0x08` | `[outcome:u8][player_total:u8][dealer_total:u8][0]`    | 9    |
//! | `SessionSummary` | `0x09` | `[wins:u8][losses:u8][ties:u8][0]`                     | 9    |
//!
//! Names are UTF-8, NUL-padded to [`NAME_SIZE`] bytes and truncated on a char
//! boundary when longer. Reserved bytes are written as zero and ignored.

use crate::{Card, Outcome, Rank, RoundSummary, Suit, Tally};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Magic cookie leading every packet.
pub const MAGIC: u32 = 0xabcd_dcba;

/// Well-known UDP port offers are broadcast to.
pub const OFFER_PORT: u16 = 13122;

/// Width of the padded server/client name fields.
pub const NAME_SIZE: usize = 32;

/// Magic plus type byte.
pub const HEADER_SIZE: usize = 5;

const HIT: &[u8; 5] = b"Hittt";
const STAND: &[u8; 5] = b"Stand";

/// Errors that can occur while decoding a packet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid magic cookie {found:#010x}")]
    InvalidMagic { found: u32 },

    /// The buffer is shorter than a header, or its length differs from the
    /// fixed size of its declared type.
    #[error("truncated packet: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unknown message type {0:#04x}")]
    UnknownType(u8),

    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: u16 },

    #[error("invalid decision bytes {0:?}")]
    InvalidDecision([u8; 5]),
}

/// Message type byte. For offers and requests this doubles as the protocol
/// version check: a peer speaking anything else fails to decode.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Offer = 0x02,
    Request = 0x03,
    Decision = 0x04,
    RoundStart = 0x05,
    TurnPrompt = 0x06,
    CardDealt = 0x07,
    RoundResult = 0x08,
    SessionSummary = 0x09,
}

impl MessageType {
    /// Total packet size (header included) for this type.
    pub const fn packet_size(self) -> usize {
        match self {
            MessageType::Offer => HEADER_SIZE + 2 + NAME_SIZE,
            MessageType::Request => HEADER_SIZE + 1 + NAME_SIZE,
            MessageType::Decision => HEADER_SIZE + 5,
            MessageType::RoundStart
            | MessageType::TurnPrompt
            | MessageType::CardDealt
            | MessageType::RoundResult
            | MessageType::SessionSummary => HEADER_SIZE + 4,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x02 => Ok(MessageType::Offer),
            0x03 => Ok(MessageType::Request),
            0x04 => Ok(MessageType::Decision),
            0x05 => Ok(MessageType::RoundStart),
            0x06 => Ok(MessageType::TurnPrompt),
            0x07 => Ok(MessageType::CardDealt),
            0x08 => Ok(MessageType::RoundResult),
            0x09 => Ok(MessageType::SessionSummary),
            other => Err(CodecError::UnknownType(other)),
        }
    }
}

/// Server advertisement, broadcast over UDP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Offer {
    pub port: u16,
    pub server_name: String,
}

/// First packet a player sends on a fresh TCP connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub rounds: u8,
    pub client_name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Hit,
    Stand,
}

/// Who a dealt card belongs to.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seat {
    Player = 0,
    Dealer = 1,
}

/// In-session messages exchanged after the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    RoundStart { round: u8, dealer_upcard: Card },
    TurnPrompt { player_total: u8, dealer_showing: u8 },
    Decision(Decision),
    CardDealt { seat: Seat, card: Card },
    RoundResult(RoundSummary),
    SessionSummary(Tally),
}

impl Payload {
    /// Turn-opening payloads must be answered before the sender may send again.
    pub fn opens_turn(&self) -> bool {
        matches!(self, Payload::TurnPrompt { .. } | Payload::Decision(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Offer(Offer),
    Request(Request),
    Payload(Payload),
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        Message::Payload(payload)
    }
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Offer(_) => MessageType::Offer,
            Message::Request(_) => MessageType::Request,
            Message::Payload(payload) => match payload {
                Payload::RoundStart { .. } => MessageType::RoundStart,
                Payload::TurnPrompt { .. } => MessageType::TurnPrompt,
                Payload::Decision(_) => MessageType::Decision,
                Payload::CardDealt { .. } => MessageType::CardDealt,
                Payload::RoundResult(_) => MessageType::RoundResult,
                Payload::SessionSummary(_) => MessageType::SessionSummary,
            },
        }
    }

    pub fn encode(&self) -> Bytes {
        let kind = self.message_type();
        let mut buf = BytesMut::with_capacity(kind.packet_size());
        buf.put_u32(MAGIC);
        buf.put_u8(kind as u8);
        match self {
            Message::Offer(offer) => {
                buf.put_u16(offer.port);
                put_name(&mut buf, &offer.server_name);
            }
            Message::Request(request) => {
                buf.put_u8(request.rounds);
                put_name(&mut buf, &request.client_name);
            }
            Message::Payload(Payload::RoundStart {
                round,
                dealer_upcard,
            }) => {
                buf.put_u8(*round);
                put_card(&mut buf, *dealer_upcard);
            }
            Message::Payload(Payload::TurnPrompt {
                player_total,
                dealer_showing,
            }) => {
                buf.put_u8(*player_total);
                buf.put_u8(*dealer_showing);
                buf.put_bytes(0, 2);
            }
            Message::Payload(Payload::Decision(decision)) => {
                buf.put_slice(match decision {
                    Decision::Hit => HIT,
                    Decision::Stand => STAND,
                });
            }
            Message::Payload(Payload::CardDealt { seat, card }) => {
                buf.put_u8(*seat as u8);
                put_card(&mut buf, *card);
            }
            Message::Payload(Payload::RoundResult(summary)) => {
                buf.put_u8(summary.outcome as u8);
                buf.put_u8(summary.player_total);
                buf.put_u8(summary.dealer_total);
                buf.put_u8(0);
            }
            Message::Payload(Payload::SessionSummary(tally)) => {
                buf.put_u8(tally.wins);
                buf.put_u8(tally.losses);
                buf.put_u8(tally.ties);
                buf.put_u8(0);
            }
        }
        debug_assert_eq!(buf.len(), kind.packet_size());
        buf.freeze()
    }

    /// Decodes exactly one packet. The buffer length must equal the fixed
    /// size of the declared type.
    pub fn decode(packet: &[u8]) -> Result<Self, CodecError> {
        if packet.len() < 4 {
            return Err(CodecError::Truncated {
                expected: HEADER_SIZE,
                actual: packet.len(),
            });
        }
        let mut reader = packet;
        let found = reader.get_u32();
        if found != MAGIC {
            return Err(CodecError::InvalidMagic { found });
        }
        if !reader.has_remaining() {
            return Err(CodecError::Truncated {
                expected: HEADER_SIZE,
                actual: packet.len(),
            });
        }
        let kind = MessageType::try_from(reader.get_u8())?;
        if packet.len() != kind.packet_size() {
            return Err(CodecError::Truncated {
                expected: kind.packet_size(),
                actual: packet.len(),
            });
        }

        let message = match kind {
            MessageType::Offer => {
                let port = reader.get_u16();
                let server_name = get_name(&mut reader);
                Message::Offer(Offer { port, server_name })
            }
            MessageType::Request => {
                let rounds = reader.get_u8();
                let client_name = get_name(&mut reader);
                Message::Request(Request {
                    rounds,
                    client_name,
                })
            }
            MessageType::Decision => {
                let mut raw = [0u8; 5];
                reader.copy_to_slice(&mut raw);
                let decision = match &raw {
                    HIT => Decision::Hit,
                    STAND => Decision::Stand,
                    _ => return Err(CodecError::InvalidDecision(raw)),
                };
                Payload::Decision(decision).into()
            }
            MessageType::RoundStart => {
                let round = reader.get_u8();
                let dealer_upcard = get_card(&mut reader)?;
                Payload::RoundStart {
                    round,
                    dealer_upcard,
                }
                .into()
            }
            MessageType::TurnPrompt => {
                let player_total = reader.get_u8();
                let dealer_showing = reader.get_u8();
                Payload::TurnPrompt {
                    player_total,
                    dealer_showing,
                }
                .into()
            }
            MessageType::CardDealt => {
                let seat = match reader.get_u8() {
                    0 => Seat::Player,
                    1 => Seat::Dealer,
                    other => {
                        return Err(CodecError::InvalidField {
                            field: "seat",
                            value: u16::from(other),
                        })
                    }
                };
                let card = get_card(&mut reader)?;
                Payload::CardDealt { seat, card }.into()
            }
            MessageType::RoundResult => {
                let outcome =
                    Outcome::try_from(reader.get_u8()).map_err(|value| CodecError::InvalidField {
                        field: "outcome",
                        value: u16::from(value),
                    })?;
                let player_total = reader.get_u8();
                let dealer_total = reader.get_u8();
                Payload::RoundResult(RoundSummary {
                    outcome,
                    player_total,
                    dealer_total,
                })
                .into()
            }
            MessageType::SessionSummary => Payload::SessionSummary(Tally {
                wins: reader.get_u8(),
                losses: reader.get_u8(),
                ties: reader.get_u8(),
            })
            .into(),
        };
        Ok(message)
    }
}

/// Validates a packet header and returns the full size of the packet it
/// starts, so stream readers can read exactly one packet.
pub fn packet_size(header: &[u8; HEADER_SIZE]) -> Result<usize, CodecError> {
    let found = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    if found != MAGIC {
        return Err(CodecError::InvalidMagic { found });
    }
    MessageType::try_from(header[4]).map(MessageType::packet_size)
}

/// Longest prefix of `name` that fits the name field without splitting a char.
pub fn truncate_name(name: &str) -> &str {
    let mut end = name.len().min(NAME_SIZE);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn put_name(buf: &mut BytesMut, name: &str) {
    let name = truncate_name(name);
    buf.put_slice(name.as_bytes());
    buf.put_bytes(0, NAME_SIZE - name.len());
}

fn get_name(reader: &mut &[u8]) -> String {
    let mut raw = [0u8; NAME_SIZE];
    reader.copy_to_slice(&mut raw);
    let end = raw
        .iter()
        .rposition(|&b| b != 0 && b != b' ')
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn put_card(buf: &mut BytesMut, card: Card) {
    buf.put_u16(u16::from(card.rank as u8));
    buf.put_u8(card.suit as u8);
}

fn get_card(reader: &mut &[u8]) -> Result<Card, CodecError> {
    let raw_rank = reader.get_u16();
    let rank = u8::try_from(raw_rank)
        .ok()
        .and_then(|value| Rank::try_from(value).ok())
        .ok_or(CodecError::InvalidField {
            field: "rank",
            value: raw_rank,
        })?;
    let suit = Suit::try_from(reader.get_u8()).map_err(|value| CodecError::InvalidField {
        field: "suit",
        value: u16::from(value),
    })?;
    Ok(Card::new(rank, suit))
}
