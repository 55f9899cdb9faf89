//! One TCP session stream, framed into fixed-size packets.

use crate::{Error, Result};
use leafjack_types::{packet_size, Message, HEADER_SIZE};
use std::{future::Future, io, net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};
use tracing::trace;

/// A session stream with a per-operation timeout.
///
/// The protocol is half-duplex around decisions: after sending a turn prompt
/// or a decision, the sender must receive before it may send again.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
    awaiting_reply: bool,
}

impl Connection {
    pub fn new(stream: TcpStream, timeout: Duration) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            peer,
            timeout,
            awaiting_reply: false,
        })
    }

    pub async fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = bounded(timeout, TcpStream::connect(addr)).await?;
        Self::new(stream, timeout)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn send(&mut self, message: &Message) -> Result<()> {
        if self.awaiting_reply {
            return Err(Error::OutOfTurn);
        }
        let packet = message.encode();
        bounded(self.timeout, self.stream.write_all(&packet)).await?;
        trace!(peer = %self.peer, kind = ?message.message_type(), "sent");
        if let Message::Payload(payload) = message {
            self.awaiting_reply = payload.opens_turn();
        }
        Ok(())
    }

    /// Reads exactly one packet. The header decides how many more bytes
    /// belong to it, so a bad magic or type is rejected before the body.
    pub async fn recv(&mut self) -> Result<Message> {
        let mut header = [0u8; HEADER_SIZE];
        bounded(self.timeout, self.stream.read_exact(&mut header)).await?;
        let size = packet_size(&header)?;

        let mut packet = vec![0u8; size];
        packet[..HEADER_SIZE].copy_from_slice(&header);
        bounded(self.timeout, self.stream.read_exact(&mut packet[HEADER_SIZE..])).await?;

        let message = Message::decode(&packet)?;
        trace!(peer = %self.peer, kind = ?message.message_type(), "received");
        self.awaiting_reply = false;
        Ok(message)
    }

    /// Flushes and shuts down the write half so the peer sees a clean EOF.
    pub async fn close(mut self) -> Result<()> {
        bounded(self.timeout, self.stream.shutdown()).await
    }
}

async fn bounded<T>(timeout: Duration, fut: impl Future<Output = io::Result<T>>) -> Result<T> {
    match time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => Error::ConnectionClosed,
            _ => Error::Io(err),
        }),
        Err(_) => Err(Error::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafjack_types::{CodecError, Decision, Payload, Request, Tally};
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn pair(timeout: Duration) -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(Connection::connect(addr, timeout), listener.accept());
        let (stream, _) = accepted.unwrap();
        (client.unwrap(), Connection::new(stream, timeout).unwrap())
    }

    #[tokio::test]
    async fn packets_cross_the_stream_intact() {
        let (mut client, mut server) = pair(TIMEOUT).await;
        let request = Message::Request(Request {
            rounds: 3,
            client_name: "table four".to_string(),
        });
        client.send(&request).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), request);

        let summary = Message::from(Payload::SessionSummary(Tally {
            wins: 1,
            losses: 1,
            ties: 1,
        }));
        server.send(&summary).await.unwrap();
        assert_eq!(client.recv().await.unwrap(), summary);
    }

    #[tokio::test]
    async fn turn_prompt_blocks_sender_until_reply() {
        let (mut client, mut server) = pair(TIMEOUT).await;
        let prompt = Message::from(Payload::TurnPrompt {
            player_total: 12,
            dealer_showing: 10,
        });
        server.send(&prompt).await.unwrap();
        assert!(matches!(server.send(&prompt).await, Err(Error::OutOfTurn)));

        assert_eq!(client.recv().await.unwrap(), prompt);
        let hit = Message::from(Payload::Decision(Decision::Hit));
        client.send(&hit).await.unwrap();
        assert!(matches!(client.send(&hit).await, Err(Error::OutOfTurn)));

        assert_eq!(server.recv().await.unwrap(), hit);
        server.send(&prompt).await.unwrap();
    }

    #[tokio::test]
    async fn peer_close_is_reported() {
        let (mut client, server) = pair(TIMEOUT).await;
        drop(server);
        assert!(matches!(client.recv().await, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let timeout = Duration::from_millis(50);
        let (mut client, _server) = pair(timeout).await;
        assert!(matches!(client.recv().await, Err(Error::Timeout(t)) if t == timeout));
    }

    #[tokio::test]
    async fn bad_magic_is_rejected_from_header() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut raw = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();
        let mut server = Connection::new(stream, TIMEOUT).unwrap();

        raw.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
        assert!(matches!(
            server.recv().await,
            Err(Error::Codec(CodecError::InvalidMagic { .. }))
        ));
    }
}
