//! Accept loop: one task per player connection.

use crate::session;
use leafjack_client::{
    backoff::{jittered_backoff, next_backoff},
    Connection, Error,
};
use leafjack_execution::Deck;
use std::{io, net::SocketAddr, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    time,
};
use tracing::{error, info, warn};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(2);

pub struct Server {
    listener: TcpListener,
    session_timeout: Duration,
}

impl Server {
    pub async fn bind(addr: SocketAddr, session_timeout: Duration) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            session_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts forever. A failing accept (for example, out of file
    /// descriptors) is retried after a jittered backoff.
    pub async fn run(self) {
        let mut backoff = ACCEPT_BACKOFF;
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    backoff = ACCEPT_BACKOFF;
                    info!(%peer, "accepted connection");
                    tokio::spawn(handle(stream, self.session_timeout));
                }
                Err(err) => {
                    warn!(?err, "accept failed");
                    let delay = jittered_backoff(&mut rand::thread_rng(), backoff);
                    time::sleep(delay).await;
                    backoff = next_backoff(backoff, MAX_ACCEPT_BACKOFF);
                }
            }
        }
    }
}

async fn handle(stream: TcpStream, session_timeout: Duration) {
    let connection = match Connection::new(stream, session_timeout) {
        Ok(connection) => connection,
        Err(err) => {
            warn!(?err, "failed to set up connection");
            return;
        }
    };
    let peer = connection.peer();
    match session::run(connection, Deck::new).await {
        Ok(report) => info!(
            %peer,
            client = %report.client_name,
            rounds = report.rounds,
            wins = report.tally.wins,
            losses = report.tally.losses,
            ties = report.tally.ties,
            "session finished"
        ),
        Err(Error::ConnectionClosed) => info!(%peer, "player left mid-session"),
        Err(err @ Error::Engine(_)) => error!(%peer, %err, "round engine failed"),
        Err(err @ Error::ProtocolMismatch(_)) => warn!(%peer, %err, "rejected connection"),
        Err(err) => warn!(%peer, %err, "session ended early"),
    }
}
