//! Periodic UDP offers announcing where sessions are accepted.

use bytes::Bytes;
use leafjack_types::{Message, Offer};
use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};
use tokio::{
    net::UdpSocket,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, trace, warn};

pub struct Broadcaster {
    socket: UdpSocket,
    target: SocketAddr,
    interval: Duration,
    packet: Bytes,
}

impl Broadcaster {
    /// Binds an ephemeral broadcast-enabled socket. The offer is encoded once
    /// and resent unchanged on every tick.
    pub async fn bind(offer: Offer, target: SocketAddr, interval: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;
        debug!(%target, port = offer.port, server = %offer.server_name, "broadcaster ready");
        Ok(Self {
            socket,
            target,
            interval,
            packet: Message::Offer(offer).encode(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sends offers until the task is dropped. Send failures are logged and
    /// retried on the next tick.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.socket.send_to(&self.packet, self.target).await {
                Ok(_) => trace!(target = %self.target, "offer sent"),
                Err(err) => warn!(target = %self.target, ?err, "failed to send offer"),
            }
        }
    }
}
