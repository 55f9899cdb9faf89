//! Waits for server offers on the well-known discovery port.

use crate::Result;
use leafjack_types::{Message, MessageType};
use socket2::{Domain, Protocol, Socket, Type};
use std::{net::SocketAddr, time::Duration};
use tokio::{net::UdpSocket, time};
use tracing::debug;

/// A server that advertised itself, with the address its sessions accept on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerOffer {
    pub addr: SocketAddr,
    pub server_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discovery {
    Found(ServerOffer),
    /// No valid offer arrived before the deadline.
    Retry,
}

pub struct Listener {
    socket: UdpSocket,
}

impl Listener {
    /// Binds with address and port reuse, so several players on one host can
    /// all hear the same broadcasts. Offers only queue up while the listener
    /// exists; drop it between attempts to discard them.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        let socket = UdpSocket::from_std(socket.into())?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Returns the first valid offer received within `timeout`. Datagrams that
    /// are not offers are dropped and do not extend the deadline.
    pub async fn wait(&self, timeout: Duration) -> Result<Discovery> {
        let deadline = time::Instant::now() + timeout;
        // Room for one oversized datagram so it fails length validation
        // instead of being silently cut to a valid size.
        let mut buf = [0u8; MessageType::Offer.packet_size() + 1];
        loop {
            let (len, from) =
                match time::timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                    Ok(received) => received?,
                    Err(_) => return Ok(Discovery::Retry),
                };
            match Message::decode(&buf[..len]) {
                Ok(Message::Offer(offer)) => {
                    let addr = SocketAddr::new(from.ip(), offer.port);
                    debug!(%from, %addr, server = %offer.server_name, "received offer");
                    return Ok(Discovery::Found(ServerOffer {
                        addr,
                        server_name: offer.server_name,
                    }));
                }
                Ok(other) => {
                    debug!(%from, kind = ?other.message_type(), "ignoring non-offer datagram")
                }
                Err(err) => debug!(%from, ?err, "dropping malformed datagram"),
            }
        }
    }
}
