//! UDP transport running on a background tokio task.
//!
//! The task owns the socket. Received datagrams are decoded and forwarded to
//! the engine over an mpsc channel; packets the engine queues are encoded and
//! sent from the same task. One datagram carries one [`Packet`].

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::codec::{self, MAX_DATAGRAM_SIZE};
use crate::error::NetError;
use crate::packets::Packet;

/// Default host port.
pub const DEFAULT_PORT: u16 = 4242;

/// A running UDP socket task and its channels.
#[derive(Debug)]
pub struct Transport {
    local_addr: SocketAddr,
    outgoing: mpsc::UnboundedSender<(SocketAddr, Packet)>,
    incoming: mpsc::UnboundedReceiver<(SocketAddr, Packet)>,
    task: JoinHandle<()>,
}

impl Transport {
    /// Bind the host socket on every interface at `port`.
    ///
    /// In solo mode, taken ports are skipped until a free one is found.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if the port cannot be bound (or, in solo
    /// mode, if no port above it can).
    pub async fn bind_host(port: u16, solo: bool) -> Result<Self, NetError> {
        let mut port = port;
        loop {
            match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await {
                Ok(socket) => return Self::spawn(socket),
                Err(err) if solo && port < u16::MAX => {
                    debug!(port, error = %err, "port taken, trying next");
                    port += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Bind a client socket on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if binding fails.
    pub async fn bind_client() -> Result<Self, NetError> {
        Self::bind((Ipv4Addr::UNSPECIFIED, 0).into()).await
    }

    /// Bind on an explicit address.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Io`] if binding fails.
    pub async fn bind(addr: SocketAddr) -> Result<Self, NetError> {
        let socket = UdpSocket::bind(addr).await?;
        Self::spawn(socket)
    }

    fn spawn(socket: UdpSocket) -> Result<Self, NetError> {
        let local_addr = socket.local_addr()?;
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(socket, out_rx, in_tx));
        info!(%local_addr, "UDP transport started");
        Ok(Self {
            local_addr,
            outgoing: out_tx,
            incoming: in_rx,
            task,
        })
    }

    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The loopback address this socket can be reached on from this host.
    #[must_use]
    pub fn loopback_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.local_addr.port()))
    }

    /// Queue `packet` for `to`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::ChannelClosed`] if the socket task has stopped.
    pub fn send(&self, to: SocketAddr, packet: Packet) -> Result<(), NetError> {
        self.outgoing
            .send((to, packet))
            .map_err(|_| NetError::ChannelClosed)
    }

    /// Next received packet, if one is waiting.
    pub fn try_recv(&mut self) -> Option<(SocketAddr, Packet)> {
        self.incoming.try_recv().ok()
    }

    /// Wait for the next received packet. `None` once the task stopped.
    pub async fn recv(&mut self) -> Option<(SocketAddr, Packet)> {
        self.incoming.recv().await
    }

    /// Stop the socket task.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_socket(
    socket: UdpSocket,
    mut outgoing: mpsc::UnboundedReceiver<(SocketAddr, Packet)>,
    incoming: mpsc::UnboundedSender<(SocketAddr, Packet)>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => match codec::decode::<Packet>(&buf[..len]) {
                    Ok(packet) => {
                        if incoming.send((from, packet)).is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%from, len, error = %err, "dropping malformed datagram"),
                },
                Err(err) => warn!(error = %err, "UDP receive failed"),
            },
            queued = outgoing.recv() => {
                let Some((to, packet)) = queued else { break };
                match codec::encode(&packet) {
                    Ok(bytes) if bytes.len() <= MAX_DATAGRAM_SIZE => {
                        if let Err(err) = socket.send_to(&bytes, to).await {
                            warn!(%to, kind = packet.kind(), error = %err, "UDP send failed");
                        }
                    }
                    Ok(bytes) => warn!(%to, kind = packet.kind(), len = bytes.len(), "packet exceeds datagram size"),
                    Err(err) => warn!(%to, kind = packet.kind(), error = %err, "failed to encode packet"),
                }
            }
        }
    }
    debug!("UDP transport task finished");
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_datagram_roundtrip() {
        let mut host = Transport::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .unwrap();
        let mut client = Transport::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .unwrap();

        client
            .send(host.local_addr(), Packet::HandshakeRequest { is_host: false })
            .unwrap();
        let (from, packet) = tokio::time::timeout(Duration::from_secs(5), host.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(from, client.local_addr());
        assert_eq!(packet, Packet::HandshakeRequest { is_host: false });

        host.send(from, Packet::HandshakeResponse { accepted: true }).unwrap();
        let (_, reply) = tokio::time::timeout(Duration::from_secs(5), client.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, Packet::HandshakeResponse { accepted: true });
    }

    #[tokio::test]
    async fn test_solo_host_skips_taken_port() {
        let first = Transport::bind_host(0, false).await.unwrap();
        let taken = first.local_addr().port();
        let second = Transport::bind_host(taken, true).await.unwrap();
        assert_ne!(second.local_addr().port(), taken);
    }

    #[tokio::test]
    async fn test_non_solo_host_fails_on_taken_port() {
        let first = Transport::bind_host(0, false).await.unwrap();
        let taken = first.local_addr().port();
        assert!(matches!(
            Transport::bind_host(taken, false).await,
            Err(NetError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        let mut host = Transport::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .unwrap();
        let raw = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        raw.send_to(&[0xff, 0xff], host.local_addr()).await.unwrap();
        raw.send_to(&codec::encode(&Packet::Heartbeat).unwrap(), host.local_addr())
            .await
            .unwrap();
        let (_, packet) = tokio::time::timeout(Duration::from_secs(5), host.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(packet, Packet::Heartbeat);
    }

    #[tokio::test]
    async fn test_send_after_stop_fails() {
        let transport = Transport::bind_client().await.unwrap();
        transport.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(matches!(
            transport.send(transport.loopback_addr(), Packet::Heartbeat),
            Err(NetError::ChannelClosed)
        ));
    }
}
