//! UDP Transport
//!
//! One tokio UDP socket per node. The socket's bound address is the node's identity, so
//! peers reply to the address they learned from the message header.
//!
//! The engine calls the transport synchronously from inside a tick, so sends and drains use
//! the `try_*` calls and never await. The runtime's reactor keeps readiness current between
//! ticks.
use std::io::ErrorKind;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info};

use super::common::{FrozenTransportStats, TransportStats};
use super::Transport;
use crate::error::{MurmurError, Result};
use crate::node::NodeId;
use crate::transport_error;

/// Largest datagram we expect; a join reply for a few thousand peers fits
pub const MAX_DATAGRAM_SIZE: usize = 65536;

#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    local: NodeId,
    stats: Arc<TransportStats>,
}

impl UdpTransport {
    /// Bind the node's socket. Failing here means the node has no address to run on.
    pub async fn bind(addr: SocketAddrV4) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| transport_error!("Socket bind to {} failed: {}", addr, e))?;

        let local = match socket.local_addr()? {
            SocketAddr::V4(local) => NodeId::from(local),
            SocketAddr::V6(local) => {
                return Err(MurmurError::Config(format!(
                    "Bound to IPv6 address {}, node identities are IPv4 only",
                    local
                )))
            }
        };
        info!("[{}] UDP transport bound", local);

        Ok(Self {
            socket,
            local,
            stats: Arc::new(TransportStats::default()),
        })
    }

    pub fn local_id(&self) -> NodeId {
        self.local
    }

    pub fn stats(&self) -> FrozenTransportStats {
        self.stats.freeze()
    }

    /// Wait until the reactor reports the socket writable. A fresh socket has no readiness
    /// recorded yet, so the first `try_send_to` could otherwise report `WouldBlock`.
    pub async fn writable(&self) -> Result<()> {
        self.socket
            .writable()
            .await
            .map_err(|e| transport_error!("[{}] Socket not writable: {}", self.local, e))
    }
}

impl Transport for UdpTransport {
    fn send(&self, _from: NodeId, to: NodeId, data: &[u8]) -> Result<()> {
        match self.socket.try_send_to(data, SocketAddr::V4(to.socket_addr())) {
            Ok(_write_size) => {
                self.stats.record_sent();
                Ok(())
            }
            Err(e) => {
                self.stats.record_send_error();
                Err(transport_error!("UDP send to {} failed: {}", to, e))
            }
        }
    }

    fn receive_all(&self) -> Vec<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let mut received = Vec::new();

        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, _addr)) => received.push(buf[..len].to_vec()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                // An earlier send hit a closed port; the datagrams behind it are fine
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset
                    ) =>
                {
                    self.stats.record_receive_error();
                    debug!("[{}] Peer unreachable: {}", self.local, e);
                }
                Err(e) => {
                    // Leave anything else queued for the next drain
                    self.stats.record_receive_error();
                    debug!("[{}] UDP receive error: {}", self.local, e);
                    break;
                }
            }
        }

        self.stats.record_received(received.len() as u64);
        received
    }
}
