//! Transport trait for the membership engine
//!
//! The engine never waits on the network: sends are fire-and-forget and receiving
//! drains whatever has already arrived for this node.

use crate::error::Result;
use crate::node::NodeId;

/// Raw datagram delivery between two endpoints
pub trait Transport {
    /// Hand `data` to the network for delivery to `to`. Best-effort; an error means
    /// the message could not even be queued locally.
    fn send(&self, from: NodeId, to: NodeId, data: &[u8]) -> Result<()>;

    /// Take every message queued for this node without blocking
    fn receive_all(&self) -> Vec<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, from: NodeId, to: NodeId, data: &[u8]) -> Result<()> {
        (**self).send(from, to, data)
    }

    fn receive_all(&self) -> Vec<Vec<u8>> {
        (**self).receive_all()
    }
}
