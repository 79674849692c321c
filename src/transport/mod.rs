//! Transports
//!
//! Provides the [`Transport`] seam the membership engine sends and receives through,
//! an in-process emulated network for simulations and tests, and a UDP transport
//! for running nodes as separate processes.

pub mod common;
pub mod emulated;
pub mod traits;
pub mod udp;

pub use common::{FrozenTransportStats, TransportStats};
pub use emulated::{EmulatedNetwork, EmulatedTransport, NodeTraffic};
pub use traits::Transport;
pub use udp::UdpTransport;
