//! Heartbeat membership protocol
//!
//! Each node keeps a [`MembershipTable`] of peers it believes alive. Nodes join through
//! a well-known introducer, then every gossip round bump their own heartbeat, drop
//! peers whose heartbeat stopped advancing, and ping every peer left in the view.
pub mod clock;
pub mod controller;
pub mod events;
pub mod gossip_node;
pub mod membership;
pub mod messages;
pub mod node_id;

pub use clock::{Clock, LogicalClock};
pub use controller::Controller;
pub use events::{
    MembershipChange, MembershipEvent, MembershipEvents, RecordingEvents, TracingEvents,
};
pub use gossip_node::{GossipNode, NodeState, NodeStatus};
pub use membership::{MembershipEntry, MembershipTable, MergeOutcome};
pub use messages::{MembershipMessage, MessageType};
pub use node_id::{NodeId, NODE_ID_LEN};
