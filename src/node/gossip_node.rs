use serde::Serialize;
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::events::MembershipEvents;
use super::membership::{MembershipEntry, MembershipTable, MergeOutcome};
use super::messages::MembershipMessage;
use super::NodeId;
use crate::error::Result;
use crate::node_error;
use crate::settings::ProtocolSettings;
use crate::transport::Transport;

/// Lifecycle of a group member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Waiting for a join reply
    Joining,
    /// In the group: runs gossip rounds
    Member,
    /// Crashed; ignores the network and the scheduler
    Failed,
    /// Left the group locally; table cleared
    Stopped,
}

/// Serializable view of one node, for status output
#[derive(Clone, Debug, Serialize)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub state: NodeState,
    pub heartbeat: u64,
    pub members: Vec<MembershipEntry>,
}

/// Heartbeat membership protocol run by one node.
///
/// Driven by an external scheduler calling [`GossipNode::tick`] once per time unit:
/// every tick drains the transport, and members then run one gossip round. Nothing
/// here blocks, and a node is never ticked concurrently with itself.
pub struct GossipNode<T, C, E> {
    node_id: NodeId,
    heartbeat: u64,
    state: NodeState,
    settings: ProtocolSettings,
    membership: MembershipTable,
    transport: T,
    clock: C,
    events: E,
}

impl<T, C, E> std::fmt::Debug for GossipNode<T, C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipNode")
            .field("node_id", &self.node_id)
            .field("state", &self.state)
            .field("heartbeat", &self.heartbeat)
            .field("members", &self.membership.len())
            .finish()
    }
}

impl<T, C, E> GossipNode<T, C, E>
where
    T: Transport,
    C: Clock,
    E: MembershipEvents,
{
    pub fn new(
        node_id: NodeId,
        settings: ProtocolSettings,
        transport: T,
        clock: C,
        events: E,
    ) -> Self {
        Self {
            node_id,
            heartbeat: 0,
            state: NodeState::Joining,
            settings,
            membership: MembershipTable::new(node_id),
            transport,
            clock,
            events,
        }
    }

    /// Bootstrap: the introducer starts the group, everyone else asks to join it.
    ///
    /// A node without an address cannot take part at all and the error is fatal, as is
    /// starting a crashed node. A join request that fails to send is not retried.
    pub fn start(&mut self) -> Result<()> {
        if self.node_id.is_null() {
            return Err(node_error!("Node has no address, cannot start"));
        }
        if self.state == NodeState::Failed {
            return Err(node_error!("[{}] Node has failed, cannot start", self.node_id));
        }
        self.settings.validate()?;
        self.membership.clear();
        self.heartbeat = 0;

        if self.node_id == self.settings.introducer {
            info!("[{}] Starting up group", self.node_id);
            self.state = NodeState::Member;
            return Ok(());
        }

        self.state = NodeState::Joining;
        let request = MembershipMessage::JoinRequest {
            sender: self.node_id,
            heartbeat: self.heartbeat,
        };
        info!(
            "[{}] Trying to join via {}",
            self.node_id, self.settings.introducer
        );
        if let Err(e) = self.send(self.settings.introducer, &request) {
            warn!("[{}] Join request not sent: {}", self.node_id, e);
        }
        Ok(())
    }

    /// One scheduler step: handle everything that arrived, then gossip if in the group
    pub fn tick(&mut self) {
        if matches!(self.state, NodeState::Failed | NodeState::Stopped) {
            return;
        }

        self.check_messages();

        if self.state == NodeState::Member {
            self.run_gossip_round();
        }
    }

    /// Drain the transport and handle each message; returns how many were handled
    pub fn check_messages(&mut self) -> usize {
        if matches!(self.state, NodeState::Failed | NodeState::Stopped) {
            return 0;
        }

        let mut handled = 0;
        for data in self.transport.receive_all() {
            match self.handle_message(&data) {
                Ok(()) => handled += 1,
                Err(e) => debug!("[{}] Dropped inbound message: {}", self.node_id, e),
            }
        }
        handled
    }

    /// Decode and apply one inbound message. Malformed input leaves all state untouched.
    pub fn handle_message(&mut self, data: &[u8]) -> Result<()> {
        let message = MembershipMessage::decode(data)?;
        let now = self.clock.now();
        debug!(
            "[{}] Received {} from {}",
            self.node_id,
            message.message_type(),
            message.sender()
        );

        match message {
            MembershipMessage::JoinRequest { sender, heartbeat } => {
                self.merge(sender, heartbeat, now);
                let reply = MembershipMessage::JoinReply {
                    sender: self.node_id,
                    entries: self.membership.snapshot(),
                };
                if let Err(e) = self.send(sender, &reply) {
                    warn!("[{}] Join reply to {} not sent: {}", self.node_id, sender, e);
                }
            }
            MembershipMessage::JoinReply { sender, entries } => {
                if self.state == NodeState::Joining {
                    info!(
                        "[{}] Joined the group via {} with {} known peers",
                        self.node_id,
                        sender,
                        entries.len()
                    );
                    self.state = NodeState::Member;
                }
                for entry in entries {
                    self.merge(entry.node_id, entry.heartbeat, now);
                }
            }
            MembershipMessage::Ping { sender, heartbeat } => {
                self.merge(sender, heartbeat, now);
            }
        }

        Ok(())
    }

    /// Advance our heartbeat, evict silent peers and ping everyone still in the view
    pub fn run_gossip_round(&mut self) {
        if self.state != NodeState::Member {
            return;
        }

        self.heartbeat += 1;
        let now = self.clock.now();

        for removed in self
            .membership
            .sweep_expired(now, self.settings.remove_timeout)
        {
            self.events.on_membership_remove(self.node_id, removed);
        }

        let ping = MembershipMessage::Ping {
            sender: self.node_id,
            heartbeat: self.heartbeat,
        };
        let data = ping.encode();
        let peers = self.membership.all();
        let mut failed_sends = 0;
        for peer in &peers {
            if let Err(e) = self.transport.send(self.node_id, *peer, &data) {
                failed_sends += 1;
                debug!("[{}] Ping to {} not sent: {}", self.node_id, peer, e);
            }
        }

        debug!(
            "[{}] Gossip round {}: pinged {} peers ({} failed)",
            self.node_id,
            self.heartbeat,
            peers.len(),
            failed_sends
        );
    }

    /// Crash this node: from now on it neither reads messages nor gossips
    pub fn fail(&mut self) {
        info!("[{}] Node failed", self.node_id);
        self.state = NodeState::Failed;
    }

    /// Leave the group locally and drop the membership view
    pub fn finish(&mut self) {
        info!(
            "[{}] Shutting down with {} peers in view",
            self.node_id,
            self.membership.len()
        );
        self.membership.clear();
        self.state = NodeState::Stopped;
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn heartbeat(&self) -> u64 {
        self.heartbeat
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_member(&self) -> bool {
        self.state == NodeState::Member
    }

    pub fn is_failed(&self) -> bool {
        self.state == NodeState::Failed
    }

    pub fn membership(&self) -> &MembershipTable {
        &self.membership
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            node_id: self.node_id,
            state: self.state,
            heartbeat: self.heartbeat,
            members: self.membership.snapshot(),
        }
    }

    fn merge(&mut self, node_id: NodeId, heartbeat: u64, now: u64) -> MergeOutcome {
        let outcome = self.membership.merge(node_id, heartbeat, now);
        if outcome == MergeOutcome::Inserted {
            self.events.on_membership_add(self.node_id, node_id);
        }
        outcome
    }

    fn send(&self, to: NodeId, message: &MembershipMessage) -> Result<()> {
        self.transport.send(self.node_id, to, &message.encode())
    }
}
