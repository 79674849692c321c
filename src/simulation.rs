//! In-process simulation of a whole group.
//!
//! Every node runs over one [`EmulatedNetwork`] and reads the same [`LogicalClock`].
//! Nodes start one after another, some are crashed partway through, and the recorded
//! membership events show who noticed what and when.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::node::events::Both;
use crate::node::{
    Clock, GossipNode, LogicalClock, MembershipChange, MembershipEvent, NodeId, RecordingEvents,
    TracingEvents,
};
use crate::settings::{ProtocolSettings, SimulationSettings};
use crate::transport::{EmulatedNetwork, EmulatedTransport, FrozenTransportStats};

pub type SimNode =
    GossipNode<EmulatedTransport, LogicalClock, Both<TracingEvents, RecordingEvents>>;

/// Outcome of a finished run
#[derive(Clone, Debug, Serialize)]
pub struct SimulationReport {
    pub ticks: u64,
    pub failed: Vec<NodeId>,
    /// Final membership view of every node that is still up
    pub views: BTreeMap<NodeId, Vec<NodeId>>,
    pub events: Vec<MembershipEvent>,
    pub stats: FrozenTransportStats,
}

impl SimulationReport {
    /// Every surviving node sees exactly the other survivors
    pub fn converged(&self) -> bool {
        self.views.iter().all(|(node, view)| {
            let mut expected: Vec<NodeId> =
                self.views.keys().filter(|peer| *peer != node).copied().collect();
            expected.sort();
            *view == expected
        })
    }

    /// Every survivor that ever saw a failed node removed it exactly once
    pub fn failures_detected(&self) -> bool {
        self.views.keys().all(|node| {
            self.failed.iter().all(|failed| {
                let seen = self.count(*node, *failed, MembershipChange::Added) > 0;
                self.count(*node, *failed, MembershipChange::Removed) == usize::from(seen)
            })
        })
    }

    fn count(&self, node: NodeId, peer: NodeId, change: MembershipChange) -> usize {
        self.events
            .iter()
            .filter(|event| event.node == node && event.peer == peer && event.change == change)
            .count()
    }
}

pub struct Simulation {
    settings: SimulationSettings,
    network: EmulatedNetwork,
    clock: LogicalClock,
    events: RecordingEvents,
    nodes: Vec<SimNode>,
    started: Vec<bool>,
    failed: Vec<NodeId>,
    rng: StdRng,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.now())
            .field("nodes", &self.nodes.len())
            .field("failed", &self.failed)
            .finish()
    }
}

impl Simulation {
    /// Build the group; the first node is always the introducer
    pub fn new(settings: SimulationSettings, protocol: ProtocolSettings) -> Result<Self> {
        settings.validate()?;
        protocol.validate()?;

        let network = if settings.reorder {
            EmulatedNetwork::with_reordering(settings.seed)
        } else {
            EmulatedNetwork::new()
        };
        let clock = LogicalClock::new();
        let events = RecordingEvents::new();

        let mut nodes = Vec::with_capacity(settings.peers);
        for node_id in node_ids(protocol.introducer, settings.peers) {
            let transport = network.attach(node_id)?;
            nodes.push(GossipNode::new(
                node_id,
                protocol.clone(),
                transport,
                clock.clone(),
                Both(TracingEvents, events.clone()),
            ));
        }

        Ok(Self {
            started: vec![false; nodes.len()],
            failed: Vec::new(),
            rng: StdRng::seed_from_u64(settings.seed),
            settings,
            network,
            clock,
            events,
            nodes,
        })
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.now()
    }

    /// Advance the whole group by one tick
    pub fn step(&mut self) -> Result<()> {
        let tick = self.clock.now();

        for (index, node) in self.nodes.iter_mut().enumerate() {
            // A node crashed before its start tick stays down
            if !self.started[index]
                && !node.is_failed()
                && index as u64 * self.settings.start_stagger <= tick
            {
                node.start()?;
                self.started[index] = true;
            }
        }

        if tick == self.settings.fail_at && self.failed.is_empty() {
            self.inject_failures();
        }

        for (index, node) in self.nodes.iter_mut().enumerate() {
            if self.started[index] {
                node.tick();
            }
        }

        self.clock.advance();
        Ok(())
    }

    /// Run to the configured end and summarize
    pub fn run(&mut self) -> Result<SimulationReport> {
        info!(
            "Simulating {} nodes for {} ticks",
            self.nodes.len(),
            self.settings.total_ticks
        );
        while self.clock.now() < self.settings.total_ticks {
            self.step()?;
        }
        Ok(self.report())
    }

    /// Crash one random running node, or half the group, never the introducer
    pub fn inject_failures(&mut self) {
        let mut candidates: Vec<usize> = (1..self.nodes.len())
            .filter(|index| self.started[*index] && !self.nodes[*index].is_failed())
            .collect();
        if candidates.is_empty() {
            return;
        }
        let count = if self.settings.multi_failure {
            (self.nodes.len() / 2).clamp(1, candidates.len())
        } else {
            1
        };
        candidates.shuffle(&mut self.rng);
        for index in candidates.into_iter().take(count) {
            self.fail_node_at(index);
        }
    }

    /// Crash a specific node
    pub fn fail_node(&mut self, node_id: NodeId) -> bool {
        match self.nodes.iter().position(|node| node.node_id() == node_id) {
            Some(index) => {
                self.fail_node_at(index);
                true
            }
            None => false,
        }
    }

    fn fail_node_at(&mut self, index: usize) {
        let node = &mut self.nodes[index];
        if node.is_failed() {
            return;
        }
        node.fail();
        self.failed.push(node.node_id());
        info!("Tick {}: node {} failed", self.clock.now(), node.node_id());
    }

    pub fn node(&self, node_id: NodeId) -> Option<&SimNode> {
        self.nodes.iter().find(|node| node.node_id() == node_id)
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn failed(&self) -> &[NodeId] {
        &self.failed
    }

    pub fn network(&self) -> &EmulatedNetwork {
        &self.network
    }

    pub fn events(&self) -> &RecordingEvents {
        &self.events
    }

    /// Current view of every live node
    pub fn views(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        self.nodes
            .iter()
            .filter(|node| !node.is_failed())
            .map(|node| (node.node_id(), node.membership().all()))
            .collect()
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            ticks: self.clock.now(),
            failed: self.failed.clone(),
            views: self.views(),
            events: self.events.events(),
            stats: self.network.stats(),
        }
    }
}

/// The introducer first, then `{n, 0}` addresses skipping the introducer's
fn node_ids(introducer: NodeId, peers: usize) -> Vec<NodeId> {
    let mut ids = vec![introducer];
    let mut host = 1u32;
    while ids.len() < peers {
        let candidate = NodeId::new(host, 0);
        if candidate != introducer {
            ids.push(candidate);
        }
        host += 1;
    }
    ids
}
