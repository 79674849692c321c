//! In-process emulated network
//!
//! Many nodes of one process share an [`EmulatedNetwork`]; each gets an
//! [`EmulatedTransport`] bound to its own address. Messages are queued per destination
//! and handed over whole. With reordering enabled every drain returns the queued
//! messages in a random order, modelling an unordered network without losing or
//! duplicating anything.
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::common::{FrozenTransportStats, TransportStats};
use super::Transport;
use crate::error::Result;
use crate::node::NodeId;
use crate::{config_error, transport_error};

/// Per-address message counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeTraffic {
    pub sent: u64,
    pub received: u64,
}

#[derive(Debug, Default)]
struct NetworkState {
    queues: HashMap<NodeId, VecDeque<Vec<u8>>>,
    traffic: HashMap<NodeId, NodeTraffic>,
    reorder: Option<StdRng>,
}

/// Shared in-memory network; clones refer to the same network
#[derive(Clone, Debug, Default)]
pub struct EmulatedNetwork {
    state: Arc<Mutex<NetworkState>>,
    stats: Arc<TransportStats>,
}

impl EmulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver each drained batch in a random order chosen from `seed`
    pub fn with_reordering(seed: u64) -> Self {
        let network = Self::new();
        if let Ok(mut state) = network.state.lock() {
            state.reorder = Some(StdRng::seed_from_u64(seed));
        }
        network
    }

    /// Register `node_id` on the network and return its transport handle
    pub fn attach(&self, node_id: NodeId) -> Result<EmulatedTransport> {
        if node_id.is_null() {
            return Err(config_error!("Cannot attach the null address"));
        }
        let mut state = self.lock()?;
        if state.queues.contains_key(&node_id) {
            return Err(config_error!("Address {} is already attached", node_id));
        }
        state.queues.insert(node_id, VecDeque::new());
        state.traffic.entry(node_id).or_default();
        debug!("[{}] Attached to emulated network", node_id);

        Ok(EmulatedTransport {
            local: node_id,
            network: self.clone(),
        })
    }

    /// Drop an address; anything still queued for it is discarded
    pub fn detach(&self, node_id: NodeId) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(queue) = state.queues.remove(&node_id) {
                debug!(
                    "[{}] Detached from emulated network, {} messages discarded",
                    node_id,
                    queue.len()
                );
            }
        }
    }

    pub fn is_attached(&self, node_id: NodeId) -> bool {
        self.state
            .lock()
            .map(|state| state.queues.contains_key(&node_id))
            .unwrap_or(false)
    }

    /// Number of messages waiting for `node_id`
    pub fn pending(&self, node_id: NodeId) -> usize {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.queues.get(&node_id).map(VecDeque::len))
            .unwrap_or(0)
    }

    pub fn traffic(&self, node_id: NodeId) -> NodeTraffic {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.traffic.get(&node_id).copied())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> FrozenTransportStats {
        self.stats.freeze()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, NetworkState>> {
        self.state
            .lock()
            .map_err(|e| transport_error!("Emulated network lock poisoned: {}", e))
    }

    fn enqueue(&self, from: NodeId, to: NodeId, data: &[u8]) -> Result<()> {
        let mut state = self.lock()?;
        let Some(queue) = state.queues.get_mut(&to) else {
            self.stats.record_send_error();
            return Err(transport_error!("No node attached at {}", to));
        };
        queue.push_back(data.to_vec());
        state.traffic.entry(from).or_default().sent += 1;
        self.stats.record_sent();
        Ok(())
    }

    fn drain(&self, node_id: NodeId) -> Vec<Vec<u8>> {
        let Ok(mut state) = self.state.lock() else {
            self.stats.record_receive_error();
            return Vec::new();
        };
        let state = &mut *state;
        let mut messages: Vec<Vec<u8>> = match state.queues.get_mut(&node_id) {
            Some(queue) => queue.drain(..).collect(),
            None => return Vec::new(),
        };
        if let Some(rng) = state.reorder.as_mut() {
            messages.shuffle(rng);
        }
        state.traffic.entry(node_id).or_default().received += messages.len() as u64;
        self.stats.record_received(messages.len() as u64);
        messages
    }
}

/// One node's handle on an [`EmulatedNetwork`]
#[derive(Clone, Debug)]
pub struct EmulatedTransport {
    local: NodeId,
    network: EmulatedNetwork,
}

impl EmulatedTransport {
    pub fn local_id(&self) -> NodeId {
        self.local
    }
}

impl Transport for EmulatedTransport {
    fn send(&self, from: NodeId, to: NodeId, data: &[u8]) -> Result<()> {
        self.network.enqueue(from, to, data)
    }

    fn receive_all(&self) -> Vec<Vec<u8>> {
        self.network.drain(self.local)
    }
}
