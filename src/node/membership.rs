use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::NodeId;

/// What this node believes about one peer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct MembershipEntry {
    pub node_id: NodeId,
    pub heartbeat: u64,
    /// Local logical time the heartbeat last advanced
    pub last_updated: u64,
}

/// Result of merging one piece of liveness evidence into the table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Ignored,
}

/// Local membership view, keyed by peer identity.
///
/// The owner's own identity and the null identity are never stored.
#[derive(Clone, Debug)]
pub struct MembershipTable {
    owner: NodeId,
    entries: BTreeMap<NodeId, MembershipEntry>,
}

impl MembershipTable {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    /// Record a heartbeat observed for `node_id` at local time `now`
    pub fn merge(&mut self, node_id: NodeId, heartbeat: u64, now: u64) -> MergeOutcome {
        if node_id == self.owner || node_id.is_null() {
            return MergeOutcome::Ignored;
        }

        match self.entries.get_mut(&node_id) {
            Some(entry) if heartbeat > entry.heartbeat => {
                entry.heartbeat = heartbeat;
                entry.last_updated = now;
                MergeOutcome::Updated
            }
            // Stale or duplicate evidence does not count as a sign of life
            Some(_) => MergeOutcome::Ignored,
            None => {
                self.entries.insert(
                    node_id,
                    MembershipEntry {
                        node_id,
                        heartbeat,
                        last_updated: now,
                    },
                );
                MergeOutcome::Inserted
            }
        }
    }

    /// Remove every entry silent for at least `remove_timeout` and return the removed ids
    pub fn sweep_expired(&mut self, now: u64, remove_timeout: u64) -> Vec<NodeId> {
        let expired: Vec<NodeId> = self
            .entries
            .values()
            .filter(|entry| now.saturating_sub(entry.last_updated) >= remove_timeout)
            .map(|entry| entry.node_id)
            .collect();

        for node_id in &expired {
            self.entries.remove(node_id);
        }

        expired
    }

    pub fn snapshot(&self) -> Vec<MembershipEntry> {
        self.entries.values().copied().collect()
    }

    /// Identities of every known peer
    pub fn all(&self) -> Vec<NodeId> {
        self.entries.keys().copied().collect()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&MembershipEntry> {
        self.entries.get(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.entries.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
