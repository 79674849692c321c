//! Membership change notifications
//!
//! The engine reports every peer it adds to or removes from its table through a
//! [`MembershipEvents`] sink. Sinks are fire-and-forget: nothing they do feeds back
//! into the protocol.
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::info;

use super::NodeId;

pub trait MembershipEvents {
    fn on_membership_add(&self, node: NodeId, added: NodeId);
    fn on_membership_remove(&self, node: NodeId, removed: NodeId);
}

/// Logs membership changes through `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEvents;

impl MembershipEvents for TracingEvents {
    fn on_membership_add(&self, node: NodeId, added: NodeId) {
        info!("[{}] Node {} joined the membership view", node, added);
    }

    fn on_membership_remove(&self, node: NodeId, removed: NodeId) {
        info!("[{}] Node {} removed from the membership view", node, removed);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    Added,
    Removed,
}

/// One recorded membership change
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MembershipEvent {
    pub node: NodeId,
    pub peer: NodeId,
    pub change: MembershipChange,
}

/// Keeps every membership change in memory; clones share the same log.
///
/// Used by the simulation and tests to check who noticed what.
#[derive(Clone, Debug, Default)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<MembershipEvent>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MembershipEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Changes observed by `node`, in order
    pub fn events_for(&self, node: NodeId) -> Vec<MembershipEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.node == node)
            .collect()
    }

    pub fn count(&self, node: NodeId, peer: NodeId, change: MembershipChange) -> usize {
        self.events()
            .iter()
            .filter(|event| event.node == node && event.peer == peer && event.change == change)
            .count()
    }

    fn record(&self, node: NodeId, peer: NodeId, change: MembershipChange) {
        if let Ok(mut events) = self.events.lock() {
            events.push(MembershipEvent { node, peer, change });
        }
    }
}

impl MembershipEvents for RecordingEvents {
    fn on_membership_add(&self, node: NodeId, added: NodeId) {
        self.record(node, added, MembershipChange::Added);
    }

    fn on_membership_remove(&self, node: NodeId, removed: NodeId) {
        self.record(node, removed, MembershipChange::Removed);
    }
}

/// Forwards each change to two sinks
#[derive(Clone, Debug, Default)]
pub struct Both<A, B>(pub A, pub B);

impl<A: MembershipEvents, B: MembershipEvents> MembershipEvents for Both<A, B> {
    fn on_membership_add(&self, node: NodeId, added: NodeId) {
        self.0.on_membership_add(node, added);
        self.1.on_membership_add(node, added);
    }

    fn on_membership_remove(&self, node: NodeId, removed: NodeId) {
        self.0.on_membership_remove(node, removed);
        self.1.on_membership_remove(node, removed);
    }
}
