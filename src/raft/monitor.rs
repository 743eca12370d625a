//! Gossip membership view — supplements spec.md §4.7's "a membership view
//! maintained by a gossip-style `Monitor` (healthy/suspect/failed)".
//! Grounded on the `monitor._node_statuses`/`monitor.failed_nodes` reads in
//! `raft_controller.py`; the monitor's own wire protocol is out of scope
//! (we model only the membership-view interface `RaftController` consumes).

use dashmap::DashMap;

use super::types::NodeAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberHealth {
    Healthy,
    Suspect,
    Failed,
}

#[derive(Default)]
pub struct Monitor {
    statuses: DashMap<NodeAddr, MemberHealth>,
}

impl Monitor {
    pub fn new() -> Self {
        Monitor::default()
    }

    pub fn register(&self, member: NodeAddr) {
        self.statuses.entry(member).or_insert(MemberHealth::Healthy);
    }

    pub fn mark_healthy(&self, member: &NodeAddr) {
        self.statuses.insert(member.clone(), MemberHealth::Healthy);
    }

    pub fn mark_suspect(&self, member: &NodeAddr) {
        self.statuses.insert(member.clone(), MemberHealth::Suspect);
    }

    pub fn mark_failed(&self, member: &NodeAddr) {
        self.statuses.insert(member.clone(), MemberHealth::Failed);
    }

    pub fn remove(&self, member: &NodeAddr) {
        self.statuses.remove(member);
    }

    pub fn healthy_members(&self) -> Vec<NodeAddr> {
        self.statuses
            .iter()
            .filter(|e| *e.value() == MemberHealth::Healthy)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn failed_members(&self) -> Vec<NodeAddr> {
        self.statuses
            .iter()
            .filter(|e| *e.value() == MemberHealth::Failed)
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
