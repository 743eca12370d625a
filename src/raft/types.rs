//! Core RAFT vocabulary — spec.md §4.7/§6, grounded on
//! `hedra/distributed/models/raft/logs.py` (`NodeState`, `Entry`) and
//! `hedra/distributed/models/raft/election_state.py` (`ElectionState`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub type Term = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Follower,
    Candidate,
    Leader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionState {
    Ready,
    Active,
    Pending,
    Accepted,
    Rejected,
}

/// A `(host, port)` pair identifying a RAFT participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddr {
    pub host: Arc<str>,
    pub port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<Arc<str>>, port: u16) -> Self {
        NodeAddr {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One RAFT log entry. `entry_id` is a leader-assigned Snowflake id, total
/// order within a term (spec.md §5 "RAFT log entries: total order per term
/// enforced by leader-assigned Snowflake ids").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub entry_id: u64,
    pub term: Term,
    pub payload: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_addr_displays_as_host_port() {
        let addr = NodeAddr::new("10.0.0.1", 7000);
        assert_eq!(addr.to_string(), "10.0.0.1:7000");
    }
}
