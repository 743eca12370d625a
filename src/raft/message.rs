//! `RaftMessage` — the bidirectional wire record for vote requests and log
//! updates, exactly as spec.md §6: `{host, port, source_host, source_port,
//! term_number, election_status, node_status, entries[], error?,
//! elected_leader?}`. Grounded on `raft_controller.py`'s inline
//! `RaftMessage(...)` construction sites.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::types::{ElectionState, LogEntry, NodeAddr, NodeState, Term};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaftMessage {
    pub host: Arc<str>,
    pub port: u16,
    pub source_host: Arc<str>,
    pub source_port: u16,
    pub term_number: Term,
    pub election_status: ElectionState,
    pub node_status: NodeState,
    #[serde(default)]
    pub entries: Vec<LogEntry>,
    pub error: Option<String>,
    pub elected_leader: Option<NodeAddr>,
}

impl RaftMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        to: &NodeAddr,
        from: &NodeAddr,
        term_number: Term,
        election_status: ElectionState,
        node_status: NodeState,
    ) -> Self {
        RaftMessage {
            host: Arc::clone(&to.host),
            port: to.port,
            source_host: Arc::clone(&from.host),
            source_port: from.port,
            term_number,
            election_status,
            node_status,
            entries: Vec::new(),
            error: None,
            elected_leader: None,
        }
    }

    pub fn source(&self) -> NodeAddr {
        NodeAddr::new(Arc::clone(&self.source_host), self.source_port)
    }

    pub fn with_entries(mut self, entries: Vec<LogEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_elected_leader(mut self, leader: Option<NodeAddr>) -> Self {
        self.elected_leader = leader;
        self
    }
}
