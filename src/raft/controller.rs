//! `RaftController` — spec.md §4.7, grounded directly on
//! `hedra/distributed/raft/raft_controller.py`: election on observed member
//! failure, `request_vote`/`receive_vote_request` term/vote logic, quorum
//! via Flexible Paxos, periodic log replication with Snowflake-ordered
//! entries, and follower-side contiguity validation.
//!
//! Network transport is out of scope (spec.md §1 Non-goals: "Protocol
//! client internals ... remain external"); `RaftTransport` is the seam a
//! caller wires to UDP/TCP, the same inversion used by `ActionClient` and
//! `HookInvoker` elsewhere in this crate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;

use crate::error::{GraphError, GraphResult};
use crate::util::snowflake::SnowflakeGenerator;

use super::message::RaftMessage;
use super::monitor::Monitor;
use super::types::{ElectionState, LogEntry, NodeAddr, NodeState, Term};

/// Flexible Paxos quorum fraction used when the caller doesn't supply one;
/// mirrors `hedra.distributed.raft.constants.FLEXIBLE_PAXOS_QUORUM`.
pub const DEFAULT_QUORUM_FRACTION: f64 = 0.5;

/// Sends and receives the two RAFT RPCs against a peer. Implemented by the
/// caller's real network layer; `controller` tests use an in-process
/// implementation that calls peer `RaftController`s directly.
#[async_trait]
pub trait RaftTransport: Send + Sync {
    async fn send_vote_request(&self, peer: &NodeAddr, request: RaftMessage) -> GraphResult<RaftMessage>;
    async fn send_log_update(&self, peer: &NodeAddr, request: RaftMessage) -> GraphResult<RaftMessage>;
}

/// Append-only, leader-ordered log. Rejects an incoming entry whose id does
/// not strictly advance the last accepted id (spec.md §4.7 "validate
/// contiguity"; we treat contiguity as strictly-increasing Snowflake order,
/// not literal integer adjacency, since ids are time-sortable, not dense).
struct LogStore {
    entries: Vec<LogEntry>,
    last_entry_id: u64,
}

impl LogStore {
    fn new() -> Self {
        LogStore {
            entries: Vec::new(),
            last_entry_id: 0,
        }
    }

    fn update(&mut self, mut incoming: Vec<LogEntry>) -> Result<(), String> {
        incoming.sort_by_key(|e| e.entry_id);
        for entry in incoming {
            if entry.entry_id <= self.last_entry_id {
                return Err(format!(
                    "entry {} does not advance past last accepted entry {}",
                    entry.entry_id, self.last_entry_id
                ));
            }
            self.last_entry_id = entry.entry_id;
            self.entries.push(entry);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct RaftController {
    self_addr: NodeAddr,
    term: AtomicU64,
    election_status: RwLock<ElectionState>,
    node_state: RwLock<NodeState>,
    term_leaders: RwLock<Vec<NodeAddr>>,
    log: Mutex<LogStore>,
    id_gen: SnowflakeGenerator,
    monitor: std::sync::Arc<Monitor>,
    quorum_fraction: f64,
    min_election_timeout: Duration,
    max_election_timeout: Duration,
}

impl RaftController {
    pub fn new(
        self_addr: NodeAddr,
        node_id: u64,
        monitor: std::sync::Arc<Monitor>,
        quorum_fraction: f64,
        min_election_timeout: Duration,
        max_election_timeout: Duration,
    ) -> Self {
        RaftController {
            term_leaders: RwLock::new(vec![self_addr.clone()]),
            self_addr,
            term: AtomicU64::new(0),
            election_status: RwLock::new(ElectionState::Ready),
            node_state: RwLock::new(NodeState::Follower),
            log: Mutex::new(LogStore::new()),
            id_gen: SnowflakeGenerator::new(node_id),
            monitor,
            quorum_fraction,
            min_election_timeout,
            max_election_timeout,
        }
    }

    pub fn self_addr(&self) -> &NodeAddr {
        &self.self_addr
    }

    pub fn term(&self) -> Term {
        self.term.load(Ordering::SeqCst)
    }

    pub fn node_state(&self) -> NodeState {
        *self.node_state.read()
    }

    pub fn election_status(&self) -> ElectionState {
        *self.election_status.read()
    }

    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// `ceil(N * (1 - quorum_fraction)) + 1`.
    pub fn quorum_count(&self, member_count: usize) -> usize {
        ((member_count as f64) * (1.0 - self.quorum_fraction)).ceil() as usize + 1
    }

    /// Follower-side handling of an incoming vote request.
    pub fn receive_vote_request(&self, request: &RaftMessage) -> RaftMessage {
        let candidate = request.source();
        let term_number = request.term_number;

        let status = *self.election_status.read();
        if matches!(status, ElectionState::Active | ElectionState::Pending) {
            return self.reply(&candidate, ElectionState::Pending, term_number);
        }

        let current_term = self.term();
        let elected: Option<NodeAddr> = if term_number > current_term {
            *self.election_status.write() = ElectionState::Active;
            self.term.store(term_number, Ordering::SeqCst);
            Some(candidate.clone())
        } else if term_number == current_term {
            *self.election_status.write() = ElectionState::Active;
            let mut pool = self.monitor.healthy_members();
            if !pool.contains(&self.self_addr) {
                pool.push(self.self_addr.clone());
            }
            if pool.is_empty() {
                None
            } else {
                let idx = rand::thread_rng().gen_range(0..pool.len());
                Some(pool[idx].clone())
            }
        } else {
            return self.reply(&candidate, ElectionState::Rejected, term_number);
        };

        match elected {
            Some(ref who) if *who == candidate => {
                self.reply(&candidate, ElectionState::Accepted, term_number)
            }
            _ => self.reply(&candidate, ElectionState::Rejected, term_number),
        }
    }

    fn reply(&self, to: &NodeAddr, status: ElectionState, term_number: Term) -> RaftMessage {
        RaftMessage::new(to, &self.self_addr, term_number, status, self.node_state())
    }

    /// Client-side vote request this node sends to `peer`.
    fn build_vote_request(&self, peer: &NodeAddr) -> RaftMessage {
        RaftMessage::new(peer, &self.self_addr, self.term(), self.election_status(), self.node_state())
    }

    /// Runs one election: increments term, votes for self, broadcasts
    /// `request_vote` to every healthy member, and becomes Leader if
    /// quorum `Accepted` responses arrive within the randomized timeout.
    pub async fn run_election(&self, transport: &dyn RaftTransport) -> GraphResult<()> {
        let new_term = self.term.fetch_add(1, Ordering::SeqCst) + 1;

        let members = self.monitor.healthy_members();
        if members.is_empty() {
            return Err(GraphError::NoHealthyMembers);
        }

        let timeout = Duration::from_secs_f64(
            rand::thread_rng()
                .gen_range(self.min_election_timeout.as_secs_f64()..=self.max_election_timeout.as_secs_f64()),
        );

        let requests = members.iter().map(|member| {
            let request = self.build_vote_request(member);
            transport.send_vote_request(member, request)
        });

        let accepted_count = match tokio::time::timeout(timeout, futures::future::join_all(requests)).await {
            Ok(results) => results
                .into_iter()
                .filter_map(Result::ok)
                .filter(|r| r.election_status == ElectionState::Accepted && r.term_number == new_term)
                .count(),
            Err(_) => 0,
        };

        let quorum = self.quorum_count(members.len());
        if accepted_count >= quorum {
            *self.node_state.write() = NodeState::Leader;
            Ok(())
        } else {
            *self.election_status.write() = ElectionState::Ready;
            Err(GraphError::ElectionTimeout { term: new_term })
        }
    }

    /// Follower-side handling of an `append_entries`-equivalent message.
    pub fn receive_log_update(&self, message: &RaftMessage) -> RaftMessage {
        if message.entries.is_empty() {
            return self.reply(&message.source(), self.election_status(), self.term());
        }

        let mut log = self.log.lock();
        match log.update(message.entries.clone()) {
            Ok(()) => self.reply(&message.source(), self.election_status(), self.term()),
            Err(reason) => {
                let elected_leader = self.term_leaders.read().last().cloned();
                self.reply(&message.source(), self.election_status(), self.term())
                    .with_error(reason)
                    .with_elected_leader(elected_leader)
            }
        }
    }

    /// Leader-side construction of a log-update request tagging each
    /// payload with a fresh Snowflake id and the current term.
    pub fn build_log_update(&self, peer: &NodeAddr, payloads: Vec<Vec<u8>>) -> RaftMessage {
        let term = self.term();
        let entries = payloads
            .into_iter()
            .map(|payload| LogEntry {
                entry_id: self.id_gen.generate(),
                term,
                payload,
            })
            .collect();
        self.build_vote_request(peer).with_entries(entries)
    }

    /// Sends a log update to `peer` and reconciles the response, per
    /// `_update_logs`: a `None` `elected_leader` means "no observed
    /// change", so only a concrete leader change updates local state.
    pub async fn update_logs(
        &self,
        transport: &dyn RaftTransport,
        peer: &NodeAddr,
        payloads: Vec<Vec<u8>>,
    ) -> GraphResult<()> {
        let request = self.build_log_update(peer, payloads);
        let response = transport.send_log_update(peer, request).await?;

        if response.error.is_some() {
            if let Some(new_leader) = response.elected_leader.clone() {
                let changed = self
                    .term_leaders
                    .read()
                    .last()
                    .map(|last| *last != new_leader)
                    .unwrap_or(true);
                if changed {
                    self.term_leaders.write().push(new_leader);
                    self.term.store(response.term_number, Ordering::SeqCst);
                }
            }
        }
        Ok(())
    }

    /// One iteration of the monitor loop: leaders push log updates to
    /// every healthy member; followers trigger an election once they
    /// observe at least one failed member.
    pub async fn tick(&self, transport: &dyn RaftTransport, pending_payloads: Vec<Vec<u8>>) -> GraphResult<()> {
        if self.node_state() == NodeState::Leader {
            let members = self.monitor.healthy_members();
            for member in members {
                self.update_logs(transport, &member, pending_payloads.clone()).await?;
            }
            Ok(())
        } else if !self.monitor.failed_members().is_empty() {
            self.run_election(transport).await
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct LoopbackTransport {
        peers: std::collections::HashMap<String, Arc<RaftController>>,
    }

    #[async_trait]
    impl RaftTransport for LoopbackTransport {
        async fn send_vote_request(&self, peer: &NodeAddr, request: RaftMessage) -> GraphResult<RaftMessage> {
            let node = self.peers.get(&peer.to_string()).expect("known peer");
            Ok(node.receive_vote_request(&request))
        }

        async fn send_log_update(&self, peer: &NodeAddr, request: RaftMessage) -> GraphResult<RaftMessage> {
            let node = self.peers.get(&peer.to_string()).expect("known peer");
            Ok(node.receive_log_update(&request))
        }
    }

    fn controller(host: &str, port: u16, monitor: Arc<Monitor>) -> Arc<RaftController> {
        Arc::new(RaftController::new(
            NodeAddr::new(host, port),
            port as u64,
            monitor,
            DEFAULT_QUORUM_FRACTION,
            Duration::from_millis(20),
            Duration::from_millis(40),
        ))
    }

    #[tokio::test]
    async fn candidate_wins_election_with_quorum() {
        let monitor_a = Arc::new(Monitor::new());
        let monitor_b = Arc::new(Monitor::new());
        let monitor_c = Arc::new(Monitor::new());

        let a = controller("a", 1, monitor_a.clone());
        let b = controller("b", 2, monitor_b.clone());
        let c = controller("c", 3, monitor_c.clone());

        for m in [&monitor_a, &monitor_b, &monitor_c] {
            m.register(NodeAddr::new("b", 2));
            m.register(NodeAddr::new("c", 3));
        }

        let mut peers = std::collections::HashMap::new();
        peers.insert(b.self_addr().to_string(), b.clone());
        peers.insert(c.self_addr().to_string(), c.clone());
        let transport = LoopbackTransport { peers };

        a.run_election(&transport).await.unwrap();
        assert_eq!(a.node_state(), NodeState::Leader);
    }

    #[tokio::test]
    async fn election_fails_without_healthy_members() {
        let monitor = Arc::new(Monitor::new());
        let a = controller("a", 1, monitor);
        let peers = std::collections::HashMap::new();
        let transport = LoopbackTransport { peers };

        let err = a.run_election(&transport).await.unwrap_err();
        assert!(matches!(err, GraphError::NoHealthyMembers));
    }

    #[test]
    fn log_update_rejects_non_advancing_entries() {
        let monitor = Arc::new(Monitor::new());
        let a = controller("a", 1, monitor);

        let first = RaftMessage::new(
            a.self_addr(),
            a.self_addr(),
            0,
            ElectionState::Ready,
            NodeState::Leader,
        )
        .with_entries(vec![LogEntry {
            entry_id: 10,
            term: 0,
            payload: vec![1],
        }]);
        let response = a.receive_log_update(&first);
        assert!(response.error.is_none());
        assert_eq!(a.log_len(), 1);

        let stale = RaftMessage::new(
            a.self_addr(),
            a.self_addr(),
            0,
            ElectionState::Ready,
            NodeState::Leader,
        )
        .with_entries(vec![LogEntry {
            entry_id: 5,
            term: 0,
            payload: vec![2],
        }]);
        let response = a.receive_log_update(&stale);
        assert!(response.error.is_some());
    }

    #[test]
    fn vote_request_during_active_election_gets_pending() {
        let monitor = Arc::new(Monitor::new());
        let a = controller("a", 1, monitor);
        *a.election_status.write() = ElectionState::Active;

        let request = RaftMessage::new(
            a.self_addr(),
            &NodeAddr::new("z", 9),
            1,
            ElectionState::Ready,
            NodeState::Candidate,
        );
        let response = a.receive_vote_request(&request);
        assert_eq!(response.election_status, ElectionState::Pending);
    }

    #[test]
    fn higher_term_vote_request_is_accepted() {
        let monitor = Arc::new(Monitor::new());
        let a = controller("a", 1, monitor);

        let candidate = NodeAddr::new("z", 9);
        let request = RaftMessage::new(a.self_addr(), &candidate, 5, ElectionState::Ready, NodeState::Candidate);
        let response = a.receive_vote_request(&request);
        assert_eq!(response.election_status, ElectionState::Accepted);
        assert_eq!(a.term(), 5);
    }

    #[test]
    fn lower_term_vote_request_is_rejected() {
        let monitor = Arc::new(Monitor::new());
        let a = controller("a", 1, monitor);
        a.term.store(10, Ordering::SeqCst);

        let candidate = NodeAddr::new("z", 9);
        let request = RaftMessage::new(a.self_addr(), &candidate, 3, ElectionState::Ready, NodeState::Candidate);
        let response = a.receive_vote_request(&request);
        assert_eq!(response.election_status, ElectionState::Rejected);
    }
}
