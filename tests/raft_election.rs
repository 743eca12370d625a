//! Scenario 5 from spec.md §8: a candidate with quorum support wins
//! leader election; a candidate with no healthy peers cannot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphline::error::{GraphError, GraphResult};
use graphline::raft::{DEFAULT_QUORUM_FRACTION, Monitor, NodeAddr, RaftController, RaftMessage, RaftTransport};

struct LoopbackTransport {
    peers: HashMap<String, Arc<RaftController>>,
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
async fn three_node_cluster_elects_a_leader_with_quorum() {
    let monitor_a = Arc::new(Monitor::new());
    let monitor_b = Arc::new(Monitor::new());
    let monitor_c = Arc::new(Monitor::new());

    let a = controller("a", 101, monitor_a.clone());
    let b = controller("b", 102, monitor_b.clone());
    let c = controller("c", 103, monitor_c.clone());

    for m in [&monitor_a, &monitor_b, &monitor_c] {
        m.register(NodeAddr::new("b", 102));
        m.register(NodeAddr::new("c", 103));
    }

    let mut peers = HashMap::new();
    peers.insert(b.self_addr().to_string(), b.clone());
    peers.insert(c.self_addr().to_string(), c.clone());
    let transport = LoopbackTransport { peers };

    a.run_election(&transport).await.expect("quorum reached");
    assert_eq!(a.node_state(), graphline::raft::NodeState::Leader);
    assert_eq!(a.term(), 1);
}

#[tokio::test]
async fn isolated_node_cannot_elect_itself() {
    let monitor = Arc::new(Monitor::new());
    let lonely = controller("lonely", 201, monitor);
    let transport = LoopbackTransport { peers: HashMap::new() };

    let err = lonely.run_election(&transport).await.unwrap_err();
    assert!(matches!(err, GraphError::NoHealthyMembers));
    assert_ne!(lonely.node_state(), graphline::raft::NodeState::Leader);
}
