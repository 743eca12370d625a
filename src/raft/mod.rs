//! Embedded RAFT coordinator (component G) — spec.md §4.7.

pub mod controller;
pub mod message;
pub mod monitor;
pub mod types;

pub use controller::{RaftController, RaftTransport, DEFAULT_QUORUM_FRACTION};
pub use message::RaftMessage;
pub use monitor::{MemberHealth, Monitor};
pub use types::{ElectionState, LogEntry, NodeAddr, NodeState, Term};
