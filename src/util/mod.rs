//! Small cross-cutting utilities shared by the DAG, event-graph, and RAFT
//! modules.
//!
//! - `interner`: process-wide `Arc<str>` interning for stage/hook names so
//!   clones across generations are O(1).
//! - `snowflake`: time-sortable 64-bit ids used for RAFT log entries.

pub mod interner;
pub mod snowflake;

pub use interner::intern;
pub use snowflake::SnowflakeGenerator;
