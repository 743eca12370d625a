//! Unified error taxonomy for the graph engine.
//!
//! Every variant carries a stable `GRAPH-NNN` code (mirrored from
//! `tools/nika/src/error.rs`'s `NIKA-NNN` numbering) banded by subsystem:
//!
//! | Range     | Subsystem                         |
//! |-----------|------------------------------------|
//! | 000-029   | DAG assembly (`dag`)               |
//! | 030-059   | Stage state machine (`stage`)      |
//! | 060-099   | Hooks / event graph (`hooks`, `event`) |
//! | 100-149   | Action executor / pool (`runtime`, `action`) |
//! | 150-179   | Config / CLI                       |
//! | 180-219   | RAFT coordinator (`raft`)           |
//!
//! `GraphError` implements both `thiserror::Error` (for `Display`/source
//! chaining) and `miette::Diagnostic` (for the `help()` text and doc-url
//! surfaced by the CLI's fancy reporter).

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum GraphError {
    // ---- DAG assembly (000-029) ----------------------------------------
    #[error("[GRAPH-001] cycle detected among stages: {path:?}")]
    #[diagnostic(
        code(graph::dag::cycle),
        help("stages must form a DAG; break the cycle by removing one dependency")
    )]
    CycleDetected { path: Vec<String> },

    #[error("[GRAPH-002] duplicate stage name: {name}")]
    #[diagnostic(code(graph::dag::duplicate_stage))]
    DuplicateStage { name: String },

    #[error("[GRAPH-003] stage '{from}' depends on unknown stage '{to}'")]
    #[diagnostic(
        code(graph::dag::unknown_dependency),
        help("check for a typo in the dependency list")
    )]
    UnknownDependency { from: String, to: String },

    #[error("[GRAPH-004] graph has {count} isolated stage(s): {names:?}")]
    #[diagnostic(
        code(graph::dag::isolated_stage),
        help("every non-boundary stage must connect to Idle and Complete")
    )]
    IsolatedStages { count: usize, names: Vec<String> },

    #[error("[GRAPH-005] graph must have exactly one source stage, found {count}")]
    #[diagnostic(code(graph::dag::multiple_sources))]
    MultipleSources { count: usize },

    #[error("[GRAPH-006] graph must have exactly one sink stage, found {count}")]
    #[diagnostic(code(graph::dag::multiple_sinks))]
    MultipleSinks { count: usize },

    #[error("[GRAPH-007] no transition handler registered for ({from_kind:?} -> {to_kind:?})")]
    #[diagnostic(
        code(graph::dag::unsupported_transition),
        help("add an entry to the transition table for this (from.kind, to.kind) pair")
    )]
    UnsupportedTransition { from_kind: String, to_kind: String },

    // ---- Stage state machine (030-059) ---------------------------------
    #[error("[GRAPH-030] illegal transition for stage '{stage}': {from:?} -> {to:?}")]
    #[diagnostic(
        code(graph::stage::illegal_transition),
        help("check the stage state machine; not every state pair is reachable directly")
    )]
    IllegalTransition {
        stage: String,
        from: String,
        to: String,
    },

    #[error("[GRAPH-031] stage '{name}' is already registered with kind {kind}")]
    #[diagnostic(code(graph::stage::duplicate_registration))]
    DuplicateRegistration { name: String, kind: String },

    // ---- Hooks / event graph (060-099) ---------------------------------
    #[error("[GRAPH-060] duplicate hook '{name}' of kind {kind} on stage '{stage}'")]
    #[diagnostic(
        code(graph::hooks::duplicate_hook),
        help("hook names must be unique within a stage for a given kind")
    )]
    DuplicateHook {
        stage: String,
        kind: String,
        name: String,
    },

    #[error("[GRAPH-061] hook '{name}' references unknown parameter '{param}'")]
    #[diagnostic(code(graph::event::unknown_parameter))]
    UnknownParameter { name: String, param: String },

    #[error("[GRAPH-062] cycle detected in event graph for stage '{stage}': {path:?}")]
    #[diagnostic(code(graph::event::cycle))]
    EventCycle { stage: String, path: Vec<String> },

    #[error("[GRAPH-063] hook '{name}' was not found on stage '{stage}'")]
    #[diagnostic(code(graph::hooks::missing_hook))]
    MissingHook { stage: String, name: String },

    // ---- Action executor / pool (100-149) ------------------------------
    #[error("[GRAPH-100] action '{name}' timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(graph::action::timeout),
        help("raise the action's timeout or investigate downstream latency")
    )]
    ActionTimeout { name: String, timeout_ms: u64 },

    #[error("[GRAPH-101] connection pool for '{resource}' is exhausted ({capacity} in use)")]
    #[diagnostic(
        code(graph::pool::exhausted),
        help("increase pool capacity or reduce concurrent batch size")
    )]
    PoolExhausted { resource: String, capacity: usize },

    #[error("[GRAPH-102] connection for '{resource}' was poisoned and could not be reset")]
    #[diagnostic(code(graph::pool::poisoned))]
    PoolPoisoned { resource: String },

    #[error("[GRAPH-103] action '{name}' failed: {message}")]
    #[diagnostic(code(graph::action::failed))]
    ActionFailed { name: String, message: String },

    #[error("[GRAPH-104] unknown action '{name}' requested by stage '{stage}'")]
    #[diagnostic(code(graph::action::unknown))]
    UnknownAction { stage: String, name: String },

    // ---- Config / CLI (150-179) ----------------------------------------
    #[error("[GRAPH-150] invalid configuration value for '{field}': {message}")]
    #[diagnostic(code(graph::config::invalid_value))]
    InvalidConfig { field: String, message: String },

    #[error("[GRAPH-151] config file error: {0}")]
    #[diagnostic(code(graph::config::io))]
    ConfigIo(#[source] std::io::Error),

    #[error("[GRAPH-152] failed to parse config: {0}")]
    #[diagnostic(code(graph::config::parse))]
    ConfigParse(#[from] toml::de::Error),

    // ---- RAFT coordinator (180-219) -------------------------------------
    #[error("[GRAPH-180] log entries out of order or non-contiguous for node '{node}'")]
    #[diagnostic(
        code(graph::raft::log_contiguity),
        help("entries must be applied in entry_id order with no gaps")
    )]
    LogContiguity { node: String },

    #[error("[GRAPH-181] election for term {term} timed out before quorum was reached")]
    #[diagnostic(code(graph::raft::election_timeout))]
    ElectionTimeout { term: u64 },

    #[error("[GRAPH-182] node '{node}' rejected log update: stale term {term}")]
    #[diagnostic(code(graph::raft::stale_term))]
    StaleTerm { node: String, term: u64 },

    #[error("[GRAPH-183] no healthy members available to run an election")]
    #[diagnostic(code(graph::raft::no_healthy_members))]
    NoHealthyMembers,

    // ---- Generic passthroughs -------------------------------------------
    #[error("I/O error: {0}")]
    #[diagnostic(code(graph::io))]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    #[diagnostic(code(graph::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(graph::json))]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    #[diagnostic(code(graph::other))]
    Other(String),
}

impl GraphError {
    pub fn other(msg: impl Into<String>) -> Self {
        GraphError::Other(msg.into())
    }

    /// Whether a retry policy should consider this error transient.
    /// Grounded on `tools/nika/src/resilience/retry.rs::is_retryable`, which
    /// matches on variant plus a keyword scan of the message.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GraphError::ActionTimeout { .. }
                | GraphError::PoolExhausted { .. }
                | GraphError::PoolPoisoned { .. }
        )
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable() {
        let err = GraphError::ActionTimeout {
            name: "fetch".into(),
            timeout_ms: 500,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn cycle_is_not_retryable() {
        let err = GraphError::CycleDetected {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn error_codes_are_stable_in_display() {
        let err = GraphError::DuplicateStage { name: "setup".into() };
        assert!(err.to_string().contains("GRAPH-002"));
    }
}
