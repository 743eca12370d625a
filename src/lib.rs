//! # graphline
//!
//! A stage-DAG scheduler that assembles a validated directed acyclic graph
//! of stages, drives each stage through a typed state machine, dispatches a
//! per-stage hook pipeline (events, conditions, transforms, before/after,
//! checks), and sustains bounded concurrency during action execution
//! against a semaphore-gated connection pool. An embedded RAFT coordinator
//! handles leader election, log replication, and quorum when work is
//! sharded across nodes.
//!
//! ## Modules
//!
//! - [`dag`] — graph assembly: [`dag::assembler::GraphAssembler`] synthesizes
//!   boundary stages, validates acyclicity, and assigns topological
//!   generations.
//! - [`stage`] — [`stage::stage::Stage`], its `Context` store, and the
//!   [`stage::state::StageState`] transition table.
//! - [`hooks`] / [`event`] — hook declarations and the per-stage hook DAG
//!   ([`event::graph::EventGraph`]) that dispatches them generation by
//!   generation.
//! - [`runtime`] — [`runtime::transition::TransitionRunner`] drives the
//!   whole graph; [`runtime::executor::ActionExecutor`] drives one action
//!   through admission, hooks, and the connection pool.
//! - [`action`] — protocol-agnostic action definitions and results.
//! - [`raft`] — the embedded distributed coordinator.
//! - [`resilience`] — retry and circuit-breaker helpers layered over the
//!   executor.
//! - [`config`] — `EngineConfig`, loaded from file and environment.
//! - [`error`] — the unified `GraphError` taxonomy.

pub mod action;
pub mod config;
pub mod dag;
pub mod error;
pub mod event;
pub mod hooks;
pub mod raft;
pub mod resilience;
pub mod runtime;
pub mod sink;
pub mod stage;
pub mod util;

pub use action::{Action, ActionClient, ActionResult};
pub use config::EngineConfig;
pub use dag::{AssembledGraph, GraphAssembler, StageSpec};
pub use error::{GraphError, GraphResult};
pub use event::{EventEmitter, EventGraph};
pub use hooks::{Hook, HookBundle, HookKind, HookRegistry};
pub use raft::{NodeAddr, RaftController, RaftMessage};
pub use runtime::{ActionExecutor, ExecutionContext, RunOutcome, RunStatus, TransitionRunner};
pub use sink::{MetricsSink, NoopSink};
pub use stage::{Stage, StageKind, StageState};
