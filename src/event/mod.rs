//! Event Graph (component B).
//!
//! Per-stage dependency graph over hooks, grounded on
//! `hedra/core/graphs/events/base_event.py` and
//! `hedra/core/graphs/transitions/common/base_edge.py` — but deliberately
//! NOT reproducing Python's dynamic attribute forwarding
//! (`BaseEvent.__getattribute__`/`__setattr__`). Here an `EventNode` holds a
//! `target: Hook` field and the graph drives it through an explicit
//! `HookInvoker` trait; there is no hidden delegation.

pub mod emitter;
pub mod graph;
pub mod log;

pub use emitter::{EventEmitter, NoopEmitter};
pub use graph::{EventFailure, EventGraph, EventValue, HookInvoker, HookOutput};
pub use log::{Event, EventKind, EventLog};
