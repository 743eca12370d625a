//! `Edge` — a directed `(from_stage, to_stage)` pair bound to a transition
//! handler, per spec.md §3.

use std::sync::Arc;
use std::time::Duration;

use crate::stage::state::TransitionFn;

#[derive(Clone)]
pub struct Edge {
    pub from_stage: Arc<str>,
    pub to_stage: Arc<str>,
    pub requires: Vec<Arc<str>>,
    pub provides: Vec<Arc<str>>,
    pub timeout: Duration,
    pub transition: TransitionFn,
}

impl Edge {
    pub fn new(
        from_stage: Arc<str>,
        to_stage: Arc<str>,
        transition: TransitionFn,
        timeout: Duration,
    ) -> Self {
        Edge {
            from_stage,
            to_stage,
            requires: Vec::new(),
            provides: Vec::new(),
            timeout,
            transition,
        }
    }
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edge")
            .field("from_stage", &self.from_stage)
            .field("to_stage", &self.to_stage)
            .field("requires", &self.requires)
            .field("provides", &self.provides)
            .field("timeout", &self.timeout)
            .finish()
    }
}
