//! `Stage` and its per-stage `Context` store (spec.md §3's `SimpleContext`).

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::event::EventGraph;
use crate::hooks::types::{Hook, HookKind};
use crate::stage::kind::StageKind;
use crate::stage::state::StageState;

/// A process-local, per-stage key/value store. Written at stage completion,
/// read at the next stage's start; cross-generation merge/conflict
/// resolution is handled one layer up by
/// `runtime::context::ExecutionContext::merge`.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: FxHashMap<Arc<str>, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: Arc<str>, value: Value) {
        self.values.insert(key, value);
    }

    pub fn snapshot(&self) -> Vec<(Arc<str>, Value)> {
        self.values
            .iter()
            .map(|(k, v)| (Arc::clone(k), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct Stage {
    pub name: Arc<str>,
    pub kind: StageKind,
    pub dependencies: Vec<Arc<str>>,
    pub state: StageState,
    pub hooks_by_kind: FxHashMap<HookKind, Vec<Hook>>,
    pub context: Context,
    /// Assigned by the assembler (Kahn's algorithm topological layer).
    pub generation_id: u32,
    /// Assigned at setup; sequential per execute-stage, grounded on
    /// `hedra/core/graphs/stages/setup.py`'s `execution_stage_id` counter.
    pub execution_stage_id: u32,
    /// Whether this stage registered a teardown callback that must run
    /// regardless of run outcome (spec.md §4.5).
    pub requires_shutdown: bool,
    pub events: Option<EventGraph>,
}

impl Stage {
    pub fn new(name: impl Into<Arc<str>>, kind: StageKind, dependencies: Vec<Arc<str>>) -> Self {
        Stage {
            name: name.into(),
            kind,
            dependencies,
            state: StageState::Initialized,
            hooks_by_kind: FxHashMap::default(),
            context: Context::new(),
            generation_id: 0,
            execution_stage_id: 0,
            requires_shutdown: false,
            events: None,
        }
    }

    pub fn hooks(&self, kind: HookKind) -> &[Hook] {
        self.hooks_by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn add_hook(&mut self, hook: Hook) {
        self.hooks_by_kind.entry(hook.kind).or_default().push(hook);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stage_starts_initialized() {
        let stage = Stage::new("setup", StageKind::Setup, vec![Arc::from("validate")]);
        assert_eq!(stage.state, StageState::Initialized);
        assert_eq!(stage.dependencies.len(), 1);
    }

    #[test]
    fn hooks_group_by_kind() {
        let mut stage = Stage::new("execute", StageKind::Execute, vec![]);
        stage.add_hook(Hook::new("execute::fetch", "execute", HookKind::Action));
        stage.add_hook(Hook::new("execute::status_ok", "execute", HookKind::Check));
        assert_eq!(stage.hooks(HookKind::Action).len(), 1);
        assert_eq!(stage.hooks(HookKind::Check).len(), 1);
        assert!(stage.hooks(HookKind::Before).is_empty());
    }

    #[test]
    fn context_snapshot_carries_all_keys() {
        let mut ctx = Context::new();
        ctx.set(Arc::from("status"), Value::from(200));
        ctx.set(Arc::from("body"), Value::from("ok"));
        assert_eq!(ctx.snapshot().len(), 2);
    }
}
