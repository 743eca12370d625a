//! `HookRegistry` — an injected, per-run registry of hooks.
//!
//! Grounded on `action_registry.py`'s lookup shape
//! (`get_action`, `names`, iteration) but keyed the way spec.md §4.1
//! describes: `(stage, short_name, kind)`. Deliberately not a process-wide
//! singleton (Design Note: "global mutable registries ... model as an
//! injected registry").

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{GraphError, GraphResult};
use crate::util::intern;

use super::types::{Hook, HookKind, HookSpec};

type Key = (Arc<str>, Arc<str>, HookKind);

#[derive(Debug, Default)]
pub struct HookRegistry {
    hooks: FxHashMap<Key, Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a flat list of specs, as supplied by the graph
    /// caller at load time (stand-in for "user-declared stage classes").
    pub fn from_specs(specs: Vec<HookSpec>) -> GraphResult<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.register_spec(spec)?;
        }
        Ok(registry)
    }

    pub fn register_spec(&mut self, spec: HookSpec) -> GraphResult<()> {
        let hook = Hook {
            name: intern(&spec.name),
            short_name: intern(spec.name.rsplit("::").next().unwrap_or(&spec.name)),
            stage_name: intern(&spec.stage_name),
            kind: spec.kind,
            params: spec.params.iter().map(|p| intern(p)).collect(),
            produces: spec.produces.iter().map(|p| intern(p)).collect(),
            order: spec.order,
            weight: 1,
            skip: false,
        };
        self.register(hook)
    }

    pub fn register(&mut self, hook: Hook) -> GraphResult<()> {
        let key = (
            Arc::clone(&hook.stage_name),
            Arc::clone(&hook.short_name),
            hook.kind,
        );
        if self.hooks.contains_key(&key) {
            return Err(GraphError::DuplicateHook {
                stage: hook.stage_name.to_string(),
                kind: format!("{:?}", hook.kind),
                name: hook.short_name.to_string(),
            });
        }
        self.hooks.insert(key, hook);
        Ok(())
    }

    pub fn resolve(&self, stage: &str, short_name: &str, kind: HookKind) -> Option<&Hook> {
        self.hooks
            .iter()
            .find(|((s, n, k), _)| &**s == stage && &**n == short_name && *k == kind)
            .map(|(_, hook)| hook)
    }

    pub fn hooks_for_stage(&self, stage: &str) -> Vec<&Hook> {
        let mut found: Vec<&Hook> = self
            .hooks
            .values()
            .filter(|h| &*h.stage_name == stage)
            .collect();
        found.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        found
    }

    pub fn hooks_for_stage_and_kind(&self, stage: &str, kind: HookKind) -> Vec<&Hook> {
        self.hooks_for_stage(stage)
            .into_iter()
            .filter(|h| h.kind == kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, stage: &str, kind: HookKind) -> HookSpec {
        HookSpec {
            name: name.into(),
            stage_name: stage.into(),
            kind,
            params: vec![],
            produces: vec![],
            order: 0,
        }
    }

    #[test]
    fn resolves_registered_hook() {
        let registry =
            HookRegistry::from_specs(vec![spec("execute::fetch", "execute", HookKind::Action)])
                .unwrap();
        assert!(registry.resolve("execute", "fetch", HookKind::Action).is_some());
        assert!(registry.resolve("execute", "fetch", HookKind::Check).is_none());
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = HookRegistry::new();
        registry
            .register_spec(spec("execute::fetch", "execute", HookKind::Action))
            .unwrap();
        let err = registry
            .register_spec(spec("execute::fetch", "execute", HookKind::Action))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateHook { .. }));
    }

    #[test]
    fn hooks_for_stage_orders_by_order_then_name() {
        let mut registry = HookRegistry::new();
        registry
            .register_spec({
                let mut s = spec("execute::b", "execute", HookKind::Check);
                s.order = 1;
                s
            })
            .unwrap();
        registry
            .register_spec({
                let mut s = spec("execute::a", "execute", HookKind::Check);
                s.order = 1;
                s
            })
            .unwrap();
        let hooks = registry.hooks_for_stage_and_kind("execute", HookKind::Check);
        assert_eq!(hooks.len(), 2);
        assert!(hooks[0].short_name < hooks[1].short_name);
    }
}
