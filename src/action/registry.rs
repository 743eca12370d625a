//! `ActionRegistry` — a per-run registry of constructed actions keyed by
//! name, queryable by stage. Grounded on
//! `hedra/core/engines/types/common/action_registry.py`.

use rustc_hash::FxHashMap;

use super::types::Action;

#[derive(Default)]
pub struct ActionRegistry {
    actions: FxHashMap<String, Action>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, action: Action) {
        self.actions.insert(action.name.clone(), action);
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn get_action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn get_stage_actions(&self, stage_name: &str) -> Vec<&Action> {
        self.actions
            .values()
            .filter(|a| a.stage_name == stage_name)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::types::Scheme;
    use std::collections::HashMap;

    fn action(name: &str, stage: &str) -> Action {
        Action {
            name: name.into(),
            scheme: Scheme::Http,
            host: "localhost".into(),
            port: 80,
            path: "/".into(),
            method: "GET".into(),
            headers: HashMap::new(),
            payload: vec![],
            stage_name: stage.into(),
            setup: false,
            hooks: Default::default(),
        }
    }

    #[test]
    fn filters_actions_by_stage() {
        let mut registry = ActionRegistry::new();
        registry.insert(action("a", "execute"));
        registry.insert(action("b", "setup"));
        assert_eq!(registry.get_stage_actions("execute").len(), 1);
        assert_eq!(registry.get_stage_actions("setup").len(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = ActionRegistry::new();
        registry.insert(action("getRoot", "execute"));
        assert!(registry.get_action("getRoot").is_some());
        assert!(registry.get_action("missing").is_none());
    }
}
