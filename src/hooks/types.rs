//! Hook kinds and the `Hook`/`HookBundle` types.
//!
//! `HookKind` is the closed enumeration from spec.md §4.1, supplemented with
//! `Channel` and `Metric` — grounded on `Hooks.channels`/`Hooks.notify` in
//! `hedra/core/engines/types/common/hooks.py`, which the distilled spec
//! dropped but the original system relies on for inter-stage fan-out and
//! metrics emission.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    Action,
    Task,
    Check,
    Before,
    After,
    Event,
    Condition,
    Transform,
    Context,
    Setup,
    Teardown,
    Load,
    Save,
    Channel,
    Metric,
}

/// A user-declared hook, identified by `(name, short_name, stage_name, kind)`
/// per spec.md §3.
#[derive(Debug, Clone)]
pub struct Hook {
    pub name: Arc<str>,
    pub short_name: Arc<str>,
    pub stage_name: Arc<str>,
    pub kind: HookKind,
    /// Declared input parameter names (used by the event graph to derive
    /// edges by name matching).
    pub params: Vec<Arc<str>>,
    /// Declared output/result names this hook produces.
    pub produces: Vec<Arc<str>>,
    /// Tie-break ordering among sibling hooks of the same kind.
    pub order: u32,
    /// Relative dispatch weight, meaningful for `Action` hooks under a
    /// weighted persona.
    pub weight: u32,
    pub skip: bool,
}

impl Hook {
    pub fn new(name: impl Into<Arc<str>>, stage_name: impl Into<Arc<str>>, kind: HookKind) -> Self {
        let name = name.into();
        Hook {
            short_name: short_name_of(&name),
            name,
            stage_name: stage_name.into(),
            kind,
            params: Vec::new(),
            produces: Vec::new(),
            order: 0,
            weight: 1,
            skip: false,
        }
    }

    pub fn with_params(mut self, params: Vec<Arc<str>>) -> Self {
        self.params = params;
        self
    }

    pub fn with_produces(mut self, produces: Vec<Arc<str>>) -> Self {
        self.produces = produces;
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }
}

fn short_name_of(name: &str) -> Arc<str> {
    Arc::from(name.rsplit("::").next().unwrap_or(name))
}

/// The declarative form a caller supplies to the registry; converted into a
/// `Hook` at registration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSpec {
    pub name: String,
    pub stage_name: String,
    pub kind: HookKind,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub order: u32,
}

/// Per-action hook bundle, grounded on `hedra`'s `Hooks(Generic[A])`:
/// before/after/checks plus channel fan-out and listener lists.
#[derive(Debug, Clone, Default)]
pub struct HookBundle {
    pub before: Vec<Hook>,
    pub after: Vec<Hook>,
    pub checks: Vec<Hook>,
    pub channels: Vec<Hook>,
    pub listeners: Vec<Arc<str>>,
}

impl HookBundle {
    pub fn to_names(&self) -> Vec<Arc<str>> {
        self.before
            .iter()
            .chain(self.after.iter())
            .chain(self.checks.iter())
            .chain(self.channels.iter())
            .map(|h| Arc::clone(&h.name))
            .collect()
    }
}
