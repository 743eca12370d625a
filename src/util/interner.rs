//! String interner for stage and hook names (ported from `tools/nika/src/interner.rs`,
//! generalized from task-ids to any graph identifier).
//!
//! Interning means two stages/hooks with the same name share the same
//! allocation, so `Arc::clone` is the only cost of carrying a name around
//! through the DAG, event graph, and context store.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

static INTERNER: Lazy<DashMap<Box<str>, Arc<str>>> = Lazy::new(DashMap::new);

/// Intern a string, returning a shared `Arc<str>`.
///
/// Repeated calls with the same value return clones of the same allocation.
pub fn intern(value: &str) -> Arc<str> {
    if let Some(existing) = INTERNER.get(value) {
        return Arc::clone(existing.value());
    }

    let arc: Arc<str> = Arc::from(value);
    INTERNER.insert(value.into(), Arc::clone(&arc));
    arc
}

/// Number of distinct interned strings. Exposed for tests only.
#[cfg(test)]
pub fn interned_count() -> usize {
    INTERNER.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_reuses_allocation() {
        let a = intern("execute_root");
        let b = intern("execute_root");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_values_are_distinct() {
        let before = interned_count();
        intern("some-unique-stage-name-for-test");
        assert!(interned_count() >= before);
    }
}
