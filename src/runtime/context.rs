//! `ExecutionContext` — the graph-wide context store, merged at generation
//! boundaries. Grounded on the root crate's `context.rs`/`context_pool.rs`
//! for the reuse pattern, and on spec.md §4.5's merge rule: conflicting
//! writes to the same key are resolved by `(generation_id,
//! execution_stage_id)`, smaller wins, and the loser is logged.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::warn;

struct Entry {
    value: Value,
    generation_id: u32,
    execution_stage_id: u32,
}

/// Per-run context shared across stages. Single-writer at a time per spec.md
/// §5 ("no concurrent reader/writer of the same key within one
/// generation"); the runner calls `merge` once per generation boundary.
#[derive(Default)]
pub struct ExecutionContext {
    values: FxHashMap<Arc<str>, Entry>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).map(|e| &e.value)
    }

    /// Merge one stage's published writes into the shared context. A
    /// write only loses to an existing entry when the existing entry has a
    /// *smaller* `(generation_id, execution_stage_id)` — ties resolved the
    /// same way, smaller wins deterministically, per spec.md §4.5.
    pub fn merge(
        &mut self,
        writes: Vec<(Arc<str>, Value)>,
        generation_id: u32,
        execution_stage_id: u32,
    ) {
        for (key, value) in writes {
            match self.values.get(&key) {
                Some(existing)
                    if (existing.generation_id, existing.execution_stage_id)
                        <= (generation_id, execution_stage_id) =>
                {
                    warn!(
                        key = %key,
                        incoming_gen = generation_id,
                        incoming_stage = execution_stage_id,
                        existing_gen = existing.generation_id,
                        existing_stage = existing.execution_stage_id,
                        "context write conflict; keeping earlier writer"
                    );
                }
                _ => {
                    self.values.insert(
                        key,
                        Entry {
                            value,
                            generation_id,
                            execution_stage_id,
                        },
                    );
                }
            }
        }
    }

    pub fn snapshot(&self) -> FxHashMap<Arc<str>, Value> {
        self.values.iter().map(|(k, e)| (Arc::clone(k), e.value.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
