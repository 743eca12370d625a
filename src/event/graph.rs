//! `EventGraph` — the per-stage DAG over hooks.
//!
//! Edges are derived from parameter-name matching (spec.md §4.2): if hook B
//! declares a parameter listed in hook A's `produces`, then `A -> B`. Ties
//! in generation ordering are broken by `(order, name)` for determinism,
//! matching the `FlowGraph` generation-assignment approach in
//! `tools/nika/src/dag/flow.rs`, generalized here from tasks to hooks.
//!
//! Execution drives generations with `HookInvoker`, runs siblings within a
//! generation concurrently, and treats a `Condition` hook returning `false`
//! as a short-circuit for its descendants in the *current* dispatch only.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::GraphError;
use crate::hooks::types::{Hook, HookKind};

pub type EventValue = HashMap<Arc<str>, Value>;

#[derive(Debug, Clone)]
pub struct EventFailure {
    pub event: Arc<str>,
    pub message: String,
}

impl std::fmt::Display for EventFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event '{}' failed: {}", self.event, self.message)
    }
}

impl std::error::Error for EventFailure {}

/// Outcome of invoking a single hook.
pub enum HookOutput {
    /// Values keyed by the hook's declared `produces` names.
    Values(EventValue),
    /// Result of a `Condition` hook.
    Condition(bool),
}

/// Caller-supplied execution strategy for a hook. Context injection (spec.md
/// §4.2: "a context node may read/write the stage's context; the context
/// reference is injected before call") is the invoker implementation's
/// responsibility — the graph itself only threads declared parameter values.
#[async_trait]
pub trait HookInvoker: Send + Sync {
    async fn invoke(&self, hook: &Hook, inputs: &EventValue) -> Result<HookOutput, EventFailure>;
}

struct Node {
    hook: Hook,
    successors: SmallVec<[usize; 4]>,
    predecessors: SmallVec<[usize; 4]>,
}

pub struct EventGraph {
    nodes: Vec<Node>,
    index_by_name: FxHashMap<Arc<str>, usize>,
    generations: Vec<Vec<usize>>,
}

/// What happened to a single hook during one `run`.
pub struct EventOutcome {
    pub hook: Arc<str>,
    pub skipped: bool,
    pub outputs: EventValue,
}

impl EventGraph {
    /// Build the DAG for one stage's hooks.
    pub fn build(stage: &str, hooks: Vec<Hook>) -> Result<Self, GraphError> {
        let mut index_by_name = FxHashMap::default();
        for (i, hook) in hooks.iter().enumerate() {
            index_by_name.insert(Arc::clone(&hook.name), i);
        }

        let mut nodes: Vec<Node> = hooks
            .into_iter()
            .map(|hook| Node {
                hook,
                successors: SmallVec::new(),
                predecessors: SmallVec::new(),
            })
            .collect();

        for a in 0..nodes.len() {
            let produces = nodes[a].hook.produces.clone();
            for b in 0..nodes.len() {
                if a == b {
                    continue;
                }
                let references = nodes[b]
                    .hook
                    .params
                    .iter()
                    .any(|p| produces.iter().any(|out| out == p));
                if references {
                    nodes[a].successors.push(b);
                    nodes[b].predecessors.push(a);
                }
            }
        }

        for node in &mut nodes {
            node.successors
                .sort_by(|&x, &y| cmp_nodes(&nodes_ref(&nodes, x), &nodes_ref(&nodes, y)));
        }

        let generations = topological_generations(&nodes, stage)?;

        Ok(EventGraph {
            nodes,
            index_by_name,
            generations,
        })
    }

    pub fn generations(&self) -> &[Vec<usize>] {
        &self.generations
    }

    pub fn hook_name(&self, index: usize) -> &Arc<str> {
        &self.nodes[index].hook.name
    }

    pub fn find(&self, name: &str) -> Option<&Hook> {
        self.index_by_name.get(name).map(|&i| &self.nodes[i].hook)
    }

    /// Run the full graph, generation by generation. Sibling hooks in a
    /// generation run concurrently; a hook whose any predecessor was a
    /// `Condition` returning `false` is skipped for this dispatch (spec.md
    /// §4.2's short-circuit, scoped to the current run only).
    pub async fn run(
        &self,
        invoker: &(dyn HookInvoker),
        mut initial_inputs: EventValue,
    ) -> Result<Vec<EventOutcome>, Vec<EventFailure>> {
        let mut outcomes: Vec<Option<EventOutcome>> = (0..self.nodes.len()).map(|_| None).collect();
        let mut blocked: Vec<bool> = vec![false; self.nodes.len()];
        let mut failures = Vec::new();

        for generation in &self.generations {
            let mut futures = Vec::new();
            for &idx in generation {
                if blocked[idx] {
                    outcomes[idx] = Some(EventOutcome {
                        hook: Arc::clone(&self.nodes[idx].hook.name),
                        skipped: true,
                        outputs: EventValue::new(),
                    });
                    continue;
                }

                let node = &self.nodes[idx];
                let mut inputs = EventValue::new();
                for &pred in &node.predecessors {
                    if let Some(Some(outcome)) = outcomes.get(pred) {
                        for (k, v) in &outcome.outputs {
                            if node.hook.params.iter().any(|p| **p == **k) {
                                inputs.insert(Arc::clone(k), v.clone());
                            }
                        }
                    }
                }
                for name in &node.hook.params {
                    if let Some(v) = initial_inputs.remove(name) {
                        inputs.insert(Arc::clone(name), v);
                    }
                }

                futures.push(async move { (idx, invoker.invoke(&node.hook, &inputs).await) });
            }

            let results = futures::future::join_all(futures).await;
            for (idx, result) in results {
                match result {
                    Ok(HookOutput::Values(values)) => {
                        outcomes[idx] = Some(EventOutcome {
                            hook: Arc::clone(&self.nodes[idx].hook.name),
                            skipped: false,
                            outputs: values,
                        });
                    }
                    Ok(HookOutput::Condition(passed)) => {
                        if !passed {
                            mark_descendants_blocked(&self.nodes, idx, &mut blocked);
                        }
                        outcomes[idx] = Some(EventOutcome {
                            hook: Arc::clone(&self.nodes[idx].hook.name),
                            skipped: false,
                            outputs: EventValue::new(),
                        });
                    }
                    Err(failure) => {
                        failures.push(failure);
                        outcomes[idx] = Some(EventOutcome {
                            hook: Arc::clone(&self.nodes[idx].hook.name),
                            skipped: false,
                            outputs: EventValue::new(),
                        });
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(outcomes.into_iter().flatten().collect())
        } else {
            Err(failures)
        }
    }
}

fn mark_descendants_blocked(nodes: &[Node], start: usize, blocked: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(idx) = stack.pop() {
        for &succ in &nodes[idx].successors {
            if !blocked[succ] {
                blocked[succ] = true;
                stack.push(succ);
            }
        }
    }
}

fn nodes_ref(nodes: &[Node], idx: usize) -> &Node {
    &nodes[idx]
}

fn cmp_nodes(a: &Node, b: &Node) -> std::cmp::Ordering {
    a.hook.order.cmp(&b.hook.order).then_with(|| a.hook.name.cmp(&b.hook.name))
}

/// Kahn's algorithm; ties broken by `(order, name)` for reproducibility.
/// Three-color cycle detection fires first with the offending path.
fn topological_generations(nodes: &[Node], stage: &str) -> Result<Vec<Vec<usize>>, GraphError> {
    detect_cycle(nodes, stage)?;

    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.predecessors.len()).collect();
    let mut generations = Vec::new();
    let mut remaining = nodes.len();

    let mut ready: Vec<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();
    ready.sort_by(|&a, &b| cmp_nodes(&nodes[a], &nodes[b]));

    while !ready.is_empty() {
        generations.push(ready.clone());
        remaining -= ready.len();
        let mut next_ready = Vec::new();
        for &idx in &ready {
            for &succ in &nodes[idx].successors {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    next_ready.push(succ);
                }
            }
        }
        next_ready.sort_by(|&a, &b| cmp_nodes(&nodes[a], &nodes[b]));
        ready = next_ready;
    }

    if remaining != 0 {
        return Err(GraphError::EventCycle {
            stage: stage.to_string(),
            path: vec!["<unresolved>".to_string()],
        });
    }

    Ok(generations)
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

fn detect_cycle(nodes: &[Node], stage: &str) -> Result<(), GraphError> {
    let mut color = vec![Color::White; nodes.len()];
    let mut path = Vec::new();

    fn visit(
        idx: usize,
        nodes: &[Node],
        color: &mut [Color],
        path: &mut Vec<usize>,
        stage: &str,
    ) -> Result<(), GraphError> {
        color[idx] = Color::Gray;
        path.push(idx);
        for &succ in &nodes[idx].successors {
            match color[succ] {
                Color::White => visit(succ, nodes, color, path, stage)?,
                Color::Gray => {
                    let start = path.iter().position(|&n| n == succ).unwrap_or(0);
                    let cycle_path = path[start..]
                        .iter()
                        .map(|&n| nodes[n].hook.name.to_string())
                        .collect();
                    return Err(GraphError::EventCycle {
                        stage: stage.to_string(),
                        path: cycle_path,
                    });
                }
                Color::Black => {}
            }
        }
        path.pop();
        color[idx] = Color::Black;
        Ok(())
    }

    for idx in 0..nodes.len() {
        if color[idx] == Color::White {
            visit(idx, nodes, &mut color, &mut path, stage)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::types::HookKind;

    fn hook(name: &str, stage: &str, kind: HookKind, params: &[&str], produces: &[&str]) -> Hook {
        Hook::new(name, stage, kind)
            .with_params(params.iter().map(|p| Arc::from(*p)).collect())
            .with_produces(produces.iter().map(|p| Arc::from(*p)).collect())
    }

    struct EchoInvoker;

    #[async_trait]
    impl HookInvoker for EchoInvoker {
        async fn invoke(&self, hook: &Hook, _inputs: &EventValue) -> Result<HookOutput, EventFailure> {
            let mut out = EventValue::new();
            for p in &hook.produces {
                out.insert(Arc::clone(p), Value::Bool(true));
            }
            Ok(HookOutput::Values(out))
        }
    }

    #[test]
    fn builds_generations_from_param_matching() {
        let hooks = vec![
            hook("fetch", "execute", HookKind::Action, &[], &["status"]),
            hook("check_status", "execute", HookKind::Check, &["status"], &[]),
        ];
        let graph = EventGraph::build("execute", hooks).unwrap();
        assert_eq!(graph.generations().len(), 2);
    }

    #[tokio::test]
    async fn condition_false_skips_descendants() {
        let hooks = vec![
            hook("gate", "execute", HookKind::Condition, &[], &["gate_out"]),
            hook("dependent", "execute", HookKind::Transform, &["gate_out"], &[]),
        ];
        let graph = EventGraph::build("execute", hooks).unwrap();

        struct FalseGate;
        #[async_trait]
        impl HookInvoker for FalseGate {
            async fn invoke(&self, hook: &Hook, _inputs: &EventValue) -> Result<HookOutput, EventFailure> {
                if hook.kind == HookKind::Condition {
                    Ok(HookOutput::Condition(false))
                } else {
                    Ok(HookOutput::Values(EventValue::new()))
                }
            }
        }

        let outcomes = graph.run(&FalseGate, EventValue::new()).await.unwrap();
        let dependent = outcomes.iter().find(|o| &*o.hook == "dependent").unwrap();
        assert!(dependent.skipped);
    }

    #[test]
    fn cycle_is_rejected() {
        let hooks = vec![
            hook("a", "execute", HookKind::Transform, &["b_out"], &["a_out"]),
            hook("b", "execute", HookKind::Transform, &["a_out"], &["b_out"]),
        ];
        let err = EventGraph::build("execute", hooks).unwrap_err();
        assert!(matches!(err, GraphError::EventCycle { .. }));
    }

    #[tokio::test]
    async fn sibling_failure_does_not_block_generation() {
        let hooks = vec![
            hook("ok", "execute", HookKind::Check, &[], &[]),
            hook("bad", "execute", HookKind::Check, &[], &[]),
        ];
        let graph = EventGraph::build("execute", hooks).unwrap();

        struct OneFails;
        #[async_trait]
        impl HookInvoker for OneFails {
            async fn invoke(&self, hook: &Hook, _inputs: &EventValue) -> Result<HookOutput, EventFailure> {
                if &*hook.name == "bad" {
                    Err(EventFailure {
                        event: Arc::clone(&hook.name),
                        message: "boom".into(),
                    })
                } else {
                    Ok(HookOutput::Values(EventValue::new()))
                }
            }
        }

        let err = graph.run(&OneFails, EventValue::new()).await.unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(&*err[0].event, "bad");
    }

    #[tokio::test]
    async fn echo_invoker_runs_full_graph() {
        let hooks = vec![hook("fetch", "execute", HookKind::Action, &[], &["status"])];
        let graph = EventGraph::build("execute", hooks).unwrap();
        let outcomes = graph.run(&EchoInvoker, EventValue::new()).await.unwrap();
        assert_eq!(outcomes.len(), 1);
    }
}
