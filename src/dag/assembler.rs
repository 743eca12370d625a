//! `GraphAssembler` — spec.md §4.4, grounded on
//! `hedra/core/pipelines/pipeline.py`'s `Pipeline.validate`: prepend
//! `Idle`/`Validate`, append `Analyze`/`Submit`/`Complete`,
//! `networkx.topological_generations`-equivalent layering, and rejection of
//! `networkx.isolates`.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::event::EventGraph;
use crate::hooks::types::HookSpec;
use crate::stage::kind::StageKind;
use crate::stage::stage::Stage;
use crate::stage::state::default_transition_table;

use super::edge::Edge;
use super::flow::FlowGraph;

/// What a caller declares per stage before assembly (stand-in for "user
/// stage classes" in spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,
    pub kind: StageKind,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub hooks: Vec<HookSpec>,
    #[serde(default)]
    pub requires_shutdown: bool,
}

impl StageSpec {
    pub fn new(name: impl Into<String>, kind: StageKind) -> Self {
        StageSpec {
            name: name.into(),
            kind,
            dependencies: Vec::new(),
            hooks: Vec::new(),
            requires_shutdown: false,
        }
    }

    pub fn depends_on(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }
}

pub struct AssembledGraph {
    pub stages: FxHashMap<Arc<str>, Stage>,
    pub flow: FlowGraph,
    pub generations: Vec<Vec<Arc<str>>>,
    pub edges: Vec<Edge>,
}

pub struct GraphAssembler;

impl GraphAssembler {
    /// Implements spec.md §4.4 steps 1-6.
    pub fn assemble(mut specs: Vec<StageSpec>) -> GraphResult<AssembledGraph> {
        Self::synthesize_boundaries(&mut specs);

        let edges_for_flow: Vec<(Arc<str>, Vec<Arc<str>>)> = specs
            .iter()
            .map(|s| {
                (
                    Arc::from(s.name.as_str()),
                    s.dependencies.iter().map(|d| Arc::from(d.as_str())).collect(),
                )
            })
            .collect();
        let flow = FlowGraph::from_edges(&edges_for_flow);

        let known: std::collections::HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        for spec in &specs {
            for dep in &spec.dependencies {
                if !known.contains(dep.as_str()) {
                    return Err(GraphError::UnknownDependency {
                        from: spec.name.clone(),
                        to: dep.clone(),
                    });
                }
            }
        }

        flow.validate_acyclic()?;

        let isolated = flow.isolated_stages();
        let idle_name: Arc<str> = Arc::from("idle");
        let isolated: Vec<Arc<str>> = isolated.into_iter().filter(|s| *s != idle_name).collect();
        if !isolated.is_empty() {
            return Err(GraphError::IsolatedStages {
                count: isolated.len(),
                names: isolated.iter().map(|s| s.to_string()).collect(),
            });
        }

        let sources = flow.get_source_stages();
        if sources.len() != 1 {
            return Err(GraphError::MultipleSources { count: sources.len() });
        }
        let sinks = flow.get_final_stages();
        if sinks.len() != 1 {
            return Err(GraphError::MultipleSinks { count: sinks.len() });
        }

        let generations = Self::assign_generations(&specs, &flow)?;

        let transition_table = default_transition_table();
        let spec_by_name: FxHashMap<&str, &StageSpec> =
            specs.iter().map(|s| (s.name.as_str(), s)).collect();

        let mut edges = Vec::new();
        for spec in &specs {
            for dep in &spec.dependencies {
                let from_spec = *spec_by_name
                    .get(dep.as_str())
                    .ok_or_else(|| GraphError::UnknownDependency {
                        from: spec.name.clone(),
                        to: dep.clone(),
                    })?;
                let transition = transition_table
                    .get(&(from_spec.kind, spec.kind))
                    .copied()
                    .ok_or_else(|| GraphError::UnsupportedTransition {
                        from_kind: format!("{:?}", from_spec.kind),
                        to_kind: format!("{:?}", spec.kind),
                    })?;
                edges.push(Edge::new(
                    Arc::from(dep.as_str()),
                    Arc::from(spec.name.as_str()),
                    transition,
                    Duration::from_secs(60),
                ));
            }
        }

        let mut stages = FxHashMap::default();
        for (gen_id, layer) in generations.iter().enumerate() {
            for name in layer {
                let spec = spec_by_name[name.as_ref()];
                let mut stage = Stage::new(
                    Arc::clone(name),
                    spec.kind,
                    spec.dependencies.iter().map(|d| Arc::from(d.as_str())).collect(),
                );
                stage.generation_id = gen_id as u32;
                stage.requires_shutdown = spec.requires_shutdown;

                for hook_spec in &spec.hooks {
                    let hook = crate::hooks::types::Hook {
                        name: Arc::from(hook_spec.name.as_str()),
                        short_name: Arc::from(
                            hook_spec.name.rsplit("::").next().unwrap_or(&hook_spec.name),
                        ),
                        stage_name: Arc::clone(name),
                        kind: hook_spec.kind,
                        params: hook_spec.params.iter().map(|p| Arc::from(p.as_str())).collect(),
                        produces: hook_spec.produces.iter().map(|p| Arc::from(p.as_str())).collect(),
                        order: hook_spec.order,
                        weight: 1,
                        skip: false,
                    };
                    stage.add_hook(hook);
                }

                let all_hooks: Vec<_> = stage.hooks_by_kind.values().flatten().cloned().collect();
                stage.events = Some(EventGraph::build(name, all_hooks)?);

                stages.insert(Arc::clone(name), stage);
            }
        }

        Ok(AssembledGraph {
            stages,
            flow,
            generations,
            edges,
        })
    }

    /// Step 3: prepend Idle (single source) + Validate (second layer),
    /// append Analyze/Submit/Complete (single sink) when absent.
    fn synthesize_boundaries(specs: &mut Vec<StageSpec>) {
        let has = |specs: &[StageSpec], kind: StageKind| specs.iter().any(|s| s.kind == kind);

        if !has(specs, StageKind::Idle) {
            specs.insert(0, StageSpec::new("idle", StageKind::Idle));
        }
        let idle_name = specs
            .iter()
            .find(|s| s.kind == StageKind::Idle)
            .unwrap()
            .name
            .clone();

        if !has(specs, StageKind::Validate) {
            let insert_at = 1;
            specs.insert(insert_at, StageSpec::new("validate", StageKind::Validate).depends_on(&idle_name));
        }
        let validate_name = specs
            .iter()
            .find(|s| s.kind == StageKind::Validate)
            .unwrap()
            .name
            .clone();

        // Every first-layer user stage hangs off Validate, not Idle directly:
        // the transition table only defines the (Idle, Validate) kind-edge, so
        // Idle must have exactly one successor in kind-space.
        for spec in specs.iter_mut() {
            if spec.kind != StageKind::Idle && spec.kind != StageKind::Validate && spec.dependencies.is_empty() {
                spec.dependencies.push(validate_name.clone());
            }
        }

        let leaf_names: Vec<String> = {
            let with_successor: std::collections::HashSet<&str> = specs
                .iter()
                .flat_map(|s| s.dependencies.iter().map(|d| d.as_str()))
                .collect();
            specs
                .iter()
                .filter(|s| !with_successor.contains(s.name.as_str()))
                .map(|s| s.name.clone())
                .collect()
        };

        if !has(specs, StageKind::Analyze) {
            let mut analyze = StageSpec::new("analyze", StageKind::Analyze);
            for leaf in &leaf_names {
                analyze = analyze.depends_on(leaf);
            }
            specs.push(analyze);
        }
        let analyze_name = specs
            .iter()
            .find(|s| s.kind == StageKind::Analyze)
            .unwrap()
            .name
            .clone();

        if !has(specs, StageKind::Submit) {
            specs.push(StageSpec::new("submit", StageKind::Submit).depends_on(&analyze_name));
        }
        let submit_name = specs
            .iter()
            .find(|s| s.kind == StageKind::Submit)
            .unwrap()
            .name
            .clone();

        if !has(specs, StageKind::Complete) {
            specs.push(StageSpec::new("complete", StageKind::Complete).depends_on(&submit_name));
        }
    }

    /// Step 4: Kahn's algorithm; ties broken by declaration order.
    fn assign_generations(
        specs: &[StageSpec],
        flow: &FlowGraph,
    ) -> GraphResult<Vec<Vec<Arc<str>>>> {
        let order: FxHashMap<&str, usize> =
            specs.iter().enumerate().map(|(i, s)| (s.name.as_str(), i)).collect();

        let mut in_degree: FxHashMap<Arc<str>, usize> = flow
            .stages()
            .iter()
            .map(|s| (Arc::clone(s), flow.get_dependencies(s).len()))
            .collect();

        let mut generations = Vec::new();
        let mut ready: Vec<Arc<str>> = in_degree
            .iter()
            .filter(|(_, &d)| d == 0)
            .map(|(s, _)| Arc::clone(s))
            .collect();
        ready.sort_by_key(|s| order.get(s.as_ref()).copied().unwrap_or(usize::MAX));

        let mut visited = 0;
        while !ready.is_empty() {
            visited += ready.len();
            generations.push(ready.clone());
            let mut next_ready = Vec::new();
            for stage in &ready {
                for succ in flow.get_successors(stage) {
                    let degree = in_degree.get_mut(succ).expect("successor in in_degree map");
                    *degree -= 1;
                    if *degree == 0 {
                        next_ready.push(Arc::clone(succ));
                    }
                }
            }
            next_ready.sort_by_key(|s| order.get(s.as_ref()).copied().unwrap_or(usize::MAX));
            ready = next_ready;
        }

        if visited != flow.stages().len() {
            return Err(GraphError::CycleDetected {
                path: vec!["<unresolved during generation assignment>".to_string()],
            });
        }

        Ok(generations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::kind::StageKind;

    #[test]
    fn assembles_minimal_graph_with_synthesized_boundaries() {
        let specs = vec![StageSpec::new("setup", StageKind::Setup)
            .depends_on("validate")];
        let assembled = GraphAssembler::assemble(specs).unwrap();
        assert!(assembled.stages.contains_key("idle"));
        assert!(assembled.stages.contains_key("validate"));
        assert!(assembled.stages.contains_key("analyze"));
        assert!(assembled.stages.contains_key("submit"));
        assert!(assembled.stages.contains_key("complete"));
    }

    #[test]
    fn rejects_cycles() {
        let specs = vec![
            StageSpec::new("a", StageKind::Setup).depends_on("c"),
            StageSpec::new("b", StageKind::Execute).depends_on("a"),
            StageSpec::new("c", StageKind::Analyze).depends_on("b"),
        ];
        let err = GraphAssembler::assemble(specs).unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected { .. }));
    }

    #[test]
    fn single_source_and_sink() {
        let specs = vec![StageSpec::new("setup", StageKind::Setup).depends_on("validate")];
        let assembled = GraphAssembler::assemble(specs).unwrap();
        assert_eq!(assembled.flow.get_source_stages().len(), 1);
        assert_eq!(assembled.flow.get_final_stages().len(), 1);
    }
}
