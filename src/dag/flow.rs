//! `FlowGraph` — adjacency, reachability, and cycle detection over stage
//! names. Grounded on `tools/nika/src/dag/flow.rs`: `Arc<str>`
//! keys interned once, `FxHashMap` adjacency, `SmallVec<[Arc<str>; 4]>` for
//! the common case of a handful of dependencies per stage.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::GraphError;

type DepVec = SmallVec<[Arc<str>; 4]>;

#[derive(Debug, Default, Clone)]
pub struct FlowGraph {
    /// stage -> stages it depends on
    dependencies: FxHashMap<Arc<str>, DepVec>,
    /// stage -> stages that depend on it
    successors: FxHashMap<Arc<str>, DepVec>,
    all: Vec<Arc<str>>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a flat `(stage, dependencies)` list, as supplied by the
    /// assembler after synthesizing implicit boundary stages.
    pub fn from_edges(stages: &[(Arc<str>, Vec<Arc<str>>)]) -> Self {
        let mut graph = FlowGraph::new();
        for (stage, _) in stages {
            graph.all.push(Arc::clone(stage));
            graph.dependencies.entry(Arc::clone(stage)).or_default();
            graph.successors.entry(Arc::clone(stage)).or_default();
        }
        for (stage, deps) in stages {
            for dep in deps {
                graph
                    .dependencies
                    .entry(Arc::clone(stage))
                    .or_default()
                    .push(Arc::clone(dep));
                graph
                    .successors
                    .entry(Arc::clone(dep))
                    .or_default()
                    .push(Arc::clone(stage));
            }
        }
        graph
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.dependencies.contains_key(stage)
    }

    pub fn get_dependencies(&self, stage: &str) -> &[Arc<str>] {
        self.dependencies.get(stage).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_successors(&self, stage: &str) -> &[Arc<str>] {
        self.successors.get(stage).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_final_stages(&self) -> Vec<Arc<str>> {
        self.all
            .iter()
            .filter(|s| self.get_successors(s).is_empty())
            .cloned()
            .collect()
    }

    pub fn get_source_stages(&self) -> Vec<Arc<str>> {
        self.all
            .iter()
            .filter(|s| self.get_dependencies(s).is_empty())
            .cloned()
            .collect()
    }

    pub fn stages(&self) -> &[Arc<str>] {
        &self.all
    }

    /// BFS reachability from `from` to `to`, following successor edges.
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut visited = std::collections::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(from.to_string());
        visited.insert(from.to_string());
        while let Some(current) = queue.pop_front() {
            for succ in self.get_successors(&current) {
                if succ.as_ref() == to {
                    return true;
                }
                if visited.insert(succ.to_string()) {
                    queue.push_back(succ.to_string());
                }
            }
        }
        false
    }

    /// Three-color DFS. Returns the offending cycle path when found.
    pub fn detect_cycles(&self) -> Option<Vec<Arc<str>>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: FxHashMap<Arc<str>, Color> =
            self.all.iter().map(|s| (Arc::clone(s), Color::White)).collect();
        let mut path: Vec<Arc<str>> = Vec::new();

        fn visit(
            node: &Arc<str>,
            graph: &FlowGraph,
            color: &mut FxHashMap<Arc<str>, Color>,
            path: &mut Vec<Arc<str>>,
        ) -> Option<Vec<Arc<str>>> {
            color.insert(Arc::clone(node), Color::Gray);
            path.push(Arc::clone(node));
            for succ in graph.get_successors(node) {
                match color.get(succ).copied().unwrap_or(Color::White) {
                    Color::White => {
                        if let Some(cycle) = visit(succ, graph, color, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Gray => {
                        let start = path.iter().position(|n| n == succ).unwrap_or(0);
                        let mut cycle: Vec<Arc<str>> = path[start..].to_vec();
                        cycle.push(Arc::clone(succ));
                        return Some(cycle);
                    }
                    Color::Black => {}
                }
            }
            path.pop();
            color.insert(Arc::clone(node), Color::Black);
            None
        }

        for stage in &self.all {
            if color.get(stage).copied() == Some(Color::White) {
                if let Some(cycle) = visit(stage, self, &mut color, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    pub fn validate_acyclic(&self) -> Result<(), GraphError> {
        if let Some(cycle) = self.detect_cycles() {
            return Err(GraphError::CycleDetected {
                path: cycle.iter().map(|s| s.to_string()).collect(),
            });
        }
        Ok(())
    }

    /// Stages with no incoming and no outgoing edges at all.
    pub fn isolated_stages(&self) -> Vec<Arc<str>> {
        self.all
            .iter()
            .filter(|s| self.get_dependencies(s).is_empty() && self.get_successors(s).is_empty())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &[&str])]) -> Vec<(Arc<str>, Vec<Arc<str>>)> {
        pairs
            .iter()
            .map(|(s, deps)| (Arc::from(*s), deps.iter().map(|d| Arc::from(*d)).collect()))
            .collect()
    }

    #[test]
    fn test_detect_cycle_simple() {
        let graph = FlowGraph::from_edges(&edges(&[
            ("a", &["c"]),
            ("b", &["a"]),
            ("c", &["b"]),
        ]));
        assert!(graph.detect_cycles().is_some());
    }

    #[test]
    fn test_no_cycle_linear() {
        let graph = FlowGraph::from_edges(&edges(&[("a", &[]), ("b", &["a"]), ("c", &["b"])]));
        assert!(graph.detect_cycles().is_none());
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let graph = FlowGraph::from_edges(&edges(&[("a", &["a"])]));
        assert!(graph.detect_cycles().is_some());
    }

    #[test]
    fn test_diamond_no_cycle() {
        let graph = FlowGraph::from_edges(&edges(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]));
        assert!(graph.detect_cycles().is_none());
        assert!(graph.has_path("a", "d"));
    }

    #[test]
    fn test_disconnected_no_cycle() {
        let graph = FlowGraph::from_edges(&edges(&[("a", &[]), ("b", &[])]));
        assert!(graph.detect_cycles().is_none());
        assert!(!graph.has_path("a", "b"));
    }

    #[test]
    fn test_cycle_path_includes_all_nodes() {
        let graph = FlowGraph::from_edges(&edges(&[
            ("a", &["c"]),
            ("b", &["a"]),
            ("c", &["b"]),
        ]));
        let cycle = graph.detect_cycles().unwrap();
        assert!(cycle.len() >= 3);
    }

    #[test]
    fn isolated_stage_has_no_edges() {
        let graph = FlowGraph::from_edges(&edges(&[("a", &[]), ("b", &["a"]), ("lonely", &[])]));
        assert_eq!(graph.isolated_stages(), vec![Arc::<str>::from("lonely")]);
    }
}
