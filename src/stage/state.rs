//! `StageState` — per-stage lifecycle states and the transition table keyed
//! by `(StageKind, StageKind)`, grounded on spec.md §4.3 and on
//! `hedra/core/pipelines/pipeline.py`'s stage-kind transition dispatch.

use rustc_hash::FxHashMap;

use crate::error::{GraphError, GraphResult};
use crate::stage::kind::StageKind;
use crate::stage::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageState {
    Initialized,
    Validated,
    Setup,
    Optimizing,
    Executing,
    Checkpointing,
    Analyzing,
    Submitting,
    Completed,
    Teardown,
    Error,
}

impl StageState {
    /// The state graph from spec.md §4.3: the main line plus the
    /// `Optimizing`/`Checkpointing` side branches, with `Teardown` reachable
    /// from any state and `Error` terminal.
    pub fn is_legal_transition(from: StageState, to: StageState) -> bool {
        use StageState::*;
        if to == Teardown || to == Error {
            return true;
        }
        matches!(
            (from, to),
            (Initialized, Validated)
                | (Validated, Setup)
                | (Setup, Optimizing)
                | (Setup, Executing)
                | (Optimizing, Executing)
                | (Executing, Checkpointing)
                | (Executing, Analyzing)
                | (Checkpointing, Analyzing)
                | (Analyzing, Submitting)
                | (Submitting, Completed)
        )
    }
}

/// A pure function over two stages: reads the source's published context,
/// writes mutations onto the destination. Kept as a plain fn pointer (not a
/// boxed closure) since the transition table is built once at assembly time
/// from a fixed, finite set of `(StageKind, StageKind)` pairs.
pub type TransitionFn = fn(&Stage, &mut Stage) -> GraphResult<()>;

/// Builds the default transition table covering every `(from.kind, to.kind)`
/// pair the assembler needs to resolve edges against (spec.md §4.4 step 5).
pub fn default_transition_table() -> FxHashMap<(StageKind, StageKind), TransitionFn> {
    use StageKind::*;

    let mut table: FxHashMap<(StageKind, StageKind), TransitionFn> = FxHashMap::default();
    let pairs: &[(StageKind, StageKind)] = &[
        (Idle, Validate),
        (Validate, Setup),
        (Setup, Optimize),
        (Setup, Execute),
        (Optimize, Execute),
        (Execute, Checkpoint),
        (Execute, Analyze),
        (Checkpoint, Analyze),
        (Analyze, Submit),
        (Submit, Complete),
        (Setup, Error),
        (Execute, Error),
        (Validate, Error),
        (Idle, Error),
        (Optimize, Error),
        (Checkpoint, Error),
        (Analyze, Error),
        (Submit, Error),
    ];
    for &(from, to) in pairs {
        table.insert((from, to), carry_forward_context);
    }
    table
}

/// Default transition behavior: merge the source's context into the
/// destination (actual merge-at-boundary arbitration happens in
/// `runtime::context::ExecutionContext::merge`, this just stages the write).
fn carry_forward_context(from: &Stage, to: &mut Stage) -> GraphResult<()> {
    if !StageState::is_legal_transition(from.state, to.state) {
        return Err(GraphError::IllegalTransition {
            stage: to.name.to_string(),
            from: format!("{:?}", from.state),
            to: format!("{:?}", to.state),
        });
    }
    for (key, value) in from.context.snapshot() {
        to.context.set(key, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_line_is_legal() {
        assert!(StageState::is_legal_transition(
            StageState::Initialized,
            StageState::Validated
        ));
        assert!(StageState::is_legal_transition(
            StageState::Analyzing,
            StageState::Submitting
        ));
    }

    #[test]
    fn teardown_and_error_reachable_from_anywhere() {
        assert!(StageState::is_legal_transition(StageState::Setup, StageState::Teardown));
        assert!(StageState::is_legal_transition(StageState::Executing, StageState::Error));
    }

    #[test]
    fn skipping_main_line_states_is_illegal() {
        assert!(!StageState::is_legal_transition(
            StageState::Initialized,
            StageState::Executing
        ));
    }

    #[test]
    fn default_table_covers_every_synthesized_edge_kind() {
        let table = default_transition_table();
        assert!(table.contains_key(&(StageKind::Idle, StageKind::Validate)));
        assert!(table.contains_key(&(StageKind::Analyze, StageKind::Submit)));
    }
}
