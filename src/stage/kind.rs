//! `StageKind` — the closed set of stage kinds from spec.md §3.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Idle,
    Validate,
    Setup,
    Execute,
    Optimize,
    Analyze,
    Submit,
    Checkpoint,
    Complete,
    Teardown,
    Wait,
    Error,
}

impl StageKind {
    /// Whether the assembler treats this kind as a synthesized boundary
    /// stage it will insert implicitly when absent (spec.md §4.4 step 3).
    pub fn is_implicit_boundary(self) -> bool {
        matches!(
            self,
            StageKind::Idle | StageKind::Analyze | StageKind::Submit | StageKind::Complete
        )
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
