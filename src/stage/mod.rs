//! Stage State Machine (component C).
//!
//! `StageKind` and `StageState` implement the lifecycle from spec.md §4.3;
//! `Stage` is the per-run unit the `GraphAssembler` builds and the
//! `TransitionRunner` drives.

pub mod kind;
pub mod stage;
pub mod state;

pub use kind::StageKind;
pub use stage::{Context, Stage};
pub use state::{StageState, TransitionFn};
