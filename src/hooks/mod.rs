//! Hook Registry & Types (component A).
//!
//! A hook is a user-declared callable attached to a stage, classified by
//! kind. Registration is explicit (a `Vec<HookSpec>` passed in at graph-load
//! time) rather than a decorator-registrar pattern: the registry is injected
//! into the `GraphAssembler`, not a process-wide singleton.

pub mod registry;
pub mod types;

pub use registry::HookRegistry;
pub use types::{Hook, HookBundle, HookKind, HookSpec};
