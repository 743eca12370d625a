//! Transition Runner + Action Executor (components E and F).

pub mod context;
pub mod executor;
pub mod persona;
pub mod pool;
pub mod transition;

pub use context::ExecutionContext;
pub use executor::ActionExecutor;
pub use persona::Persona;
pub use pool::ConnectionPool;
pub use transition::{RunOutcome, RunStatus, TransitionRunner};
