//! `MetricsSink` — the seam a caller wires to an external reporter.
//! Reporter backends are out of scope (spec.md §1 Non-goals); this crate
//! only defines the interface an embedder implements, grounded on the
//! `ActionClient`/`HookInvoker` inversion pattern used elsewhere.

use crate::action::types::ActionResult;
use crate::event::log::Event;

/// Receives engine telemetry as it happens. A no-op default is provided for
/// callers that don't need external reporting.
pub trait MetricsSink: Send + Sync {
    fn record_event(&self, event: &Event);
    fn record_action_result(&self, result: &ActionResult);
}

/// Discards everything; the default when no sink is configured.
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_event(&self, _event: &Event) {}
    fn record_action_result(&self, _result: &ActionResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_is_object_safe() {
        let sink: Box<dyn MetricsSink> = Box::new(NoopSink);
        let result = ActionResult::new("probe".into());
        sink.record_action_result(&result);
    }
}
