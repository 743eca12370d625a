//! End-to-end assembly + execution of a minimal linear graph, scenario 1
//! from spec.md §8: a single setup/execute chain runs to completion with
//! boundary stages synthesized automatically.

use std::sync::Arc;

use async_trait::async_trait;
use graphline::dag::assembler::{GraphAssembler, StageSpec};
use graphline::event::graph::{EventFailure, EventValue, HookInvoker, HookOutput};
use graphline::hooks::types::Hook;
use graphline::runtime::{RunStatus, TransitionRunner};
use graphline::stage::kind::StageKind;

struct AlwaysSucceeds;

#[async_trait]
impl HookInvoker for AlwaysSucceeds {
    async fn invoke(&self, _hook: &Hook, _inputs: &EventValue) -> Result<HookOutput, EventFailure> {
        Ok(HookOutput::Values(EventValue::new()))
    }
}

#[tokio::test]
async fn linear_graph_assembles_and_completes() {
    let specs = vec![
        StageSpec::new("setup", StageKind::Setup).depends_on("validate"),
        StageSpec::new("execute", StageKind::Execute).depends_on("setup"),
    ];

    let assembled = GraphAssembler::assemble(specs).expect("graph assembles");
    assert!(assembled.stages.contains_key("idle"));
    assert!(assembled.stages.contains_key("validate"));
    assert!(assembled.stages.contains_key("setup"));
    assert!(assembled.stages.contains_key("execute"));
    assert!(assembled.stages.contains_key("analyze"));
    assert!(assembled.stages.contains_key("submit"));
    assert!(assembled.stages.contains_key("complete"));

    let outcome = TransitionRunner::run(assembled, Arc::new(AlwaysSucceeds)).await;
    assert_eq!(outcome.status, RunStatus::Complete);
    assert!(outcome.failed_stage.is_none());
}
