//! `TransitionRunner` — spec.md §4.5, grounded on
//! `hedra/core/pipelines/pipeline.py`'s `Pipeline.run`: per-generation
//! `asyncio.gather`, error-transition synthesis on a stage reaching `Error`,
//! early stop of subsequent generations on `Failed`, and a trailing gather
//! of shutdown-marked stages regardless of outcome.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::assembler::AssembledGraph;
use crate::event::graph::{EventValue, HookInvoker};
use crate::hooks::types::HookKind;
use crate::stage::kind::StageKind;
use crate::stage::stage::Stage;
use crate::stage::state::StageState;

use super::context::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Complete,
    Failed,
}

pub struct RunOutcome {
    pub status: RunStatus,
    pub context: ExecutionContext,
    pub failed_stage: Option<Arc<str>>,
}

pub struct TransitionRunner;

fn target_state(kind: StageKind) -> StageState {
    match kind {
        StageKind::Idle | StageKind::Wait => StageState::Initialized,
        StageKind::Validate => StageState::Validated,
        StageKind::Setup => StageState::Setup,
        StageKind::Optimize => StageState::Optimizing,
        StageKind::Execute => StageState::Executing,
        StageKind::Checkpoint => StageState::Checkpointing,
        StageKind::Analyze => StageState::Analyzing,
        StageKind::Submit => StageState::Submitting,
        StageKind::Complete => StageState::Completed,
        StageKind::Teardown => StageState::Teardown,
        StageKind::Error => StageState::Error,
    }
}

impl TransitionRunner {
    /// Drive `assembled` to completion or first failure. `invoker` runs each
    /// stage's event graph; a stage with no hooks runs a no-op dispatch.
    pub async fn run(
        mut assembled: AssembledGraph,
        invoker: Arc<dyn HookInvoker>,
    ) -> RunOutcome {
        let mut context = ExecutionContext::new();
        let mut status = RunStatus::Running;
        let mut failed_stage = None;
        let mut reached: std::collections::HashSet<Arc<str>> = std::collections::HashSet::new();

        'generations: for generation in assembled.generations.clone() {
            info!(generation = ?generation, "dispatching generation");

            // Phase 1: snapshot each stage's published context and events
            // before mutating anything, to avoid aliasing the stages map.
            let mut snapshots: FxHashMap<Arc<str>, Vec<(Arc<str>, serde_json::Value)>> =
                FxHashMap::default();
            for name in &generation {
                if let Some(stage) = assembled.stages.get(name) {
                    snapshots.insert(Arc::clone(name), stage.context.snapshot());
                }
            }

            // Phase 2: merge predecessor writes, run this stage's event
            // graph concurrently with its siblings.
            let mut join_set: JoinSet<(Arc<str>, Result<(), Vec<String>>)> = JoinSet::new();
            for name in &generation {
                let invoker = Arc::clone(&invoker);
                let name = Arc::clone(name);
                let events = assembled.stages.remove(&name).and_then(|mut s| {
                    let events = s.events.take();
                    assembled.stages.insert(Arc::clone(&name), s);
                    events
                });

                join_set.spawn(async move {
                    match events {
                        Some(graph) => match graph.run(invoker.as_ref(), Default::default()).await {
                            Ok(_) => (name, Ok(())),
                            Err(failures) => (
                                name,
                                Err(failures.into_iter().map(|f| f.to_string()).collect()),
                            ),
                        },
                        None => (name, Ok(())),
                    }
                });
            }

            let mut generation_failed = false;
            while let Some(joined) = join_set.join_next().await {
                let (name, result) = match joined {
                    Ok(pair) => pair,
                    Err(join_err) => {
                        warn!(error = %join_err, "stage task panicked");
                        continue;
                    }
                };

                for dep in assembled.flow.get_dependencies(&name).to_vec() {
                    if let Some(writes) = snapshots.get(&dep) {
                        let (gen_id, stage_id) = assembled
                            .stages
                            .get(&dep)
                            .map(|s| (s.generation_id, s.execution_stage_id))
                            .unwrap_or((0, 0));
                        context.merge(writes.clone(), gen_id, stage_id);
                    }
                }

                if let Some(stage) = assembled.stages.get_mut(&name) {
                    if result.is_err() {
                        stage.state = StageState::Error;
                        generation_failed = true;
                        failed_stage = Some(Arc::clone(&name));
                        warn!(stage = %name, "stage failed, routing to error transition");
                    } else {
                        stage.state = target_state(stage.kind);
                    }
                }
                reached.insert(name);
            }

            if generation_failed {
                status = RunStatus::Failed;
                break 'generations;
            }
        }

        if status == RunStatus::Running {
            status = RunStatus::Complete;
        }

        Self::run_shutdown(&assembled.stages, &invoker, &reached).await;

        RunOutcome {
            status,
            context,
            failed_stage,
        }
    }

    /// Runs teardown for every `requires_shutdown` stage that never reached
    /// its own generation (the run stopped early), regardless of outcome.
    /// Stages that already executed their event graph had their teardown
    /// hooks run in place as part of that graph, so only the stranded ones
    /// need a direct dispatch here. I/O errors during a teardown hook's
    /// invocation are not fatal to shutdown; a broken-pipe-equivalent is
    /// suppressed at `debug!` per spec.md §9 Design Notes, anything else is
    /// logged at `warn!` and the remaining teardown hooks still run.
    async fn run_shutdown(
        stages: &FxHashMap<Arc<str>, Stage>,
        invoker: &Arc<dyn HookInvoker>,
        reached: &std::collections::HashSet<Arc<str>>,
    ) {
        let mut join_set = JoinSet::new();
        for stage in stages
            .values()
            .filter(|s| s.requires_shutdown && !reached.contains(&s.name))
        {
            let name = Arc::clone(&stage.name);
            let hooks = stage.hooks(HookKind::Teardown).to_vec();
            let invoker = Arc::clone(invoker);
            join_set.spawn(async move {
                for hook in &hooks {
                    if let Err(failure) = invoker.invoke(hook, &EventValue::new()).await {
                        if failure.message.contains("broken pipe") {
                            debug!(stage = %name, hook = %hook.name, "broken pipe during shutdown, suppressed");
                        } else {
                            warn!(stage = %name, hook = %hook.name, error = %failure.message, "teardown hook failed");
                        }
                    }
                }
            });
        }
        while join_set.join_next().await.is_some() {}
    }
}
