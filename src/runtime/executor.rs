//! `ActionExecutor` — spec.md §4.6 steps 1-9, grounded on
//! `hedra/core/graphs/stages/setup.py` (per-stage `Client`/`Config`
//! construction at prepare time) and `hedra/core/engines/types/http/result.py`
//! (timing stamps and derived accessors).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::instrument;

use crate::action::client::ActionClient;
use crate::action::types::{Action, ActionResult};
use crate::error::{GraphError, GraphResult};
use crate::event::graph::{EventValue, HookInvoker, HookOutput};
use crate::hooks::types::{Hook, HookBundle};

use super::persona::Persona;
use super::pool::ConnectionPool;

pub struct ActionExecutor<C: ActionClient> {
    client: Arc<C>,
    semaphore: Arc<Semaphore>,
    pool: Arc<ConnectionPool<u64>>,
    action_timeout: Duration,
}

impl<C: ActionClient + 'static> ActionExecutor<C> {
    pub fn new(client: Arc<C>, concurrency: usize, pool_capacity: usize, action_timeout: Duration) -> Self {
        let pool = Arc::new(ConnectionPool::new("action-executor", pool_capacity, {
            let mut next = 0u64;
            move || {
                next += 1;
                next
            }
        }));
        pool.warm();
        ActionExecutor {
            client,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            pool,
            action_timeout,
        }
    }

    pub fn in_flight_permits_available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn pool(&self) -> &ConnectionPool<u64> {
        &self.pool
    }

    /// Executes one action through the full pipeline: admission, connection
    /// checkout, before/after/check hooks, timeout-wrapped call, and
    /// poisoning-safe pool release. Never returns `Err` for a per-action
    /// failure — those are captured in `ActionResult::error` per spec.md §7.
    #[instrument(skip(self, action, hooks, invoker))]
    pub async fn execute_one(
        &self,
        action: &Action,
        hooks: &HookBundle,
        invoker: &dyn HookInvoker,
    ) -> GraphResult<ActionResult> {
        let mut result = ActionResult::new(action.name.clone());
        result.timings.wait_start = Some(Instant::now());

        let _permit = self.semaphore.acquire().await.map_err(|_| GraphError::PoolExhausted {
            resource: action.name.clone(),
            capacity: 0,
        })?;
        let leased = self.pool.acquire().await?;

        for before in &hooks.before {
            self.invoke_side_effect(before, invoker).await;
        }

        result.timings.start = Some(Instant::now());

        let call = tokio::time::timeout(self.action_timeout, self.client.execute(action)).await;

        let mut poisoned = false;
        match call {
            Ok(Ok(mut executed)) => {
                executed.timings.wait_start = result.timings.wait_start;
                executed.timings.start = result.timings.start;
                result = executed;
            }
            Ok(Err(err)) => {
                result.timings.read_end = Some(Instant::now());
                result.error = Some(err.to_string());
                poisoned = true;
            }
            Err(_elapsed) => {
                result.timings.read_end = Some(Instant::now());
                result.error = Some(
                    GraphError::ActionTimeout {
                        name: action.name.clone(),
                        timeout_ms: self.action_timeout.as_millis() as u64,
                    }
                    .to_string(),
                );
                poisoned = true;
            }
        }

        if poisoned || !result.is_success_or_unchecked() {
            self.pool.discard(leased);
        } else {
            self.pool.release(leased);
        }

        for after in &hooks.after {
            self.invoke_side_effect(after, invoker).await;
        }

        for check in &hooks.checks {
            let inputs = EventValue::new();
            match invoker.invoke(check, &inputs).await {
                Ok(HookOutput::Condition(false)) => {
                    result.error = Some(format!("check '{}' failed", check.short_name));
                }
                Err(failure) => {
                    result.error = Some(failure.to_string());
                }
                _ => {}
            }
        }

        Ok(result)
    }

    async fn invoke_side_effect(&self, hook: &Hook, invoker: &dyn HookInvoker) {
        let inputs = EventValue::new();
        let _ = invoker.invoke(hook, &inputs).await;
    }

    /// Drives `action` under `persona`'s batch schedule, yielding each
    /// `execute_one` result as soon as it lands, until `budget` elapses.
    /// Grounded on the root crate's `MockRuntime::events` shape: a spawned
    /// task pushes onto an `mpsc::Sender`, the caller reads the matching
    /// `ReceiverStream`. Per spec.md §4.6, `Execute` stages drive their
    /// action hooks this way rather than waiting on one batched `Vec`.
    pub fn run_persona(
        self: &Arc<Self>,
        persona: Persona,
        action: Action,
        hooks: Arc<HookBundle>,
        invoker: Arc<dyn HookInvoker>,
        budget: Duration,
    ) -> impl Stream<Item = GraphResult<ActionResult>> {
        let (tx, rx) = tokio::sync::mpsc::channel(persona.concurrency_at(Duration::ZERO).max(1));
        let executor = Arc::clone(self);

        tokio::spawn(async move {
            let started = Instant::now();
            let mut iteration: u64 = 0;

            while started.elapsed() < budget {
                let batch = persona.batch_size(iteration).max(1);
                let mut handles = Vec::with_capacity(batch);
                for _ in 0..batch {
                    let executor = Arc::clone(&executor);
                    let action = action.clone();
                    let hooks = Arc::clone(&hooks);
                    let invoker = Arc::clone(&invoker);
                    let tx = tx.clone();
                    handles.push(tokio::spawn(async move {
                        let result = executor.execute_one(&action, &hooks, invoker.as_ref()).await;
                        let _ = tx.send(result).await;
                    }));
                }
                for handle in handles {
                    let _ = handle.await;
                }
                iteration += 1;
            }
        });

        ReceiverStream::new(rx)
    }
}

impl ActionResult {
    /// Loose success gate used by the executor to decide pool
    /// discard-vs-release: anything with a captured error, or a result that
    /// never got a status at all, is treated as unsafe to reuse the
    /// connection for.
    fn is_success_or_unchecked(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::client::{CannedBody, CannedResponse, ReferenceClient};
    use crate::action::types::Scheme;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullInvoker;

    #[async_trait]
    impl HookInvoker for NullInvoker {
        async fn invoke(
            &self,
            _hook: &Hook,
            _inputs: &EventValue,
        ) -> Result<HookOutput, crate::event::graph::EventFailure> {
            Ok(HookOutput::Condition(true))
        }
    }

    /// Counts concurrent `invoke` calls while a permit is held, proving the
    /// executor's admission gate actually bounds concurrency rather than
    /// just bounding the test's own spawn rate.
    struct CountingInvoker {
        in_flight: Arc<AtomicUsize>,
        max_observed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HookInvoker for CountingInvoker {
        async fn invoke(
            &self,
            _hook: &Hook,
            _inputs: &EventValue,
        ) -> Result<HookOutput, crate::event::graph::EventFailure> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(HookOutput::Condition(true))
        }
    }

    fn getroot_action() -> Action {
        Action {
            name: "getRoot".into(),
            scheme: Scheme::Http,
            host: "localhost".into(),
            port: 8080,
            path: "/".into(),
            method: "GET".into(),
            headers: HashMap::new(),
            payload: vec![],
            stage_name: "execute".into(),
            setup: false,
            hooks: Default::default(),
        }
    }

    #[tokio::test]
    async fn successful_action_returns_no_error() {
        let client = Arc::new(ReferenceClient::new());
        client.register(
            "getRoot",
            CannedResponse {
                status: 200,
                headers: HashMap::new(),
                body: CannedBody::Plain(b"ok".to_vec()),
                fail_with: None,
            },
        );
        let executor = ActionExecutor::new(client, 4, 4, Duration::from_secs(1));
        let result = executor
            .execute_one(&getroot_action(), &HookBundle::default(), &NullInvoker)
            .await
            .unwrap();
        assert!(result.error.is_none());
        assert_eq!(result.body, b"ok");
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_configured_bound() {
        let client = Arc::new(ReferenceClient::new());
        client.register(
            "getRoot",
            CannedResponse {
                status: 200,
                headers: HashMap::new(),
                body: CannedBody::Plain(b"ok".to_vec()),
                fail_with: None,
            },
        );
        let executor = Arc::new(ActionExecutor::new(client, 2, 2, Duration::from_secs(1)));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_observed = Arc::new(AtomicUsize::new(0));

        let mut bundle = HookBundle::default();
        bundle.before.push(Hook::new("execute::mark", "execute", crate::hooks::types::HookKind::Before));
        let bundle = Arc::new(bundle);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let executor = Arc::clone(&executor);
            let bundle = Arc::clone(&bundle);
            let invoker = CountingInvoker {
                in_flight: Arc::clone(&in_flight),
                max_observed: Arc::clone(&max_observed),
            };
            handles.push(tokio::spawn(async move {
                let _ = executor.execute_one(&getroot_action(), &bundle, &invoker).await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert!(max_observed.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn failed_action_discards_connection() {
        let client = Arc::new(ReferenceClient::new());
        client.register(
            "getRoot",
            CannedResponse {
                status: 0,
                headers: HashMap::new(),
                body: CannedBody::Plain(vec![]),
                fail_with: Some("reset".into()),
            },
        );
        let executor = ActionExecutor::new(client, 1, 1, Duration::from_secs(1));
        let result = executor
            .execute_one(&getroot_action(), &HookBundle::default(), &NullInvoker)
            .await
            .unwrap();
        assert!(result.error.is_some());
        assert_eq!(executor.pool().len(), 1);
    }

    #[tokio::test]
    async fn run_persona_yields_a_result_per_dispatched_action() {
        use tokio_stream::StreamExt;

        let client = Arc::new(ReferenceClient::new());
        client.register(
            "getRoot",
            CannedResponse {
                status: 200,
                headers: HashMap::new(),
                body: CannedBody::Plain(b"ok".to_vec()),
                fail_with: None,
            },
        );
        let executor = Arc::new(ActionExecutor::new(client, 4, 4, Duration::from_secs(1)));
        let persona = Persona::Sequence { batch_sizes: vec![3] };

        let stream = executor.run_persona(
            persona,
            getroot_action(),
            Arc::new(HookBundle::default()),
            Arc::new(NullInvoker),
            Duration::from_millis(50),
        );
        tokio::pin!(stream);

        let mut results = Vec::new();
        while let Some(result) = stream.next().await {
            results.push(result.unwrap());
        }
        // `Sequence` repeats its last batch size once the list is exhausted,
        // so every iteration within the budget dispatches exactly 3 actions.
        assert!(!results.is_empty());
        assert_eq!(results.len() % 3, 0);
        assert!(results.iter().all(|r| r.error.is_none()));
    }
}
