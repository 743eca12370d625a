//! `ConnectionPool` — a semaphore-gated, pre-warmed pool of reusable
//! connections. Grounded on the root crate's `context_pool.rs::ContextPool`
//! (bounded reusable-object pool with `get`/`return_context`/`warm`),
//! generalized here from `ExecutionContext` reuse to protocol `Connection`
//! reuse, with spec.md §4.6 step 8's rule: a connection touched by a failed
//! action is never returned to the pool — it's discarded and replaced.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::error::{GraphError, GraphResult};

/// A connection checked out of the pool. Dropping it without calling
/// `release` or `discard` leaks the permit (intentional: callers must make
/// an explicit decision per spec.md §4.6 step 8).
pub struct Leased<'a, C> {
    conn: Option<C>,
    _permit: SemaphorePermit<'a>,
}

impl<'a, C> Leased<'a, C> {
    pub fn get(&self) -> &C {
        self.conn.as_ref().expect("connection present while leased")
    }

    pub fn get_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection present while leased")
    }
}

pub struct ConnectionPool<C> {
    resource: String,
    capacity: usize,
    idle: Mutex<Vec<C>>,
    semaphore: Arc<Semaphore>,
    factory: Arc<dyn Fn() -> C + Send + Sync>,
}

impl<C: Send + 'static> ConnectionPool<C> {
    pub fn new(resource: impl Into<String>, capacity: usize, factory: impl Fn() -> C + Send + Sync + 'static) -> Self {
        ConnectionPool {
            resource: resource.into(),
            capacity,
            idle: Mutex::new(Vec::with_capacity(capacity)),
            semaphore: Arc::new(Semaphore::new(capacity)),
            factory: Arc::new(factory),
        }
    }

    /// Pre-fill the pool to capacity so `acquire` never has to construct a
    /// connection on the hot path.
    pub fn warm(&self) {
        let mut idle = self.idle.lock();
        while idle.len() < self.capacity {
            idle.push((self.factory)());
        }
    }

    pub fn len(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire a slot and a connection. Pool size equals semaphore size, so
    /// once the permit is granted a connection is guaranteed to be idle
    /// (spec.md §5: "pop never blocks waiting on a connection").
    pub async fn acquire(&self) -> GraphResult<Leased<'_, C>> {
        let permit = self.semaphore.acquire().await.map_err(|_| GraphError::PoolPoisoned {
            resource: self.resource.clone(),
        })?;
        let conn = self
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| (self.factory)());
        Ok(Leased {
            conn: Some(conn),
            _permit: permit,
        })
    }

    /// Return a healthy connection to the pool.
    pub fn release(&self, mut leased: Leased<'_, C>) {
        if let Some(conn) = leased.conn.take() {
            self.idle.lock().push(conn);
        }
    }

    /// Discard a connection that was touched by a failed action and replace
    /// it with a freshly constructed one — never return a poisoned
    /// connection to the pool.
    pub fn discard(&self, mut leased: Leased<'_, C>) {
        leased.conn.take();
        self.idle.lock().push((self.factory)());
    }
}
