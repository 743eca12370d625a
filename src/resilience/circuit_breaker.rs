//! `CircuitBreaker` — grounded on the root crate's `limits.rs::CircuitBreaker`:
//! closed/open/half-open states, trips after N consecutive failures, resets
//! after a cooldown window.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    opened_at_millis: AtomicU64,
    started: Instant,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        CircuitBreaker {
            failure_threshold,
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            opened_at_millis: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> CircuitState {
        let opened_at = self.opened_at_millis.load(Ordering::Acquire);
        if opened_at == 0 {
            return CircuitState::Closed;
        }
        let elapsed = self.started.elapsed().as_millis() as u64 - opened_at;
        if elapsed >= self.cooldown.as_millis() as u64 {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        self.opened_at_millis.store(0, Ordering::Release);
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.failure_threshold {
            let now_millis = self.started.elapsed().as_millis() as u64;
            self.opened_at_millis.store(now_millis.max(1), Ordering::Release);
        }
    }

    /// Whether a new call should be admitted right now.
    pub fn allow_request(&self) -> bool {
        !matches!(self.state(), CircuitState::Open)
    }
}
