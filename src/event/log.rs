//! `Event`/`EventKind` — grounded on `tools/nika/src/event/log.rs`
//! (tagged enum, snake_case wire format) and the root crate's
//! `event_log.rs` (parking_lot-guarded append log with an atomic monotonic
//! id counter).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    StageStarted { stage: String },
    StageCompleted { stage: String },
    StageFailed { stage: String, reason: String },
    TransitionApplied { from_stage: String, to_stage: String },
    HookInvoked { stage: String, hook: String },
    HookFailed { stage: String, hook: String, reason: String },
    ConditionShortCircuit { stage: String, hook: String },
    ActionCompleted { stage: String, action: String, succeeded: bool },
    RaftTermChanged { node: String, term: u64 },
    RaftLeaderElected { node: String, term: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub kind: EventKind,
}

/// Append-only in-process event log. Grounded on the root crate's
/// `event_log.rs`: a `parking_lot::RwLock<Vec<Event>>` guarding the buffer,
/// and an atomic counter for ids so readers never block writers mid-append.
pub struct EventLog {
    started: std::time::Instant,
    next_id: AtomicU64,
    events: RwLock<Vec<Event>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            started: std::time::Instant::now(),
            next_id: AtomicU64::new(1),
            events: RwLock::new(Vec::new()),
        }
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            elapsed: self.started.elapsed(),
            kind,
        };
        self.events.write().push(event);
        id
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl super::emitter::EventEmitter for EventLog {
    fn emit(&self, kind: EventKind) -> u64 {
        self.record(kind)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
