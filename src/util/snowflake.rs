//! Snowflake id generator for RAFT log entries.
//!
//! Grounded on `hedra.distributed.snowflake.snowflake_generator.SnowflakeGenerator`,
//! used by `RaftController` to stamp `Entry.entry_id`. Entries from the same
//! generator sort by time of creation; entries from different nodes never
//! collide because the node id occupies the low bits.
//!
//! Layout (64 bits, MSB first): 41 bits millis-since-epoch, 10 bits node id,
//! 12 bits per-millisecond sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const NODE_MASK: u64 = (1 << NODE_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: u32 = NODE_BITS + SEQUENCE_BITS;
const NODE_SHIFT: u32 = SEQUENCE_BITS;

/// Epoch custom to this crate so the 41-bit timestamp field doesn't run out
/// for a long time; value is an arbitrary fixed point, not semantically
/// meaningful.
const CUSTOM_EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Generates monotonically-sortable 64-bit ids for one RAFT node.
pub struct SnowflakeGenerator {
    node_id: u64,
    // Packs (last_millis << 12 | sequence) so a single CAS handles both.
    state: AtomicU64,
}

impl SnowflakeGenerator {
    pub fn new(node_id: u64) -> Self {
        Self {
            node_id: node_id & NODE_MASK,
            state: AtomicU64::new(0),
        }
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_millis() as u64
            - CUSTOM_EPOCH_MILLIS
    }

    /// Generate the next id. Never blocks; on sequence exhaustion within the
    /// same millisecond it spins forward to the next millisecond.
    pub fn generate(&self) -> u64 {
        loop {
            let now = Self::now_millis();
            let prev = self.state.load(Ordering::Acquire);
            let prev_millis = prev >> SEQUENCE_BITS;

            let (millis, sequence) = if now > prev_millis {
                (now, 0)
            } else {
                let next_seq = (prev & SEQUENCE_MASK) + 1;
                if next_seq > SEQUENCE_MASK {
                    // Sequence exhausted this millisecond; retry against the clock.
                    continue;
                }
                (prev_millis, next_seq)
            };

            let next_state = (millis << SEQUENCE_BITS) | sequence;
            if self
                .state
                .compare_exchange(prev, next_state, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return (millis << TIMESTAMP_SHIFT) | (self.node_id << NODE_SHIFT) | sequence;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_monotonically_increasing() {
        let gen = SnowflakeGenerator::new(1);
        let mut last = 0;
        for _ in 0..1000 {
            let id = gen.generate();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn ids_are_unique_across_two_nodes() {
        let gen_a = SnowflakeGenerator::new(1);
        let gen_b = SnowflakeGenerator::new(2);
        let mut seen = HashSet::new();
        for _ in 0..256 {
            assert!(seen.insert(gen_a.generate()));
            assert!(seen.insert(gen_b.generate()));
        }
    }
}
