//! `Persona` — dispatch policy governing action rate/concurrency/ordering
//! within an `Execute` stage (spec.md's Glossary). New relative to the
//! distilled spec; grounded on the persona references in
//! `hedra/core/graphs/stages/optimize/optimization/distribution_fit_optimizer.py`
//! (`persona.batch.size`, `persona.batch.interval`, `persona.set_concurrency`).

use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Persona {
    /// Dispatch at a fixed concurrency for the whole stage duration.
    ConstantRate { concurrency: usize },
    /// Linearly interpolate concurrency from `start` to `end` over
    /// `duration`.
    Ramp {
        start: usize,
        end: usize,
        duration: Duration,
    },
    /// Dispatch batches in a fixed sequence, one batch size per interval.
    Sequence { batch_sizes: Vec<usize> },
    /// Pick among a fixed set of action weights each iteration (used with
    /// `Hook::weight`).
    Weighted { weights: Vec<u32> },
}

impl Persona {
    /// Current target concurrency at `elapsed` time into the stage.
    pub fn concurrency_at(&self, elapsed: Duration) -> usize {
        match self {
            Persona::ConstantRate { concurrency } => *concurrency,
            Persona::Ramp { start, end, duration } => {
                if duration.is_zero() || elapsed >= *duration {
                    return *end;
                }
                let fraction = elapsed.as_secs_f64() / duration.as_secs_f64();
                let start = *start as f64;
                let end = *end as f64;
                (start + (end - start) * fraction).round() as usize
            }
            Persona::Sequence { batch_sizes } => batch_sizes.last().copied().unwrap_or(1),
            Persona::Weighted { weights } => weights.iter().sum::<u32>().max(1) as usize,
        }
    }

    /// Batch size for iteration `n`, used by `Sequence`; other personas
    /// return their constant concurrency as a single batch.
    pub fn batch_size(&self, iteration: usize) -> usize {
        match self {
            Persona::Sequence { batch_sizes } => batch_sizes
                .get(iteration)
                .copied()
                .unwrap_or_else(|| batch_sizes.last().copied().unwrap_or(1)),
            other => other.concurrency_at(Duration::ZERO),
        }
    }

    /// Pick an action index by cumulative weight, deterministic given `pick`
    /// in `[0, total_weight)` — callers supply randomness so tests stay
    /// deterministic.
    pub fn weighted_index(weights: &[u32], pick: u32) -> usize {
        let mut acc = 0u32;
        for (i, w) in weights.iter().enumerate() {
            acc += w;
            if pick < acc {
                return i;
            }
        }
        weights.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_rate_never_changes() {
        let persona = Persona::ConstantRate { concurrency: 50 };
        assert_eq!(persona.concurrency_at(Duration::from_secs(0)), 50);
        assert_eq!(persona.concurrency_at(Duration::from_secs(100)), 50);
    }

    #[test]
    fn ramp_interpolates_linearly() {
        let persona = Persona::Ramp {
            start: 0,
            end: 100,
            duration: Duration::from_secs(10),
        };
        assert_eq!(persona.concurrency_at(Duration::from_secs(5)), 50);
        assert_eq!(persona.concurrency_at(Duration::from_secs(20)), 100);
    }

    #[test]
    fn sequence_returns_batch_by_iteration() {
        let persona = Persona::Sequence {
            batch_sizes: vec![10, 20, 30],
        };
        assert_eq!(persona.batch_size(0), 10);
        assert_eq!(persona.batch_size(2), 30);
        assert_eq!(persona.batch_size(99), 30);
    }

    #[test]
    fn weighted_index_respects_cumulative_weight() {
        let weights = vec![1, 2, 1];
        assert_eq!(Persona::weighted_index(&weights, 0), 0);
        assert_eq!(Persona::weighted_index(&weights, 1), 1);
        assert_eq!(Persona::weighted_index(&weights, 2), 1);
        assert_eq!(Persona::weighted_index(&weights, 3), 2);
    }
}
