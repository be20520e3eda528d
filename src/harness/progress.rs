use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

const NO_TIER: usize = usize::MAX;

/// Latest bound and incumbent objective reported by the worker. Written by
/// the harness relay thread only, read by the caller; values are
/// last-write-wins.
#[derive(Debug)]
pub struct ProgressCell {
    bound: AtomicU64,
    objective: AtomicU64,
    tier: AtomicUsize,
}

impl Default for ProgressCell {
    fn default() -> ProgressCell {
        ProgressCell {
            bound: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
            objective: AtomicU64::new(f64::INFINITY.to_bits()),
            tier: AtomicUsize::new(NO_TIER),
        }
    }
}

impl ProgressCell {
    pub fn bound(&self) -> f64 {
        f64::from_bits(self.bound.load(Ordering::Acquire))
    }

    pub fn objective(&self) -> f64 {
        f64::from_bits(self.objective.load(Ordering::Acquire))
    }

    pub fn tier(&self) -> Option<usize> {
        match self.tier.load(Ordering::Acquire) {
            NO_TIER => None,
            tier => Some(tier),
        }
    }

    pub(super) fn set_bound(&self, value: f64) {
        self.bound.store(value.to_bits(), Ordering::Release);
    }

    pub(super) fn set_objective(&self, value: f64) {
        self.objective.store(value.to_bits(), Ordering::Release);
    }

    /// Entering a new tier resets both values.
    pub(super) fn set_tier(&self, tier: usize) {
        self.tier.store(tier, Ordering::Release);
        self.set_bound(f64::NEG_INFINITY);
        self.set_objective(f64::INFINITY);
    }
}

/// Fraction of the search done in the current tier, from 0 to 1.
pub fn progress(bound: f64, objective: f64) -> f64 {
    if bound.is_infinite() || objective.is_infinite() || bound.is_nan() || objective.is_nan() {
        return 0.0;
    }
    if bound == objective {
        return 1.0;
    }
    if objective == 0.0 {
        return 0.0;
    }
    (bound / objective).clamp(0.0, 1.0)
}
