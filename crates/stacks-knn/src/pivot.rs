//! Vantage-point selection for the metric tree.
//!
//! Tree shape depends on the pivots chosen, query results do not. Tests
//! inject [`FirstPivot`] to get a reproducible shape.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses which of the remaining items becomes a node's vantage point.
pub trait PivotSelector: Send + Sync {
    /// Index in `0..remaining` of the item to use. `remaining` is never 0.
    fn select(&mut self, remaining: usize) -> usize;

    /// Called once at the start of every build.
    fn reset(&mut self) {}
}

/// Uniformly random pivots.
///
/// A seeded selector restarts its sequence on every build, so identical
/// inputs produce identical trees.
pub struct RandomPivot {
    rng: StdRng,
    seed: Option<u64>,
}

impl RandomPivot {
    /// Non-reproducible pivots seeded from the OS.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            seed: None,
        }
    }

    /// Reproducible pivots.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for RandomPivot {
    fn default() -> Self {
        Self::new()
    }
}

impl PivotSelector for RandomPivot {
    fn select(&mut self, remaining: usize) -> usize {
        self.rng.random_range(0..remaining)
    }

    fn reset(&mut self) {
        if let Some(seed) = self.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
    }
}

/// Always picks the first remaining item.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstPivot;

impl PivotSelector for FirstPivot {
    fn select(&mut self, _remaining: usize) -> usize {
        0
    }
}
