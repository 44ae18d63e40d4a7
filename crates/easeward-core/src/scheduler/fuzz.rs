//! Interval fuzz
//!
//! Spreads cards that would otherwise come due on the same day. The band
//! grows with the interval:
//! - under 2.5 days: no fuzz
//! - 2.5 to 7 days: 15% of those days
//! - 7 to 20 days: 10% of those days
//! - beyond 20 days: 5% of those days
//!
//! plus one day. The position inside the band comes from a seeded RNG, so the
//! same card answered from the same state always lands on the same day.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// A range of days fuzzed by `factor` per day
struct FuzzRange {
    start: f64,
    end: f64,
    factor: f64,
}

static FUZZ_RANGES: [FuzzRange; 3] = [
    FuzzRange {
        start: 2.5,
        end: 7.0,
        factor: 0.15,
    },
    FuzzRange {
        start: 7.0,
        end: 20.0,
        factor: 0.1,
    },
    FuzzRange {
        start: 20.0,
        end: f64::MAX,
        factor: 0.05,
    },
];

/// Days of fuzz applied in each direction
pub fn fuzz_delta(interval: f64) -> f64 {
    if interval < 2.5 {
        0.0
    } else {
        FUZZ_RANGES.iter().fold(1.0, |delta, range| {
            delta + range.factor * (interval.min(range.end) - range.start).max(0.0)
        })
    }
}

/// Unconstrained fuzz band around `interval`
pub fn fuzz_bounds(interval: f64) -> (u32, u32) {
    let delta = fuzz_delta(interval);
    (
        (interval - delta).round() as u32,
        (interval + delta).round() as u32,
    )
}

/// Fuzz band clamped to `[minimum, maximum]`.
///
/// When clamping collapses the band to a single day above 2 and below the
/// maximum, the upper bound is widened by one so fuzz still has an effect.
pub fn constrained_fuzz_bounds(interval: f64, minimum: u32, maximum: u32) -> (u32, u32) {
    let minimum = minimum.min(maximum);
    let (mut lower, mut upper) = fuzz_bounds(interval);

    lower = lower.clamp(minimum, maximum);
    upper = upper.clamp(minimum, maximum);

    if upper == lower && upper > 2 && upper < maximum {
        upper = lower + 1;
    }

    (lower, upper)
}

/// Apply a fuzz factor in `[0, 1)` to `interval`; `None` only rounds and clamps
pub fn with_review_fuzz(fuzz_factor: Option<f64>, interval: f64, minimum: u32, maximum: u32) -> u32 {
    match fuzz_factor {
        Some(fuzz_factor) => {
            let (lower, upper) = constrained_fuzz_bounds(interval, minimum, maximum);
            let span = f64::from(upper) - f64::from(lower) + 1.0;
            (f64::from(lower) + fuzz_factor * span).floor() as u32
        }
        None => (interval.round() as u32).clamp(minimum, maximum),
    }
}

/// Seed for a card's fuzz factor: the card id rotated by a byte plus its review count
pub fn fuzz_seed(card_id: i64, reps: u32) -> u64 {
    (card_id as u64).rotate_left(8).wrapping_add(u64::from(reps))
}

// ============================================================================
// POLICY
// ============================================================================

/// Source of fuzz factors
pub trait FuzzPolicy: Send + Sync {
    /// A factor in `[0, 1)`; equal seeds must give equal factors
    fn factor(&self, seed: u64) -> f64;
}

/// `StdRng` seeded per card
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededFuzz;

impl FuzzPolicy for SeededFuzz {
    fn factor(&self, seed: u64) -> f64 {
        StdRng::seed_from_u64(seed).random_range(0.0..1.0)
    }
}

/// Deterministic interval fuzzing
#[derive(Clone)]
pub struct FuzzGenerator {
    enabled: bool,
    policy: Arc<dyn FuzzPolicy>,
}

impl std::fmt::Debug for FuzzGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzGenerator")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Default for FuzzGenerator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FuzzGenerator {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            policy: Arc::new(SeededFuzz),
        }
    }

    /// Use a different distribution
    pub fn with_policy(enabled: bool, policy: Arc<dyn FuzzPolicy>) -> Self {
        Self { enabled, policy }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fuzz factor for a seed, or `None` when fuzz is off
    pub fn factor(&self, seed: u64) -> Option<f64> {
        self.enabled.then(|| self.policy.factor(seed))
    }

    /// Fuzzed interval, identity when disabled
    pub fn fuzz(&self, interval: u32, seed: u64) -> u32 {
        self.fuzz_within(f64::from(interval), seed, 1, u32::MAX)
    }

    /// Fuzzed interval kept inside `[minimum, maximum]`
    pub fn fuzz_within(&self, interval: f64, seed: u64, minimum: u32, maximum: u32) -> u32 {
        with_review_fuzz(self.factor(seed), interval, minimum, maximum)
    }
}
