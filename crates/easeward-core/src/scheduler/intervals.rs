//! Passing intervals for review cards
//!
//! Hard, Good and Easy are computed together because each grade's minimum
//! depends on the one before it:
//! - Hard: interval * hard multiplier, at least interval + 1 when the
//!   multiplier is above 1
//! - Good: (interval + days late / 2) * good multiplier, at least one day
//!   more than Hard (or than the current interval when Hard does not grow)
//! - Easy: (interval + days late) * easy multiplier, at least Good + 1
//!
//! The interval modifier, fuzz and maximum interval apply to all three.
//! A grade whose multiplier is exactly zero, and every grade of an early
//! review, yields `None` so the host's own interval is used.

use crate::card::Rating;
use crate::config::{MultiplierError, SchedulerConfig};

use super::fuzz::with_review_fuzz;

/// Multipliers for the three passing grades, evaluated for one card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeMultipliers {
    pub hard: f64,
    pub good: f64,
    pub easy: f64,
}

impl GradeMultipliers {
    pub fn new(hard: f64, good: f64, easy: f64) -> Self {
        Self { hard, good, easy }
    }

    /// Evaluate the configured multipliers for a card's ease (as a factor) and interval
    pub fn evaluate(
        config: &SchedulerConfig,
        ease: f64,
        interval: u32,
    ) -> Result<Self, MultiplierError> {
        Ok(Self {
            hard: config.calculate_hard_multiplier.evaluate(ease, interval)?,
            good: config.calculate_good_multiplier.evaluate(ease, interval)?,
            easy: config.calculate_easy_multiplier.evaluate(ease, interval)?,
        })
    }

    /// Evaluate only what `rating`'s interval depends on.
    ///
    /// Each grade's minimum builds on the grade below it, so Good also needs
    /// Hard and Easy needs all three. Grades above `rating` are left at zero.
    pub fn evaluate_for(
        config: &SchedulerConfig,
        rating: Rating,
        ease: f64,
        interval: u32,
    ) -> Result<Self, MultiplierError> {
        let mut multipliers = Self::new(0.0, 0.0, 0.0);
        if rating == Rating::Again {
            return Ok(multipliers);
        }
        multipliers.hard = config.calculate_hard_multiplier.evaluate(ease, interval)?;
        if matches!(rating, Rating::Good | Rating::Easy) {
            multipliers.good = config.calculate_good_multiplier.evaluate(ease, interval)?;
        }
        if rating == Rating::Easy {
            multipliers.easy = config.calculate_easy_multiplier.evaluate(ease, interval)?;
        }
        Ok(multipliers)
    }
}

/// New intervals per passing grade; `None` defers to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassingIntervals {
    pub hard: Option<u32>,
    pub good: Option<u32>,
    pub easy: Option<u32>,
}

/// Computes passing intervals for one review
#[derive(Debug, Clone)]
pub struct IntervalCalculator {
    fuzz_factor: Option<f64>,
    maximum_interval: u32,
    interval_modifier: f64,
    multipliers: GradeMultipliers,
    scheduled_days: u32,
    elapsed_days: u32,
}

impl IntervalCalculator {
    pub fn new(
        config: &SchedulerConfig,
        multipliers: GradeMultipliers,
        fuzz_factor: Option<f64>,
        scheduled_days: u32,
        elapsed_days: u32,
    ) -> Self {
        Self {
            fuzz_factor,
            maximum_interval: config.maximum_interval,
            interval_modifier: config.interval_modifier,
            multipliers,
            scheduled_days,
            elapsed_days,
        }
    }

    pub fn next_intervals(&self) -> PassingIntervals {
        let Some((hard, good, easy)) = self.passing_intervals() else {
            return PassingIntervals::default();
        };

        PassingIntervals {
            hard: (self.multipliers.hard != 0.0).then_some(hard),
            good: (self.multipliers.good != 0.0).then_some(good),
            easy: (self.multipliers.easy != 0.0).then_some(easy),
        }
    }

    fn days_late(&self) -> i64 {
        i64::from(self.elapsed_days) - i64::from(self.scheduled_days)
    }

    fn passing_intervals(&self) -> Option<(u32, u32, u32)> {
        if self.days_late() < 0 {
            None
        } else {
            Some(self.passing_nonearly_intervals())
        }
    }

    fn passing_nonearly_intervals(&self) -> (u32, u32, u32) {
        let current_interval = f64::from(self.scheduled_days);
        let days_late = self.days_late().max(0) as f64;
        let hard_factor = self.multipliers.hard;

        let hard_minimum = if hard_factor <= 1.0 {
            0
        } else {
            self.scheduled_days.saturating_add(1)
        };
        let hard_interval = self.constrain(current_interval * hard_factor, hard_minimum);

        let good_minimum = if hard_factor <= 1.0 {
            self.scheduled_days.saturating_add(1)
        } else {
            hard_interval.saturating_add(1)
        };
        let good_interval = self.constrain(
            (current_interval + days_late / 2.0) * self.multipliers.good,
            good_minimum,
        );

        let easy_interval = self.constrain(
            (current_interval + days_late) * self.multipliers.easy,
            good_interval.saturating_add(1),
        );

        (hard_interval, good_interval, easy_interval)
    }

    /// Apply the interval modifier, then fuzz or round, within `[minimum, maximum]`
    fn constrain(&self, interval: f64, minimum: u32) -> u32 {
        let interval = interval * self.interval_modifier;
        let (minimum, maximum) = self.min_and_max(minimum);
        with_review_fuzz(self.fuzz_factor, interval, minimum, maximum)
    }

    /// `maximum` is at least 1; `minimum` is clamped to `[1, maximum]`
    fn min_and_max(&self, minimum: u32) -> (u32, u32) {
        let maximum = self.maximum_interval.max(1);
        let minimum = minimum.clamp(1, maximum);
        (minimum, maximum)
    }
}
