//! Scheduler Module
//!
//! Review-card scheduling on top of a host scheduler:
//! - Interval fuzz seeded per card
//! - Passing intervals from per-grade multipliers
//! - The host bridge and a reference SM-2 host
//! - The answer engine tying them together

mod engine;
mod fuzz;
mod host;
mod intervals;

pub use engine::{AnswerEngine, AnswerOutcome, DeferReason, EngineError, NextStates};
pub use fuzz::{
    FuzzGenerator, FuzzPolicy, SeededFuzz, constrained_fuzz_bounds, fuzz_bounds, fuzz_delta,
    fuzz_seed, with_review_fuzz,
};
pub use host::{
    HostScheduler, MINIMUM_EASE_FACTOR, NativeStates, Sm2Host, Sm2Params, due_after,
};
pub use intervals::{GradeMultipliers, IntervalCalculator, PassingIntervals};
