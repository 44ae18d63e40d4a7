//! Host Scheduler Bridge
//!
//! The engine never re-implements learning steps, lapses or the host's own
//! review math. It asks the host what each answer would do natively and only
//! overrides review outcomes.
//!
//! `Sm2Host` is a reference host with SM-2 review transitions:
//!
//! | Answer | Ease change | Interval                                   |
//! |--------|-------------|--------------------------------------------|
//! | Again  | -200        | relearning, then 1 day                     |
//! | Hard   | -150        | interval * 1.2, at least +1 day            |
//! | Good   | 0           | (interval + late / 2) * ease               |
//! | Easy   | +150        | (interval + late) * ease * 1.3             |
//!
//! Ease never drops below 1300.

use crate::card::{CardSnapshot, CardUpdate, DEFAULT_EASE_FACTOR, Queue, Rating};

/// Ease floor applied by the host (permille)
pub const MINIMUM_EASE_FACTOR: u32 = 1300;

/// Native outcome of every answer button for one card
#[derive(Debug, Clone, PartialEq)]
pub struct NativeStates {
    pub again: CardUpdate,
    pub hard: CardUpdate,
    pub good: CardUpdate,
    pub easy: CardUpdate,
}

impl NativeStates {
    pub fn get(&self, rating: Rating) -> &CardUpdate {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }
}

/// What the engine needs from the host scheduler
pub trait HostScheduler: Send + Sync {
    /// Queue the host considers the card to be in
    fn classify(&self, card: &CardSnapshot) -> Queue {
        card.queue
    }

    /// Native outcome for each answer, as of day `today`.
    ///
    /// Custom data, FSRS memory state and desired retention are passed
    /// through unchanged.
    fn native_states(&self, card: &CardSnapshot, today: i32) -> NativeStates;
}

// ============================================================================
// SM-2 REFERENCE HOST
// ============================================================================

/// Deck-level parameters of the reference host
#[derive(Debug, Clone, PartialEq)]
pub struct Sm2Params {
    pub learning_steps: u32,
    pub relearning_steps: u32,
    pub graduating_interval: u32,
    pub easy_interval: u32,
    pub starting_ease: u32,
    pub hard_multiplier: f64,
    pub easy_bonus: f64,
    pub interval_modifier: f64,
    pub maximum_interval: u32,
    /// Fraction of the old interval kept after a lapse
    pub lapse_multiplier: f64,
    pub minimum_lapse_interval: u32,
}

impl Default for Sm2Params {
    fn default() -> Self {
        Self {
            learning_steps: 2,
            relearning_steps: 1,
            graduating_interval: 1,
            easy_interval: 4,
            starting_ease: DEFAULT_EASE_FACTOR,
            hard_multiplier: 1.2,
            easy_bonus: 1.3,
            interval_modifier: 1.0,
            maximum_interval: 36500,
            lapse_multiplier: 0.0,
            minimum_lapse_interval: 1,
        }
    }
}

/// Reference SM-2 host
#[derive(Debug, Clone, Default)]
pub struct Sm2Host {
    params: Sm2Params,
}

impl Sm2Host {
    pub fn new(params: Sm2Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Sm2Params {
        &self.params
    }

    /// Same card with new scheduling fields
    fn outcome(
        card: &CardSnapshot,
        queue: Queue,
        due: i32,
        interval: u32,
        ease_factor: u32,
        lapses: u32,
        remaining_steps: u32,
    ) -> CardUpdate {
        CardUpdate {
            queue,
            due,
            interval,
            ease_factor,
            lapses,
            remaining_steps,
            memory_state: card.memory_state,
            desired_retention: card.desired_retention,
            custom_data: card.custom_data.clone(),
        }
    }

    fn constrain(&self, interval: f64, minimum: u32) -> u32 {
        let maximum = self.params.maximum_interval.max(1);
        let minimum = minimum.clamp(1, maximum);
        ((interval * self.params.interval_modifier).round() as u32).clamp(minimum, maximum)
    }

    fn review_states(&self, card: &CardSnapshot, today: i32) -> NativeStates {
        let p = &self.params;
        let ease = card.ease();
        let (hard, good, easy) = if card.days_late() < 0 {
            self.early_intervals(card, ease)
        } else {
            self.nonearly_intervals(card, ease)
        };

        let lapse_interval = self.constrain(
            f64::from(card.interval) * p.lapse_multiplier,
            p.minimum_lapse_interval,
        );

        let review = |interval: u32, ease_factor: u32| {
            Self::outcome(
                card,
                Queue::Review,
                due_after(today, interval),
                interval,
                ease_factor,
                card.lapses,
                0,
            )
        };

        NativeStates {
            again: Self::outcome(
                card,
                Queue::Relearning,
                today,
                lapse_interval,
                lower_ease(card.ease_factor, 200),
                card.lapses.saturating_add(1),
                p.relearning_steps,
            ),
            hard: review(hard, lower_ease(card.ease_factor, 150)),
            good: review(good, card.ease_factor),
            easy: review(easy, card.ease_factor.saturating_add(150)),
        }
    }

    fn nonearly_intervals(&self, card: &CardSnapshot, ease: f64) -> (u32, u32, u32) {
        let p = &self.params;
        let current = f64::from(card.interval);
        let days_late = card.days_late().max(0) as f64;

        let hard_minimum = if p.hard_multiplier <= 1.0 {
            0
        } else {
            card.interval.saturating_add(1)
        };
        let hard = self.constrain(current * p.hard_multiplier, hard_minimum);
        let good_minimum = if p.hard_multiplier <= 1.0 {
            card.interval.saturating_add(1)
        } else {
            hard.saturating_add(1)
        };
        let good = self.constrain((current + days_late / 2.0) * ease, good_minimum);
        let easy = self.constrain(
            (current + days_late) * ease * p.easy_bonus,
            good.saturating_add(1),
        );
        (hard, good, easy)
    }

    fn early_intervals(&self, card: &CardSnapshot, ease: f64) -> (u32, u32, u32) {
        let p = &self.params;
        let scheduled = f64::from(card.interval);
        let elapsed = f64::from(card.elapsed_days);

        let hard = self.constrain(
            (elapsed * p.hard_multiplier).max(scheduled * p.hard_multiplier / 2.0),
            0,
        );
        let good = self.constrain((elapsed * ease).max(scheduled), 0);
        let reduced_bonus = p.easy_bonus - (p.easy_bonus - 1.0) / 2.0;
        let easy = self.constrain((elapsed * ease).max(scheduled) * reduced_bonus, 0);
        (hard, good, easy)
    }

    fn learning_states(&self, card: &CardSnapshot, today: i32, relearning: bool) -> NativeStates {
        let p = &self.params;
        let (queue, full_steps) = if relearning {
            (Queue::Relearning, p.relearning_steps)
        } else {
            (Queue::Learning, p.learning_steps)
        };
        let remaining = if card.queue == Queue::New || card.remaining_steps == 0 {
            full_steps
        } else {
            card.remaining_steps
        };
        let ease_factor = if card.ease_factor == 0 {
            p.starting_ease
        } else {
            card.ease_factor
        };

        let step = |remaining_steps: u32| {
            Self::outcome(
                card,
                queue,
                today,
                card.interval,
                ease_factor,
                card.lapses,
                remaining_steps,
            )
        };
        let graduate = |interval: u32| {
            Self::outcome(
                card,
                Queue::Review,
                due_after(today, interval),
                interval,
                ease_factor,
                card.lapses,
                0,
            )
        };

        let (good_interval, easy_interval) = if relearning {
            let interval = card.interval.max(1);
            (interval, interval.saturating_add(1))
        } else {
            (p.graduating_interval, p.easy_interval)
        };

        NativeStates {
            again: step(full_steps),
            hard: step(remaining),
            good: if remaining <= 1 {
                graduate(good_interval)
            } else {
                step(remaining - 1)
            },
            easy: graduate(easy_interval),
        }
    }
}

impl HostScheduler for Sm2Host {
    fn native_states(&self, card: &CardSnapshot, today: i32) -> NativeStates {
        match self.classify(card) {
            Queue::Review => self.review_states(card, today),
            Queue::Relearning => self.learning_states(card, today, true),
            Queue::New | Queue::Learning => self.learning_states(card, today, false),
        }
    }
}

fn lower_ease(ease_factor: u32, amount: u32) -> u32 {
    ease_factor.saturating_sub(amount).max(MINIMUM_EASE_FACTOR)
}

/// Day number `interval` days after `today`
pub fn due_after(today: i32, interval: u32) -> i32 {
    today.saturating_add(i32::try_from(interval).unwrap_or(i32::MAX))
}
