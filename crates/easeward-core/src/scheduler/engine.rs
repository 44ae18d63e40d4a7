//! Answer Engine
//!
//! Turns (card, answer, deck options) into the card's next state. Only review
//! cards are handled; everything else keeps the host's native outcome.
//!
//! Per answer:
//! - Again: host outcome (relearning), streak removed
//! - Hard: streak removed, host ease, engine interval
//! - Good / Easy: streak + 1, engine interval, ease reward on top of the
//!   host's ease for that answer once the streak reaches the threshold
//!
//! Where the engine has no interval for a grade (zero multiplier or early
//! review) the host interval stands, while the streak and ease reward still
//! apply.

use std::sync::Arc;

use crate::card::{CardSnapshot, CardUpdate, Queue, Rating};
use crate::config::{MultiplierError, ReviewConfig, Resolution};
use crate::custom_data::{CustomDataError, merge_streak, read_streak};

use super::fuzz::{FuzzGenerator, FuzzPolicy, SeededFuzz, fuzz_seed};
use super::host::{HostScheduler, NativeStates, due_after};
use super::intervals::{GradeMultipliers, IntervalCalculator, PassingIntervals};

// ============================================================================
// ERRORS AND OUTCOMES
// ============================================================================

/// Why the engine could not compute an update
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Card is in the {0} queue, only review cards are scheduled")]
    NotReviewCard(Queue),
    #[error("Invalid multiplier: {0}")]
    Multiplier(#[from] MultiplierError),
    #[error("Custom data: {0}")]
    CustomData(#[from] CustomDataError),
}

/// Why the host outcome was used unmodified
#[derive(Debug, Clone, PartialEq)]
pub enum DeferReason {
    /// New, learning and relearning cards belong to the host
    NotReviewCard(Queue),
    /// Neither the deck nor the global group has options
    NoConfig,
    /// The deck resolved to a group that failed to parse
    InvalidConfig { group: String, message: String },
    /// A multiplier returned a negative or non-finite value
    InvalidMultiplier(String),
    /// Existing custom data could not be read or the result would not fit
    MalformedCustomData(String),
}

impl std::fmt::Display for DeferReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferReason::NotReviewCard(queue) => write!(f, "card is in the {} queue", queue),
            DeferReason::NoConfig => write!(f, "no deck options"),
            DeferReason::InvalidConfig { group, message } => {
                write!(f, "deck options group '{}' is invalid: {}", group, message)
            }
            DeferReason::InvalidMultiplier(message) => write!(f, "{}", message),
            DeferReason::MalformedCustomData(message) => {
                write!(f, "custom data: {}", message)
            }
        }
    }
}

impl From<EngineError> for DeferReason {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NotReviewCard(queue) => DeferReason::NotReviewCard(queue),
            EngineError::Multiplier(e) => DeferReason::InvalidMultiplier(e.to_string()),
            EngineError::CustomData(e) => DeferReason::MalformedCustomData(e.to_string()),
        }
    }
}

/// Result of an answer: the engine's update or the host's untouched outcome
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    Applied(CardUpdate),
    Deferred {
        update: CardUpdate,
        reason: DeferReason,
    },
}

impl AnswerOutcome {
    /// The update to write back, whichever side produced it
    pub fn update(&self) -> &CardUpdate {
        match self {
            AnswerOutcome::Applied(update) | AnswerOutcome::Deferred { update, .. } => update,
        }
    }

    pub fn into_update(self) -> CardUpdate {
        match self {
            AnswerOutcome::Applied(update) | AnswerOutcome::Deferred { update, .. } => update,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, AnswerOutcome::Applied(_))
    }

    pub fn defer_reason(&self) -> Option<&DeferReason> {
        match self {
            AnswerOutcome::Applied(_) => None,
            AnswerOutcome::Deferred { reason, .. } => Some(reason),
        }
    }
}

/// Candidate update for every answer button
#[derive(Debug, Clone, PartialEq)]
pub struct NextStates {
    pub again: CardUpdate,
    pub hard: CardUpdate,
    pub good: CardUpdate,
    pub easy: CardUpdate,
}

impl NextStates {
    pub fn get(&self, rating: Rating) -> &CardUpdate {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }

    pub fn into_update(self, rating: Rating) -> CardUpdate {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Stateless review-card scheduler
#[derive(Clone)]
pub struct AnswerEngine {
    fuzz_policy: Arc<dyn FuzzPolicy>,
}

impl Default for AnswerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnswerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerEngine").finish_non_exhaustive()
    }
}

impl AnswerEngine {
    pub fn new() -> Self {
        Self {
            fuzz_policy: Arc::new(SeededFuzz),
        }
    }

    /// Engine drawing fuzz factors from `policy`
    pub fn with_fuzz_policy(policy: Arc<dyn FuzzPolicy>) -> Self {
        Self {
            fuzz_policy: policy,
        }
    }

    /// Candidate updates for all four answers of a review card
    pub fn next_states(
        &self,
        card: &CardSnapshot,
        config: &ReviewConfig,
        native: &NativeStates,
        today: i32,
    ) -> Result<NextStates, EngineError> {
        Ok(NextStates {
            again: self.compute_update(card, Rating::Again, config, native, today)?,
            hard: self.compute_update(card, Rating::Hard, config, native, today)?,
            good: self.compute_update(card, Rating::Good, config, native, today)?,
            easy: self.compute_update(card, Rating::Easy, config, native, today)?,
        })
    }

    /// Update for one answer of a review card.
    ///
    /// Only the inputs the chosen answer depends on are read, so a streak
    /// that cannot grow or a bad Easy multiplier never blocks Again or Hard.
    pub fn compute_update(
        &self,
        card: &CardSnapshot,
        rating: Rating,
        config: &ReviewConfig,
        native: &NativeStates,
        today: i32,
    ) -> Result<CardUpdate, EngineError> {
        if !card.queue.is_review() {
            return Err(EngineError::NotReviewCard(card.queue));
        }

        let update = match rating {
            Rating::Again => CardUpdate {
                custom_data: merge_streak(&card.custom_data, None)?,
                ..native.again.clone()
            },
            Rating::Hard => {
                let custom_data = merge_streak(&card.custom_data, None)?;
                let intervals = self.passing_intervals(card, rating, config)?;
                CardUpdate {
                    custom_data,
                    ..override_interval(&native.hard, intervals.hard, today)
                }
            }
            Rating::Good | Rating::Easy => {
                self.success_update(card, rating, config, native.get(rating), today)?
            }
        };

        tracing::debug!(
            card_id = card.id,
            rating = %rating,
            interval = update.interval,
            ease_factor = update.ease_factor,
            "Computed review update"
        );

        Ok(update)
    }

    /// Answer a card, falling back to the host outcome whenever the engine
    /// cannot or must not handle it
    pub fn answer(
        &self,
        card: &CardSnapshot,
        rating: Rating,
        resolution: Resolution<'_>,
        native: &NativeStates,
        today: i32,
    ) -> AnswerOutcome {
        let deferred = |reason: DeferReason| AnswerOutcome::Deferred {
            update: native.get(rating).clone(),
            reason,
        };

        if !card.queue.is_review() {
            return deferred(DeferReason::NotReviewCard(card.queue));
        }

        let config = match resolution {
            Resolution::Deck(config) | Resolution::Global(config) => config,
            Resolution::Invalid { group, message } => {
                tracing::warn!(
                    card_id = card.id,
                    "Deck options group '{}' is invalid, using host scheduling: {}",
                    group,
                    message
                );
                return deferred(DeferReason::InvalidConfig {
                    group: group.to_string(),
                    message: message.to_string(),
                });
            }
            Resolution::Missing => {
                tracing::debug!(card_id = card.id, "No deck options, using host scheduling");
                return deferred(DeferReason::NoConfig);
            }
        };

        match self.compute_update(card, rating, config, native, today) {
            Ok(update) => AnswerOutcome::Applied(update),
            Err(e) => {
                tracing::warn!(card_id = card.id, "Using host scheduling: {}", e);
                deferred(DeferReason::from(e))
            }
        }
    }

    /// Ask the host for native outcomes, then answer
    pub fn answer_with_host(
        &self,
        host: &dyn HostScheduler,
        card: &CardSnapshot,
        rating: Rating,
        resolution: Resolution<'_>,
        today: i32,
    ) -> AnswerOutcome {
        let mut card = card.clone();
        card.queue = host.classify(&card);
        let native = host.native_states(&card, today);
        self.answer(&card, rating, resolution, &native, today)
    }

    /// Good and Easy: streak + 1, engine interval, ease reward. They only take
    /// over when the host also keeps the card in review.
    fn success_update(
        &self,
        card: &CardSnapshot,
        rating: Rating,
        config: &ReviewConfig,
        outcome: &CardUpdate,
        today: i32,
    ) -> Result<CardUpdate, EngineError> {
        if outcome.queue != Queue::Review {
            return Ok(outcome.clone());
        }

        let streak = read_streak(&card.custom_data)?.saturating_add(1);
        let custom_data = merge_streak(&card.custom_data, Some(streak))?;
        let intervals = self.passing_intervals(card, rating, config)?;
        let interval = if rating == Rating::Easy {
            intervals.easy
        } else {
            intervals.good
        };

        let mut update = override_interval(outcome, interval, today);
        update.ease_factor = config.ease_reward.apply(streak, outcome.ease_factor);
        update.custom_data = custom_data;
        Ok(update)
    }

    fn passing_intervals(
        &self,
        card: &CardSnapshot,
        rating: Rating,
        config: &ReviewConfig,
    ) -> Result<PassingIntervals, EngineError> {
        let multipliers =
            GradeMultipliers::evaluate_for(&config.scheduler, rating, card.ease(), card.interval)?;
        let fuzz = FuzzGenerator::with_policy(
            config.scheduler.enable_fuzz,
            Arc::clone(&self.fuzz_policy),
        );
        let fuzz_factor = fuzz.factor(fuzz_seed(card.id, card.reps));

        Ok(IntervalCalculator::new(
            &config.scheduler,
            multipliers,
            fuzz_factor,
            card.interval,
            card.elapsed_days,
        )
        .next_intervals())
    }
}

/// Native outcome with the engine's interval, when it has one
fn override_interval(native: &CardUpdate, interval: Option<u32>, today: i32) -> CardUpdate {
    match interval {
        Some(interval) if native.queue == Queue::Review => CardUpdate {
            interval,
            due: due_after(today, interval),
            ..native.clone()
        },
        _ => native.clone(),
    }
}
