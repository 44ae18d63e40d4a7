//! Ease reward for consecutive successful reviews

use serde::{Deserialize, Serialize};

/// Lowest ease the host will ever store
pub const ABSOLUTE_MINIMUM_EASE: f64 = 1.3;

/// Highest ease the host will ever store
pub const ABSOLUTE_MAXIMUM_EASE: f64 = 9.99;

/// Ease factors are stored with three decimal places (permille)
fn round_to_places(value: f64, decimal_places: u32) -> f64 {
    let factor = 10_f64.powi(decimal_places as i32);
    (value * factor).round() / factor
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEaseReward {
    minimum_consecutive_successful_reviews_required_for_reward: u32,
    base_ease_reward: f64,
    step_ease_reward: f64,
    minimum_ease: f64,
    maximum_ease: f64,
}

impl From<RawEaseReward> for EaseReward {
    fn from(raw: RawEaseReward) -> Self {
        EaseReward::new(
            raw.minimum_consecutive_successful_reviews_required_for_reward,
            raw.base_ease_reward,
            raw.step_ease_reward,
            raw.minimum_ease,
            raw.maximum_ease,
        )
    }
}

/// Bonus added to the ease factor once a card has a long enough success streak
///
/// Values are normalized on construction, so a deserialized reward can never
/// push an ease outside what the host accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawEaseReward")]
pub struct EaseReward {
    minimum_consecutive_successful_reviews_required_for_reward: u32,
    base_ease_reward: f64,
    step_ease_reward: f64,
    minimum_ease: f64,
    maximum_ease: f64,
}

impl Default for EaseReward {
    /// A reward that never fires
    fn default() -> Self {
        EaseReward::new(0, 0.0, 0.0, ABSOLUTE_MINIMUM_EASE, ABSOLUTE_MAXIMUM_EASE)
    }
}

impl EaseReward {
    pub fn new(
        minimum_consecutive_successful_reviews_required_for_reward: u32,
        base_ease_reward: f64,
        step_ease_reward: f64,
        minimum_ease: f64,
        maximum_ease: f64,
    ) -> Self {
        Self {
            minimum_consecutive_successful_reviews_required_for_reward,
            base_ease_reward: base_ease_reward.max(0.0),
            step_ease_reward: step_ease_reward.max(0.0),
            minimum_ease: minimum_ease.max(ABSOLUTE_MINIMUM_EASE),
            maximum_ease: maximum_ease.clamp(0.0, ABSOLUTE_MAXIMUM_EASE),
        }
    }

    /// Streak length at which the reward starts; 0 disables it
    pub fn threshold(&self) -> u32 {
        self.minimum_consecutive_successful_reviews_required_for_reward
    }

    pub fn base_ease_reward(&self) -> f64 {
        self.base_ease_reward
    }

    pub fn step_ease_reward(&self) -> f64 {
        self.step_ease_reward
    }

    pub fn minimum_ease(&self) -> f64 {
        self.minimum_ease
    }

    pub fn maximum_ease(&self) -> f64 {
        self.maximum_ease
    }

    /// Ease after `streak` consecutive successes, starting from `ease_factor`.
    ///
    /// Returns the input unchanged when the reward is disabled, the streak is
    /// below the threshold, or the ease is already outside the reward bounds.
    pub fn calculate_new_ease_factor(&self, streak: u32, ease_factor: f64) -> f64 {
        let threshold = self.threshold();
        if threshold == 0
            || streak < threshold
            || ease_factor < self.minimum_ease
            || ease_factor > self.maximum_ease
        {
            return ease_factor;
        }

        let reward =
            self.base_ease_reward + f64::from(streak - threshold) * self.step_ease_reward;
        round_to_places(
            self.minimum_ease
                .max(ease_factor + reward)
                .min(self.maximum_ease),
            3,
        )
    }

    /// Permille variant of [`calculate_new_ease_factor`](Self::calculate_new_ease_factor)
    pub fn apply(&self, streak: u32, ease_factor: u32) -> u32 {
        let ease = self.calculate_new_ease_factor(streak, f64::from(ease_factor) / 1000.0);
        (ease * 1000.0).round() as u32
    }
}
