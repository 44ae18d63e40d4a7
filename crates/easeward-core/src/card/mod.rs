//! Card Module
//!
//! The card-level types shared by the engine, the host bridge and storage:
//! - Queue classification and answer ratings
//! - `CardSnapshot`, the read-only view handed to the engine per grading event
//! - `CardUpdate`, the only object written back after an answer

use serde::{Deserialize, Serialize};

/// Default ease factor for new review cards (permille)
pub const DEFAULT_EASE_FACTOR: u32 = 2500;

// ============================================================================
// QUEUE
// ============================================================================

/// Queue a card currently sits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Queue {
    /// Never studied
    #[default]
    New,
    /// In its initial learning steps
    Learning,
    /// Graduated, scheduled in whole days
    Review,
    /// Lapsed, going through relearning steps
    Relearning,
}

impl Queue {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Queue::New => "new",
            Queue::Learning => "learning",
            Queue::Review => "review",
            Queue::Relearning => "relearning",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "new" => Some(Queue::New),
            "learning" | "learn" => Some(Queue::Learning),
            "review" => Some(Queue::Review),
            "relearning" | "relearn" => Some(Queue::Relearning),
            _ => None,
        }
    }

    /// Whether the custom engine is allowed to touch a card in this queue
    #[inline]
    pub fn is_review(&self) -> bool {
        matches!(self, Queue::Review)
    }
}

impl std::fmt::Display for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Queue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Queue::parse_name(s).ok_or_else(|| format!("Unknown queue: {}", s))
    }
}

// ============================================================================
// RATING
// ============================================================================

/// Answer button pressed by the learner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// All ratings in button order
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Create from the 1-4 button number used in review logs
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Rating::Again),
            2 => Some(Rating::Hard),
            3 => Some(Rating::Good),
            4 => Some(Rating::Easy),
            _ => None,
        }
    }

    /// Button number (1-4)
    pub fn as_i32(&self) -> i32 {
        match self {
            Rating::Again => 1,
            Rating::Hard => 2,
            Rating::Good => 3,
            Rating::Easy => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    /// Parse from a name or a button number
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "again" | "1" => Some(Rating::Again),
            "hard" | "2" => Some(Rating::Hard),
            "good" | "3" => Some(Rating::Good),
            "easy" | "4" => Some(Rating::Easy),
            _ => None,
        }
    }

    /// Good and Easy extend the success streak
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Rating::Good | Rating::Easy)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::parse_name(s)
            .ok_or_else(|| format!("Unknown rating: {} (expected again, hard, good or easy)", s))
    }
}

// ============================================================================
// CARD STATE
// ============================================================================

/// FSRS memory state as reported by the host
///
/// Carried through every transition untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsrsMemoryState {
    pub stability: f32,
    pub difficulty: f32,
}

/// Read-only view of a card at answer time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSnapshot {
    /// Stable, monotonically assigned id (also the fuzz seed base)
    pub id: i64,
    pub queue: Queue,
    /// Day number the card is due on
    pub due: i32,
    /// Current interval in days
    pub interval: u32,
    /// Ease factor in permille (2500 = 2.5x)
    pub ease_factor: u32,
    pub reps: u32,
    pub lapses: u32,
    /// Learning or relearning steps left
    pub remaining_steps: u32,
    /// Days since the previous review
    pub elapsed_days: u32,
    pub memory_state: Option<FsrsMemoryState>,
    pub desired_retention: Option<f32>,
    /// Raw custom data JSON, empty when the card has none
    pub custom_data: String,
}

impl CardSnapshot {
    /// A review card answered exactly on its due day
    pub fn review(id: i64, interval: u32, ease_factor: u32) -> Self {
        Self {
            id,
            queue: Queue::Review,
            due: 0,
            interval,
            ease_factor,
            reps: 0,
            lapses: 0,
            remaining_steps: 0,
            elapsed_days: interval,
            memory_state: None,
            desired_retention: None,
            custom_data: String::new(),
        }
    }

    /// Same snapshot with a different custom data document
    pub fn with_custom_data(mut self, custom_data: impl Into<String>) -> Self {
        self.custom_data = custom_data.into();
        self
    }

    /// Same snapshot reviewed after `elapsed_days`
    pub fn with_elapsed_days(mut self, elapsed_days: u32) -> Self {
        self.elapsed_days = elapsed_days;
        self
    }

    /// Ease as a multiplier (2500 -> 2.5)
    #[inline]
    pub fn ease(&self) -> f64 {
        f64::from(self.ease_factor) / 1000.0
    }

    /// Days past the scheduled interval; negative for early reviews
    #[inline]
    pub fn days_late(&self) -> i64 {
        i64::from(self.elapsed_days) - i64::from(self.interval)
    }
}

/// Result of answering a card
///
/// This is the only object written back to the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardUpdate {
    pub queue: Queue,
    /// Day number the card is next due on
    pub due: i32,
    pub interval: u32,
    /// Ease factor in permille
    pub ease_factor: u32,
    pub lapses: u32,
    pub remaining_steps: u32,
    pub memory_state: Option<FsrsMemoryState>,
    pub desired_retention: Option<f32>,
    /// Serialized custom data, empty when no keys remain
    pub custom_data: String,
}
