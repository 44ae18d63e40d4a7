//! # Easeward Core
//!
//! Streak-aware answer scheduling for SM-2 style spaced repetition. The
//! engine sits on top of a host scheduler and only takes over review cards:
//!
//! - **Ease reward**: consecutive Good/Easy answers earn a growing ease bonus
//!   once a per-deck threshold is reached
//! - **Interval multipliers**: per-answer multiplier functions of the card's
//!   ease and interval replace the host's fixed formulas
//! - **Fuzz**: deterministic per-card interval spread
//! - **Custom data**: the streak lives under a single key of the card's
//!   add-on JSON document, next to whatever other tools store there
//! - **Backfill**: rebuild streaks from the review log
//!
//! Learning and relearning cards, lapses and FSRS memory state stay with the
//! host. Whenever the engine cannot schedule an answer (no deck options,
//! bad options, bad custom data) the host's own outcome is used.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use easeward_core::{ConfigTable, NewCard, Queue, Rating, Storage};
//!
//! let storage = Storage::new(None)?;
//! let table = ConfigTable::from_json_str(r#"{
//!     "Global Settings": {
//!         "easeReward": {
//!             "minimumConsecutiveSuccessfulReviewsRequiredForReward": 3,
//!             "baseEaseReward": 0.05,
//!             "stepEaseReward": 0.05,
//!             "minimumEase": 1.3,
//!             "maximumEase": 2.5
//!         },
//!         "scheduler": {
//!             "enableFuzz": true,
//!             "maximumInterval": 36500,
//!             "intervalModifier": 1.0,
//!             "calculateHardMultiplier": 1.2,
//!             "calculateGoodMultiplier": { "ease": { "scale": 1.0 } },
//!             "calculateEasyMultiplier": { "ease": { "scale": 1.3 } }
//!         }
//!     }
//! }"#)?;
//!
//! let card = storage.add_card(NewCard {
//!     deck: "Japanese".to_string(),
//!     queue: Queue::Review,
//!     interval: 10,
//!     ease_factor: 2500,
//!     ..Default::default()
//! })?;
//! let answered = storage.answer_card(card.id, Rating::Good, &table)?;
//! println!("next review in {} days", answered.card.interval);
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the crate

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod backfill;
pub mod card;
pub mod config;
pub mod custom_data;
pub mod scheduler;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Card types
pub use card::{
    CardSnapshot, CardUpdate, DEFAULT_EASE_FACTOR, FsrsMemoryState, Queue, Rating,
};

// Deck options
pub use config::{
    ConfigError, ConfigTable, EaseReward, GLOBAL_GROUP, Multiplier, MultiplierError,
    MultiplierFn, Resolution, ReviewConfig, SchedulerConfig, default_config_path, resolve,
};

// Custom data
pub use custom_data::{
    CustomData, CustomDataError, STREAK_KEY, merge, merge_streak, read_streak,
};

// Scheduling
pub use scheduler::{
    AnswerEngine, AnswerOutcome, DeferReason, EngineError, FuzzGenerator, FuzzPolicy,
    HostScheduler, NativeStates, NextStates, SeededFuzz, Sm2Host, Sm2Params, fuzz_seed,
};

// Storage layer
pub use storage::{
    AnsweredCard, CardRecord, CollectionStats, NewCard, NewReviewEvent, Result, ReviewEvent,
    Storage, StorageError,
};

// Backfill
pub use backfill::{
    BackfillOptions, BackfillReport, StreakBackfill, backfill_streaks, replay_streak,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AnswerEngine, AnswerOutcome, CardSnapshot, CardUpdate, ConfigTable, HostScheduler,
        Queue, Rating, ReviewConfig, Storage, StorageError,
    };
}
