//! Streak Backfill
//!
//! Rebuilds the streak key of every review card from its review log, for
//! collections that were graded before streaks were tracked (or whose
//! custom data was lost). Only answers given while the card was in the
//! review queue count: Good and Easy extend the streak, Again and Hard reset
//! it to zero.
//!
//! Each card is written in its own transaction and only if its custom data
//! still matches what was read, so a card graded during the run is reported
//! as a conflict rather than overwritten. Running the backfill twice leaves
//! the second run with nothing to write.

use serde::{Deserialize, Serialize};

use crate::card::{Queue, Rating};
use crate::custom_data::merge_streak;
use crate::storage::{Result, Storage};

/// Streak implied by a chronological sequence of answers.
///
/// `None` when no answer was given in the review queue.
pub fn replay_streak(events: impl IntoIterator<Item = (Rating, Queue)>) -> Option<u32> {
    events
        .into_iter()
        .filter(|(_, queue)| queue.is_review())
        .fold(None, |streak: Option<u32>, (rating, _)| {
            Some(if rating.is_success() {
                streak.unwrap_or(0).saturating_add(1)
            } else {
                0
            })
        })
}

/// Backfill options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillOptions {
    /// Compute everything, write nothing
    pub dry_run: bool,
    /// Skip cards with an id at or below this one
    pub resume_after: Option<i64>,
}

/// Summary of a backfill run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub scanned: usize,
    /// Cards written (or that would be written, on a dry run)
    pub updated: usize,
    pub unchanged: usize,
    pub without_history: usize,
    /// Cards whose custom data changed while the backfill was running
    pub conflicts: Vec<i64>,
    pub failures: Vec<(i64, String)>,
    /// Last card id processed; pass it as `resume_after` to continue
    pub last_card_id: Option<i64>,
}

/// What happened to a single card
#[derive(Debug, Clone, PartialEq)]
enum CardResult {
    Updated,
    Unchanged,
    WithoutHistory,
    Conflict,
}

/// Batch pass over every review card of a collection
pub struct StreakBackfill<'a> {
    storage: &'a Storage,
    options: BackfillOptions,
}

impl<'a> StreakBackfill<'a> {
    pub fn new(storage: &'a Storage, options: BackfillOptions) -> Self {
        Self { storage, options }
    }

    /// Run over all review cards in id order
    pub fn run(&self) -> Result<BackfillReport> {
        let card_ids = self.storage.review_card_ids(self.options.resume_after)?;
        let mut report = BackfillReport::default();

        tracing::info!(
            cards = card_ids.len(),
            dry_run = self.options.dry_run,
            resume_after = ?self.options.resume_after,
            "Starting streak backfill"
        );

        for card_id in card_ids {
            report.scanned += 1;
            match self.backfill_card(card_id) {
                Ok(CardResult::Updated) => report.updated += 1,
                Ok(CardResult::Unchanged) => report.unchanged += 1,
                Ok(CardResult::WithoutHistory) => report.without_history += 1,
                Ok(CardResult::Conflict) => {
                    tracing::warn!(card_id, "Card changed during backfill, skipped");
                    report.conflicts.push(card_id);
                }
                Err(message) => {
                    tracing::warn!(card_id, "Backfill failed: {}", message);
                    report.failures.push((card_id, message));
                }
            }
            report.last_card_id = Some(card_id);
        }

        tracing::info!(
            scanned = report.scanned,
            updated = report.updated,
            unchanged = report.unchanged,
            without_history = report.without_history,
            conflicts = report.conflicts.len(),
            failures = report.failures.len(),
            "Streak backfill finished"
        );

        Ok(report)
    }

    fn backfill_card(&self, card_id: i64) -> std::result::Result<CardResult, String> {
        let Some(card) = self.storage.get_card(card_id).map_err(|e| e.to_string())? else {
            return Ok(CardResult::Conflict);
        };
        if !card.queue.is_review() {
            return Ok(CardResult::Conflict);
        }

        let events = self
            .storage
            .review_events(card_id)
            .map_err(|e| e.to_string())?;
        let Some(streak) = replay_streak(events.iter().map(|e| (e.rating, e.queue))) else {
            return Ok(CardResult::WithoutHistory);
        };

        // Zero is written explicitly so the card reads as backfilled
        let document = merge_streak(&card.custom_data, Some(streak)).map_err(|e| e.to_string())?;
        if document == card.custom_data {
            return Ok(CardResult::Unchanged);
        }

        tracing::debug!(card_id, streak, "Backfilling streak");
        if self.options.dry_run {
            return Ok(CardResult::Updated);
        }

        let written = self
            .storage
            .compare_and_set_custom_data(card_id, &card.custom_data, &document)
            .map_err(|e| e.to_string())?;
        Ok(if written {
            CardResult::Updated
        } else {
            CardResult::Conflict
        })
    }
}

/// Backfill every review card of `storage`
pub fn backfill_streaks(storage: &Storage, options: BackfillOptions) -> Result<BackfillReport> {
    StreakBackfill::new(storage, options).run()
}
