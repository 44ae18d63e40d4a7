//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Deck options tables, both as JSON and as typed configs
//! - Review cards with custom data from other add-ons
//! - Pre-built backfill scenarios with known expected streaks

use std::collections::HashMap;

use easeward_core::{
    ConfigTable, EaseReward, GLOBAL_GROUP, NewCard, Queue, Rating, ReviewConfig, SchedulerConfig,
    Storage,
};

use crate::harness::TestDatabaseManager;

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
/// let scenario = TestDataFactory::create_backfill_scenario(&db);
/// ```
pub struct TestDataFactory;

/// A set of cards created for one test, with named roles
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Card ids in creation order
    pub card_ids: Vec<i64>,
    /// Human-readable description
    pub description: String,
    /// Role name -> card id
    pub cards: HashMap<String, i64>,
    /// Card id -> custom data expected after the scenario runs
    pub expected_custom_data: HashMap<i64, String>,
}

impl TestScenario {
    fn new(description: &str) -> Self {
        Self {
            card_ids: Vec::new(),
            description: description.to_string(),
            cards: HashMap::new(),
            expected_custom_data: HashMap::new(),
        }
    }

    fn add(&mut self, role: &str, card_id: i64, expected: Option<&str>) {
        self.card_ids.push(card_id);
        self.cards.insert(role.to_string(), card_id);
        if let Some(expected) = expected {
            self.expected_custom_data
                .insert(card_id, expected.to_string());
        }
    }

    /// Card id for a role
    pub fn card(&self, role: &str) -> i64 {
        self.cards[role]
    }
}

impl TestDataFactory {
    // ========================================================================
    // DECK OPTIONS
    // ========================================================================

    /// Reward 0.05 + 0.05 per extra streak step, ease kept in [1.3, 2.5],
    /// multipliers 2/3/4
    pub fn review_config(threshold: u32, enable_fuzz: bool) -> ReviewConfig {
        let mut scheduler = SchedulerConfig::with_constants(2.0, 3.0, 4.0);
        scheduler.enable_fuzz = enable_fuzz;
        ReviewConfig {
            ease_reward: EaseReward::new(threshold, 0.05, 0.05, 1.3, 2.5),
            scheduler,
        }
    }

    /// Table with only the global group
    pub fn global_table(config: ReviewConfig) -> ConfigTable {
        let mut table = ConfigTable::new();
        table.insert(GLOBAL_GROUP, config);
        table
    }

    /// JSON for one deck options group
    pub fn group_json(threshold: u32, enable_fuzz: bool, good_multiplier: &str) -> String {
        format!(
            r#"{{
                "easeReward": {{
                    "minimumConsecutiveSuccessfulReviewsRequiredForReward": {threshold},
                    "baseEaseReward": 0.05,
                    "stepEaseReward": 0.05,
                    "minimumEase": 1.3,
                    "maximumEase": 2.5
                }},
                "scheduler": {{
                    "enableFuzz": {enable_fuzz},
                    "maximumInterval": 36500,
                    "intervalModifier": 1.0,
                    "calculateHardMultiplier": 2.0,
                    "calculateGoodMultiplier": {good_multiplier},
                    "calculateEasyMultiplier": 4.0
                }}
            }}"#
        )
    }

    /// A realistic table: a global group, a deck with its own multiplier
    /// function, and a deck whose group is broken
    pub fn mixed_table_json() -> String {
        format!(
            r#"{{
                "{global_group}": {global},
                "Japanese": {japanese},
                "Broken": {{ "easeReward": {{ "baseEaseReward": "lots" }} }}
            }}"#,
            global_group = GLOBAL_GROUP,
            global = Self::group_json(1, false, "3.0"),
            japanese = Self::group_json(2, false, r#"{"ease": {"scale": 1.0, "offset": 0.5}}"#),
        )
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Review card input, due on day `interval`
    pub fn review_card(deck: &str, interval: u32, ease_factor: u32, custom_data: &str) -> NewCard {
        NewCard {
            deck: deck.to_string(),
            queue: Queue::Review,
            due: Some(interval as i32),
            interval,
            ease_factor,
            custom_data: custom_data.to_string(),
            ..Default::default()
        }
    }

    /// Add a review card directly to a storage
    pub fn create_review_card(storage: &Storage, deck: &str, interval: u32, ease: u32) -> i64 {
        storage
            .add_card(Self::review_card(deck, interval, ease, ""))
            .expect("Failed to add card")
            .id
    }

    // ========================================================================
    // SCENARIO CREATION
    // ========================================================================

    /// Cards with imported histories and the custom data the backfill should
    /// leave behind
    pub fn create_backfill_scenario(db: &TestDatabaseManager) -> TestScenario {
        use Queue::{Learning, Relearning, Review};
        use Rating::{Again, Easy, Good, Hard};

        let mut scenario = TestScenario::new("Backfill scenario with mixed histories");

        // Steady streak, other add-on keys untouched
        let steady = db.seed_review_card("Default", 30, 2500, r#"{"pos":"noun"}"#);
        db.log_history(
            steady,
            &[(Good, Learning), (Good, Review), (Good, Review), (Easy, Review)],
        );
        scenario.add("steady", steady, Some(r#"{"pos":"noun","c":3}"#));

        // Lapse followed by relearning steps that must not count
        let lapsed = db.seed_review_card("Default", 5, 2100, "");
        db.log_history(
            lapsed,
            &[
                (Good, Review),
                (Good, Review),
                (Again, Review),
                (Good, Relearning),
                (Good, Review),
            ],
        );
        scenario.add("lapsed", lapsed, Some(r#"{"c":1}"#));

        // Ends on Hard: explicit zero replaces a stale streak
        let stale = db.seed_review_card("Default", 12, 2300, r#"{"c":9}"#);
        db.log_history(stale, &[(Good, Review), (Hard, Review)]);
        scenario.add("stale", stale, Some(r#"{"c":0}"#));

        // Only learning history: nothing to backfill
        let fresh = db.seed_review_card("Default", 1, 2500, r#"{"x":true}"#);
        db.log_history(fresh, &[(Good, Learning), (Good, Learning)]);
        scenario.add("fresh", fresh, Some(r#"{"x":true}"#));

        // Still learning: never scanned
        let learning = db.seed_new_card("Default");
        db.log_history(learning, &[(Good, Review)]);
        scenario.add("learning", learning, Some(""));

        scenario
    }

    /// Deterministic rating sequence of a given length
    pub fn rating_sequence(len: usize, seed: usize) -> Vec<Rating> {
        (0..len)
            .map(|i| match (i * 7 + seed * 13) % 10 {
                0 => Rating::Again,
                1 | 2 => Rating::Hard,
                3..=7 => Rating::Good,
                _ => Rating::Easy,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easeward_core::Resolution;

    #[test]
    fn test_mixed_table_parses_with_one_invalid_group() {
        let table = ConfigTable::from_json_str(&TestDataFactory::mixed_table_json()).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.invalid_groups().count(), 1);
        assert!(matches!(table.resolve("Japanese"), Resolution::Deck(_)));
        assert!(matches!(table.resolve("French"), Resolution::Global(_)));
        assert!(matches!(table.resolve("Broken"), Resolution::Invalid { .. }));
    }

    #[test]
    fn test_create_backfill_scenario() {
        let db = TestDatabaseManager::new_temp();
        let scenario = TestDataFactory::create_backfill_scenario(&db);

        assert_eq!(scenario.card_ids.len(), 5);
        assert_eq!(scenario.expected_custom_data.len(), 5);
        assert_eq!(db.card(scenario.card("learning")).queue, Queue::New);
    }

    #[test]
    fn test_rating_sequence_is_deterministic() {
        let a = TestDataFactory::rating_sequence(20, 3);
        let b = TestDataFactory::rating_sequence(20, 3);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn test_create_review_card() {
        let db = TestDatabaseManager::new_temp();
        let id = TestDataFactory::create_review_card(&db.storage, "Default", 10, 2500);
        assert_eq!(db.card(id).due, 10);
    }
}
