//! Streak Property Tests
//!
//! Whole answer sequences through a collection, checked against the rules
//! the streak and the ease reward must always follow.

use easeward_core::custom_data::read_streak;
use easeward_core::{BackfillOptions, Queue, Rating, backfill_streaks};
use easeward_e2e_tests::{TestDataFactory, TestDatabaseManager};
use proptest::prelude::*;

fn rating() -> impl Strategy<Value = Rating> {
    prop_oneof![
        Just(Rating::Again),
        Just(Rating::Hard),
        Just(Rating::Good),
        Just(Rating::Easy),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_streak_follows_answers(
        ratings in proptest::collection::vec(rating(), 1..15),
        threshold in 0u32..4,
    ) {
        let db = TestDatabaseManager::new_temp();
        let table = TestDataFactory::global_table(TestDataFactory::review_config(threshold, true));
        let card_id = db.seed_review_card("Default", 20, 2300, r#"{"k":1}"#);

        let mut expected = 0u32;
        let answers = db.grade_sequence(card_id, &ratings, &table);
        for (rating, answered) in ratings.iter().zip(&answers) {
            let data = &answered.card.custom_data;

            if rating.is_success() {
                expected += 1;
                prop_assert_eq!(read_streak(data).unwrap(), expected);
            } else {
                expected = 0;
                prop_assert!(!data.contains(r#""c""#));
            }
            let k_prefix = r#"{"k":1"#;
            prop_assert!(data.starts_with(k_prefix));
            prop_assert!((1300..=9990).contains(&answered.card.ease_factor));
            prop_assert!(answered.card.interval >= 1);
        }
    }

    #[test]
    fn prop_backfill_is_idempotent(ratings in proptest::collection::vec(rating(), 1..10)) {
        let db = TestDatabaseManager::new_temp();
        let card_id = db.seed_review_card("Default", 10, 2500, "");
        let history: Vec<(Rating, Queue)> = ratings.iter().map(|r| (*r, Queue::Review)).collect();
        db.log_history(card_id, &history);

        backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();
        let first = db.card(card_id).custom_data;
        let report = backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();

        prop_assert_eq!(report.updated, 0);
        prop_assert_eq!(db.card(card_id).custom_data, first);
    }
}
