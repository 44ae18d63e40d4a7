//! Backfill Journey Tests
//!
//! Streak reconstruction over whole collections: imported histories,
//! histories produced by the engine itself, and repeated runs.

use easeward_core::custom_data::read_streak;
use easeward_core::{BackfillOptions, Queue, Rating, backfill_streaks};
use easeward_e2e_tests::{TestDataFactory, TestDatabaseManager};

#[test]
fn test_backfill_scenario_matches_expectations() {
    let db = TestDatabaseManager::new_temp();
    let scenario = TestDataFactory::create_backfill_scenario(&db);

    let report = backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();

    assert_eq!(report.scanned, 4);
    assert_eq!(report.updated, 3);
    assert_eq!(report.without_history, 1);
    assert!(report.conflicts.is_empty());
    assert!(report.failures.is_empty());

    for (card_id, expected) in &scenario.expected_custom_data {
        assert_eq!(&db.card(*card_id).custom_data, expected, "card {card_id}");
    }
}

#[test]
fn test_second_run_changes_nothing() {
    let db = TestDatabaseManager::new_temp();
    TestDataFactory::create_backfill_scenario(&db);

    backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();
    let after_first = db.custom_data_by_card();

    let report = backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();
    assert_eq!(report.updated, 0);
    assert_eq!(report.unchanged, 3);
    assert_eq!(db.custom_data_by_card(), after_first);
}

#[test]
fn test_dry_run_then_resume() {
    let mut db = TestDatabaseManager::new_temp();
    let scenario = TestDataFactory::create_backfill_scenario(&db);
    db.take_snapshot();

    let dry = backfill_streaks(
        &db.storage,
        BackfillOptions {
            dry_run: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(dry.updated, 3);
    assert!(db.has_snapshot());

    // Nothing was written, so restoring changes nothing either
    let before = db.custom_data_by_card();
    db.restore_snapshot();
    assert_eq!(db.custom_data_by_card(), before);

    // Process the first card, then resume after it
    let steady = scenario.card("steady");
    let first = backfill_streaks(
        &db.storage,
        BackfillOptions {
            resume_after: Some(steady - 1),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(first.last_card_id, Some(scenario.card("fresh")));

    let resumed = backfill_streaks(
        &db.storage,
        BackfillOptions {
            resume_after: first.last_card_id,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(resumed.scanned, 0);
}

#[test]
fn test_backfill_agrees_with_engine_history() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(2, false));

    let mut cards = Vec::new();
    for seed in 0..6 {
        let card_id = db.seed_review_card("Default", 10 + seed as u32, 2500, r#"{"src":"deck"}"#);
        let ratings = TestDataFactory::rating_sequence(12, seed);
        db.grade_sequence(card_id, &ratings, &table);
        // Leave every card in review so the backfill scans it
        while db.card(card_id).queue != Queue::Review {
            db.answer_on_due(card_id, Rating::Good, &table);
        }
        cards.push(card_id);
    }

    let engine_streaks: Vec<u32> = cards
        .iter()
        .map(|id| read_streak(&db.card(*id).custom_data).unwrap())
        .collect();

    let report = backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();
    assert_eq!(report.scanned, cards.len());
    assert!(report.failures.is_empty());

    for (card_id, engine_streak) in cards.iter().zip(engine_streaks) {
        let card = db.card(*card_id);
        assert_eq!(read_streak(&card.custom_data).unwrap(), engine_streak);
        assert!(card.custom_data.starts_with(r#"{"src":"deck""#));
    }
}

#[test]
fn test_malformed_custom_data_is_reported() {
    let db = TestDatabaseManager::new_temp();
    let bad = db.seed_review_card("Default", 10, 2500, "{not json");
    db.log_history(bad, &[(Rating::Good, Queue::Review)]);

    let report = backfill_streaks(&db.storage, BackfillOptions::default()).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, bad);
    assert_eq!(db.card(bad).custom_data, "{not json");
}
