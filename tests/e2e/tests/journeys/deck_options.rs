//! Deck Options Journey Tests
//!
//! Loading a deck options file and grading cards in decks that resolve to
//! their own group, the global group, a broken group or nothing at all.

use easeward_core::{ConfigTable, DeferReason, Rating, Resolution};
use easeward_e2e_tests::{TestDataFactory, TestDatabaseManager};
use tempfile::tempdir;

fn load_mixed_table() -> ConfigTable {
    let dir = tempdir().unwrap();
    let path = dir.path().join("deck-options.json");
    std::fs::write(&path, TestDataFactory::mixed_table_json()).unwrap();
    ConfigTable::load(&path).unwrap()
}

#[test]
fn test_deck_group_wins_over_global() {
    let table = load_mixed_table();
    let db = TestDatabaseManager::new_temp();
    let japanese = db.seed_review_card("Japanese", 100, 2000, "");
    let french = db.seed_review_card("French", 100, 2000, "");

    // Japanese: good multiplier = ease + 0.5 = 2.5, threshold 2
    let answered = db.answer_on_due(japanese, Rating::Good, &table);
    assert!(answered.outcome.is_applied());
    assert_eq!(answered.card.interval, 250);
    assert_eq!(answered.card.ease_factor, 2000);

    // French falls back to the global group: multiplier 3, threshold 1
    let answered = db.answer_on_due(french, Rating::Good, &table);
    assert_eq!(answered.card.interval, 300);
    assert_eq!(answered.card.ease_factor, 2050);
}

#[test]
fn test_broken_group_fails_closed() {
    let table = load_mixed_table();
    assert!(matches!(table.resolve("Broken"), Resolution::Invalid { .. }));

    let db = TestDatabaseManager::new_temp();
    let card_id = db.seed_review_card("Broken", 100, 2000, r#"{"c":3}"#);
    let answered = db.answer_on_due(card_id, Rating::Good, &table);

    assert!(matches!(
        answered.outcome.defer_reason(),
        Some(DeferReason::InvalidConfig { group, .. }) if group == "Broken"
    ));
    // Host interval, streak untouched
    assert_eq!(answered.card.interval, 200);
    assert_eq!(answered.card.custom_data, r#"{"c":3}"#);
}

#[test]
fn test_negative_multiplier_defers_single_answer() {
    let json = format!(
        r#"{{"Global Settings": {}}}"#,
        TestDataFactory::group_json(1, false, r#"{"ease": {"scale": -1.0}}"#)
    );
    let table = ConfigTable::from_json_str(&json).unwrap();

    let db = TestDatabaseManager::new_temp();
    let card_id = db.seed_review_card("Default", 100, 2000, "");
    let answered = db.answer_on_due(card_id, Rating::Good, &table);

    assert!(matches!(
        answered.outcome.defer_reason(),
        Some(DeferReason::InvalidMultiplier(_))
    ));
    assert_eq!(answered.card.interval, 200);
    assert_eq!(answered.card.custom_data, "");
}

#[test]
fn test_no_global_group_leaves_unlisted_decks_to_host() {
    let json = format!(
        r#"{{"Japanese": {}}}"#,
        TestDataFactory::group_json(1, false, "3.0")
    );
    let table = ConfigTable::from_json_str(&json).unwrap();

    let db = TestDatabaseManager::new_temp();
    let card_id = db.seed_review_card("Spanish", 100, 2000, "");
    let answered = db.answer_on_due(card_id, Rating::Good, &table);
    assert_eq!(answered.outcome.defer_reason(), Some(&DeferReason::NoConfig));
}
