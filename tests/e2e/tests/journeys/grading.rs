//! Grading Journey Tests
//!
//! A review card answered through the collection, day by day, the way a
//! study session would do it.

use easeward_core::custom_data::read_streak;
use easeward_core::scheduler::FuzzGenerator;
use easeward_core::{ConfigTable, DeferReason, Queue, Rating};
use easeward_e2e_tests::{TestDataFactory, TestDatabaseManager};

#[test]
fn test_first_good_answer() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
    let card_id = db.seed_review_card("Default", 100, 2000, "");

    let answered = db.answer_on_due(card_id, Rating::Good, &table);

    assert!(answered.outcome.is_applied());
    assert_eq!(answered.card.interval, 300);
    assert_eq!(answered.card.ease_factor, 2050);
    assert_eq!(answered.card.custom_data, r#"{"c":1}"#);
    assert_eq!(answered.card.due, 400);
}

#[test]
fn test_reward_starts_at_threshold_and_grows() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(3, false));
    let card_id = db.seed_review_card("Default", 100, 2000, "");

    let answers = db.grade_sequence(card_id, &[Rating::Good; 4], &table);

    let intervals: Vec<u32> = answers.iter().map(|a| a.card.interval).collect();
    let eases: Vec<u32> = answers.iter().map(|a| a.card.ease_factor).collect();
    assert_eq!(intervals, vec![300, 900, 2700, 8100]);
    assert_eq!(eases, vec![2000, 2000, 2050, 2150]);
    assert_eq!(read_streak(&answers[3].card.custom_data).unwrap(), 4);
}

#[test]
fn test_lapse_and_recovery() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
    let card_id = db.seed_review_card("Default", 100, 2000, r#"{"pos":"verb"}"#);

    db.answer_on_due(card_id, Rating::Good, &table);
    let again = db.answer_on_due(card_id, Rating::Again, &table);
    assert_eq!(again.card.queue, Queue::Relearning);
    assert_eq!(again.card.lapses, 1);
    assert_eq!(again.card.custom_data, r#"{"pos":"verb"}"#);

    // Relearning belongs to the host; custom data rides along untouched
    let relearned = db.answer_on_due(card_id, Rating::Good, &table);
    assert!(!relearned.outcome.is_applied());
    assert!(matches!(
        relearned.outcome.defer_reason(),
        Some(DeferReason::NotReviewCard(Queue::Relearning))
    ));
    assert_eq!(relearned.card.queue, Queue::Review);
    assert_eq!(relearned.card.custom_data, r#"{"pos":"verb"}"#);

    let back = db.answer_on_due(card_id, Rating::Good, &table);
    assert!(back.outcome.is_applied());
    assert_eq!(back.card.custom_data, r#"{"pos":"verb","c":1}"#);
}

#[test]
fn test_hard_resets_streak_without_reward() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
    let card_id = db.seed_review_card("Default", 100, 2000, r#"{"c":4}"#);

    let answered = db.answer_on_due(card_id, Rating::Hard, &table);
    assert_eq!(answered.card.interval, 200);
    assert_eq!(answered.card.ease_factor, 1850);
    assert_eq!(answered.card.custom_data, "");
}

#[test]
fn test_fuzzed_interval_is_in_band_and_stable() {
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, true));

    let first = TestDatabaseManager::new_temp();
    let card_id = first.seed_review_card("Default", 100, 2000, "");
    let preview = first
        .storage
        .preview_card(card_id, &table, 100)
        .unwrap();
    let good = preview[2].1.update().interval;
    assert!((283..=318).contains(&good), "fuzzed interval {good}");

    // Same card id and history in another collection: same interval
    let second = TestDatabaseManager::new_temp();
    let same_id = second.seed_review_card("Default", 100, 2000, "");
    assert_eq!(same_id, card_id);
    let answered = second.answer_on_due(same_id, Rating::Good, &table);
    assert_eq!(answered.card.interval, good);
}

#[test]
fn test_fuzz_generator_band_for_300_days() {
    let fuzz = FuzzGenerator::new(true);
    for seed in 0..500u64 {
        let fuzzed = fuzz.fuzz(300, seed);
        assert!((283..=318).contains(&fuzzed), "seed {seed} gave {fuzzed}");
        assert_eq!(fuzz.fuzz(300, seed), fuzzed);
    }
    assert_eq!(FuzzGenerator::new(false).fuzz(300, 7), 300);
}

#[test]
fn test_new_cards_stay_with_host() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
    let card_id = db.seed_new_card("Default");

    let answered = db.answer_on_due(card_id, Rating::Easy, &table);
    assert!(!answered.outcome.is_applied());
    assert_eq!(answered.card.queue, Queue::Review);
    assert_eq!(answered.card.interval, 4);
    assert_eq!(answered.card.custom_data, "");
}

#[test]
fn test_without_deck_options_host_decides() {
    let db = TestDatabaseManager::new_temp();
    let card_id = db.seed_review_card("Default", 100, 2000, r#"{"c":2}"#);

    let answered = db.answer_on_due(card_id, Rating::Good, &ConfigTable::new());
    assert_eq!(answered.outcome.defer_reason(), Some(&DeferReason::NoConfig));
    assert_eq!(answered.card.interval, 200);
    assert_eq!(answered.card.custom_data, r#"{"c":2}"#);
}

#[test]
fn test_every_answer_is_logged_with_its_queue() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
    let card_id = db.seed_review_card("Default", 10, 2500, "");

    db.grade_sequence(card_id, &[Rating::Good, Rating::Again, Rating::Good], &table);

    let events = db.storage.review_events(card_id).unwrap();
    let logged: Vec<(Rating, Queue, bool)> = events
        .iter()
        .map(|e| (e.rating, e.queue, e.scheduled_by_engine))
        .collect();
    assert_eq!(
        logged,
        vec![
            (Rating::Good, Queue::Review, true),
            (Rating::Again, Queue::Review, true),
            (Rating::Good, Queue::Relearning, false),
            (Rating::Good, Queue::Review, true),
        ]
    );
    assert_eq!(db.card(card_id).reps, 4);
}

#[test]
fn test_full_custom_data_only_blocks_answers_that_grow_it() {
    let db = TestDatabaseManager::new_temp();
    let table = TestDataFactory::global_table(TestDataFactory::review_config(1, false));
    let full = format!(r#"{{"c":9,"p":"{}"}}"#, "x".repeat(86));
    let card_id = db.seed_review_card("Default", 100, 2000, &full);

    let preview = db.storage.preview_card(card_id, &table, 100).unwrap();
    let applied: Vec<(Rating, bool)> = preview
        .iter()
        .map(|(rating, outcome)| (*rating, outcome.is_applied()))
        .collect();
    assert_eq!(
        applied,
        vec![
            (Rating::Again, true),
            (Rating::Hard, true),
            (Rating::Good, false),
            (Rating::Easy, false),
        ]
    );
    assert_eq!(preview[1].1.update().interval, 200);

    let again = db.answer_on_due(card_id, Rating::Again, &table);
    assert!(again.outcome.is_applied());
    assert_eq!(read_streak(&again.card.custom_data).unwrap(), 0);
    assert!(!again.card.custom_data.contains(r#""c""#));
}
