//! Storage Module
//!
//! SQLite-based collection storage with:
//! - Decks, cards and the review log
//! - Day numbers relative to the collection's creation
//! - Answering through the engine and a host scheduler in one transaction

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{
    AnsweredCard, CardRecord, CollectionStats, NewCard, NewReviewEvent, Result, ReviewEvent,
    Storage, StorageError, day_number,
};
