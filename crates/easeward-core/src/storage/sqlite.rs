//! SQLite Storage Implementation
//!
//! Collection storage: decks, cards and the review log. Answering a card
//! runs the engine against the configured host scheduler and writes the
//! resulting update together with a review log row.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::card::{CardSnapshot, CardUpdate, FsrsMemoryState, Queue, Rating};
use crate::config::ConfigTable;
use crate::scheduler::{AnswerEngine, AnswerOutcome, HostScheduler, Sm2Host};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Card not found
    #[error("Card not found: {0}")]
    NotFound(i64),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// RECORDS
// ============================================================================

/// Input for adding a card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub deck: String,
    pub queue: Queue,
    /// Due day number; defaults to today for review cards
    pub due: Option<i32>,
    pub interval: u32,
    /// Permille; 0 lets the host pick its starting ease
    pub ease_factor: u32,
    pub reps: u32,
    pub lapses: u32,
    pub remaining_steps: u32,
    pub memory_state: Option<FsrsMemoryState>,
    pub desired_retention: Option<f32>,
    pub custom_data: String,
}

/// A stored card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: i64,
    pub deck_id: i64,
    pub deck_name: String,
    pub queue: Queue,
    pub due: i32,
    pub interval: u32,
    pub ease_factor: u32,
    pub reps: u32,
    pub lapses: u32,
    pub remaining_steps: u32,
    pub memory_state: Option<FsrsMemoryState>,
    pub desired_retention: Option<f32>,
    pub custom_data: String,
    pub modified_at: DateTime<Utc>,
}

impl CardRecord {
    /// Engine view of this card as of day `today`
    pub fn snapshot(&self, today: i32) -> CardSnapshot {
        let last_review = i64::from(self.due) - i64::from(self.interval);
        let elapsed_days = (i64::from(today) - last_review).clamp(0, i64::from(u32::MAX)) as u32;

        CardSnapshot {
            id: self.id,
            queue: self.queue,
            due: self.due,
            interval: self.interval,
            ease_factor: self.ease_factor,
            reps: self.reps,
            lapses: self.lapses,
            remaining_steps: self.remaining_steps,
            elapsed_days,
            memory_state: self.memory_state,
            desired_retention: self.desired_retention,
            custom_data: self.custom_data.clone(),
        }
    }
}

/// One row of the review log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    pub id: i64,
    pub card_id: i64,
    pub reviewed_at: DateTime<Utc>,
    pub rating: Rating,
    /// Queue the card was in when it was answered
    pub queue: Queue,
    pub interval: u32,
    pub last_interval: u32,
    pub ease_factor: u32,
    /// Whether the custom engine scheduled this answer
    pub scheduled_by_engine: bool,
}

/// Input for importing a historical review
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReviewEvent {
    pub card_id: i64,
    pub reviewed_at: DateTime<Utc>,
    pub rating: Rating,
    pub queue: Queue,
    pub interval: u32,
    pub last_interval: u32,
    pub ease_factor: u32,
}

/// A card after an answer was recorded
#[derive(Debug, Clone)]
pub struct AnsweredCard {
    pub card: CardRecord,
    pub outcome: AnswerOutcome,
}

/// Collection-wide counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub decks: i64,
    pub cards: i64,
    pub review_cards: i64,
    pub cards_with_streak: i64,
    pub reviews: i64,
}

// ============================================================================
// STORAGE
// ============================================================================

/// Collection storage with separate reader/writer connections.
///
/// All methods take `&self`, so `Storage` can be shared behind an `Arc`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    engine: AnswerEngine,
    host: Arc<dyn HostScheduler>,
}

impl Storage {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Platform default database location
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "easeward", "easeward").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("collection.db"))
    }

    /// Open or create a collection with the reference SM-2 host
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_host(db_path, Arc::new(Sm2Host::default()))
    }

    /// Open or create a collection scheduled by `host`
    pub fn with_host(db_path: Option<PathBuf>, host: Arc<dyn HostScheduler>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;
        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;
        writer_conn.execute(
            "INSERT OR IGNORE INTO collection (id, created_at) VALUES (1, ?1)",
            params![Utc::now().to_rfc3339()],
        )?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::debug!("Opened collection at {}", path.display());

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            engine: AnswerEngine::new(),
            host,
        })
    }

    /// Replace the answer engine (e.g. to change the fuzz policy)
    pub fn set_engine(&mut self, engine: AnswerEngine) {
        self.engine = engine;
    }

    fn lock_reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    // ========================================================================
    // DAYS
    // ========================================================================

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Invalid {} timestamp '{}': {}", field_name, value, e),
                    )),
                )
            })
    }

    fn parse_millis(value: i64) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::from_timestamp_millis(value).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                Box::new(StorageError::InvalidTimestamp(value.to_string())),
            )
        })
    }

    /// Creation time and day rollover hour of the collection
    pub fn collection_clock(&self) -> Result<(DateTime<Utc>, u32)> {
        let reader = self.lock_reader()?;
        let (created_at, rollover): (String, u32) = reader.query_row(
            "SELECT created_at, rollover_hour FROM collection WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((Self::parse_timestamp(&created_at, "created_at")?, rollover))
    }

    /// Current day number of the collection
    pub fn today(&self) -> Result<i32> {
        let (created_at, rollover) = self.collection_clock()?;
        Ok(day_number(created_at, Utc::now(), rollover))
    }

    // ========================================================================
    // DECKS
    // ========================================================================

    /// Id of the deck called `name`, creating it if needed
    pub fn get_or_create_deck(&self, name: &str) -> Result<i64> {
        let writer = self.lock_writer()?;
        writer.execute(
            "INSERT OR IGNORE INTO decks (name) VALUES (?1)",
            params![name],
        )?;
        let id = writer.query_row(
            "SELECT id FROM decks WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// All deck names, sorted
    pub fn deck_names(&self) -> Result<Vec<String>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare("SELECT name FROM decks ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    /// Add a card and return it as stored
    pub fn add_card(&self, input: NewCard) -> Result<CardRecord> {
        let deck_id = self.get_or_create_deck(&input.deck)?;
        let due = match input.due {
            Some(due) => due,
            None => self.today()?,
        };

        let id = {
            let writer = self.lock_writer()?;
            writer.execute(
                "INSERT INTO cards (
                    deck_id, queue, due, interval, ease_factor, reps, lapses, remaining_steps,
                    stability, difficulty, desired_retention, custom_data, modified_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    deck_id,
                    input.queue.as_str(),
                    due,
                    input.interval,
                    input.ease_factor,
                    input.reps,
                    input.lapses,
                    input.remaining_steps,
                    input.memory_state.map(|m| f64::from(m.stability)),
                    input.memory_state.map(|m| f64::from(m.difficulty)),
                    input.desired_retention.map(f64::from),
                    input.custom_data,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            writer.last_insert_rowid()
        };

        tracing::debug!(card_id = id, deck = %input.deck, "Added card");
        self.get_card(id)?.ok_or(StorageError::NotFound(id))
    }

    /// Get a card by id
    pub fn get_card(&self, id: i64) -> Result<Option<CardRecord>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT c.*, d.name AS deck_name
             FROM cards c JOIN decks d ON d.id = c.deck_id
             WHERE c.id = ?1",
        )?;
        let card = stmt.query_row(params![id], Self::row_to_card).optional()?;
        Ok(card)
    }

    /// Convert a row to CardRecord
    fn row_to_card(row: &Row) -> rusqlite::Result<CardRecord> {
        let queue: String = row.get("queue")?;
        let queue = Queue::parse_name(&queue).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("Unknown queue '{}'", queue).into(),
            )
        })?;

        let stability: Option<f64> = row.get("stability")?;
        let difficulty: Option<f64> = row.get("difficulty")?;
        let memory_state = match (stability, difficulty) {
            (Some(stability), Some(difficulty)) => Some(FsrsMemoryState {
                stability: stability as f32,
                difficulty: difficulty as f32,
            }),
            _ => None,
        };
        let desired_retention: Option<f64> = row.get("desired_retention")?;
        let modified_at: String = row.get("modified_at")?;

        Ok(CardRecord {
            id: row.get("id")?,
            deck_id: row.get("deck_id")?,
            deck_name: row.get("deck_name")?,
            queue,
            due: row.get("due")?,
            interval: row.get("interval")?,
            ease_factor: row.get("ease_factor")?,
            reps: row.get("reps")?,
            lapses: row.get("lapses")?,
            remaining_steps: row.get("remaining_steps")?,
            memory_state,
            desired_retention: desired_retention.map(|r| r as f32),
            custom_data: row.get("custom_data")?,
            modified_at: Self::parse_timestamp(&modified_at, "modified_at")?,
        })
    }

    /// Ids of all cards, ascending
    pub fn card_ids(&self) -> Result<Vec<i64>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare("SELECT id FROM cards ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Ids of cards currently in the review queue, ascending, after `after`
    pub fn review_card_ids(&self, after: Option<i64>) -> Result<Vec<i64>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT id FROM cards WHERE queue = 'review' AND id > ?1 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![after.unwrap_or(i64::MIN)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    /// Replace a card's custom data only if it still holds `expected`.
    ///
    /// Returns `false` when the card changed underneath (or no longer exists).
    pub fn compare_and_set_custom_data(
        &self,
        card_id: i64,
        expected: &str,
        custom_data: &str,
    ) -> Result<bool> {
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;
        let changed = tx.execute(
            "UPDATE cards SET custom_data = ?1, modified_at = ?2
             WHERE id = ?3 AND custom_data = ?4",
            params![custom_data, Utc::now().to_rfc3339(), card_id, expected],
        )?;
        tx.commit()?;
        Ok(changed == 1)
    }

    // ========================================================================
    // ANSWERING
    // ========================================================================

    /// Answer a card today
    pub fn answer_card(
        &self,
        card_id: i64,
        rating: Rating,
        table: &ConfigTable,
    ) -> Result<AnsweredCard> {
        let today = self.today()?;
        self.answer_card_on(card_id, rating, table, today)
    }

    /// Answer a card as of day `today`
    pub fn answer_card_on(
        &self,
        card_id: i64,
        rating: Rating,
        table: &ConfigTable,
        today: i32,
    ) -> Result<AnsweredCard> {
        let card = self.get_card(card_id)?.ok_or(StorageError::NotFound(card_id))?;
        let snapshot = card.snapshot(today);
        let outcome = self.engine.answer_with_host(
            self.host.as_ref(),
            &snapshot,
            rating,
            table.resolve(&card.deck_name),
            today,
        );

        tracing::info!(
            card_id,
            rating = %rating,
            queue = %card.queue,
            applied = outcome.is_applied(),
            interval = outcome.update().interval,
            "Answered card"
        );

        self.write_answer(&card, rating, &outcome)?;
        let card = self.get_card(card_id)?.ok_or(StorageError::NotFound(card_id))?;
        Ok(AnsweredCard { card, outcome })
    }

    /// What each answer would do today, without writing anything
    pub fn preview_card(
        &self,
        card_id: i64,
        table: &ConfigTable,
        today: i32,
    ) -> Result<Vec<(Rating, AnswerOutcome)>> {
        let card = self.get_card(card_id)?.ok_or(StorageError::NotFound(card_id))?;
        let snapshot = card.snapshot(today);
        let resolution = table.resolve(&card.deck_name);
        Ok(Rating::ALL
            .iter()
            .map(|&rating| {
                let outcome = self.engine.answer_with_host(
                    self.host.as_ref(),
                    &snapshot,
                    rating,
                    resolution,
                    today,
                );
                (rating, outcome)
            })
            .collect())
    }

    fn write_answer(&self, card: &CardRecord, rating: Rating, outcome: &AnswerOutcome) -> Result<()> {
        let update: &CardUpdate = outcome.update();
        let now = Utc::now();
        let reps = card.reps.saturating_add(1);

        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;
        tx.execute(
            "UPDATE cards SET
                queue = ?1,
                due = ?2,
                interval = ?3,
                ease_factor = ?4,
                reps = ?5,
                lapses = ?6,
                remaining_steps = ?7,
                stability = ?8,
                difficulty = ?9,
                desired_retention = ?10,
                custom_data = ?11,
                modified_at = ?12
            WHERE id = ?13",
            params![
                update.queue.as_str(),
                update.due,
                update.interval,
                update.ease_factor,
                reps,
                update.lapses,
                update.remaining_steps,
                update.memory_state.map(|m| f64::from(m.stability)),
                update.memory_state.map(|m| f64::from(m.difficulty)),
                update.desired_retention.map(f64::from),
                update.custom_data,
                now.to_rfc3339(),
                card.id,
            ],
        )?;
        tx.execute(
            "INSERT INTO revlog (
                card_id, reviewed_at, rating, queue, interval, last_interval,
                ease_factor, scheduled_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                card.id,
                now.timestamp_millis(),
                rating.as_i32(),
                card.queue.as_str(),
                update.interval,
                card.interval,
                update.ease_factor,
                if outcome.is_applied() { "engine" } else { "host" },
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // REVIEW LOG
    // ========================================================================

    /// Import a historical review without touching the card
    pub fn record_review(&self, event: NewReviewEvent) -> Result<i64> {
        let writer = self.lock_writer()?;
        writer.execute(
            "INSERT INTO revlog (
                card_id, reviewed_at, rating, queue, interval, last_interval, ease_factor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.card_id,
                event.reviewed_at.timestamp_millis(),
                event.rating.as_i32(),
                event.queue.as_str(),
                event.interval,
                event.last_interval,
                event.ease_factor,
            ],
        )?;
        Ok(writer.last_insert_rowid())
    }

    /// Review log of a card, oldest first
    pub fn review_events(&self, card_id: i64) -> Result<Vec<ReviewEvent>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM revlog WHERE card_id = ?1 ORDER BY reviewed_at, id",
        )?;
        let events = stmt
            .query_map(params![card_id], Self::row_to_event)?
            .collect::<rusqlite::Result<Vec<ReviewEvent>>>()?;
        Ok(events)
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<ReviewEvent> {
        let rating: i32 = row.get("rating")?;
        let rating = Rating::from_i32(rating).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                format!("Unknown rating {}", rating).into(),
            )
        })?;
        let queue: String = row.get("queue")?;
        let queue = Queue::parse_name(&queue).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("Unknown queue '{}'", queue).into(),
            )
        })?;
        let scheduled_by: String = row.get("scheduled_by")?;

        Ok(ReviewEvent {
            id: row.get("id")?,
            card_id: row.get("card_id")?,
            reviewed_at: Self::parse_millis(row.get("reviewed_at")?)?,
            rating,
            queue,
            interval: row.get("interval")?,
            last_interval: row.get("last_interval")?,
            ease_factor: row.get("ease_factor")?,
            scheduled_by_engine: scheduled_by == "engine",
        })
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Collection-wide counts
    pub fn get_stats(&self) -> Result<CollectionStats> {
        let reader = self.lock_reader()?;
        let count = |sql: &str| -> rusqlite::Result<i64> { reader.query_row(sql, [], |row| row.get(0)) };

        Ok(CollectionStats {
            decks: count("SELECT COUNT(*) FROM decks")?,
            cards: count("SELECT COUNT(*) FROM cards")?,
            review_cards: count("SELECT COUNT(*) FROM cards WHERE queue = 'review'")?,
            cards_with_streak: count(
                "SELECT COUNT(*) FROM cards
                 WHERE CASE WHEN json_valid(custom_data)
                       THEN json_extract(custom_data, '$.c') END IS NOT NULL",
            )?,
            reviews: count("SELECT COUNT(*) FROM revlog")?,
        })
    }
}

/// Whole days between the collection's creation and `now`, with days
/// starting at `rollover_hour` UTC
pub fn day_number(created_at: DateTime<Utc>, now: DateTime<Utc>, rollover_hour: u32) -> i32 {
    let shift = Duration::hours(i64::from(rollover_hour));
    let days = ((now - shift).date_naive() - (created_at - shift).date_naive()).num_days();
    i32::try_from(days).unwrap_or(if days < 0 { i32::MIN } else { i32::MAX })
}
