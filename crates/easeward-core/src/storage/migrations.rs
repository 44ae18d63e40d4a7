//! Database Migrations
//!
//! Schema migration definitions for the collection database.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: collection, decks, cards, review log",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Record which scheduler produced each review",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS collection (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    created_at TEXT NOT NULL,
    -- Hour (UTC) at which a new study day starts
    rollover_hour INTEGER NOT NULL DEFAULT 4
);

CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck_id INTEGER NOT NULL REFERENCES decks(id),
    queue TEXT NOT NULL DEFAULT 'new',

    -- Scheduling (due is a day number, ease is permille)
    due INTEGER NOT NULL DEFAULT 0,
    interval INTEGER NOT NULL DEFAULT 0,
    ease_factor INTEGER NOT NULL DEFAULT 0,
    reps INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    remaining_steps INTEGER NOT NULL DEFAULT 0,

    -- FSRS memory state, carried but never interpreted
    stability REAL,
    difficulty REAL,
    desired_retention REAL,

    -- Add-on owned JSON object, '' when empty
    custom_data TEXT NOT NULL DEFAULT '',

    modified_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck_id);
CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(queue, due);

-- One row per answer; queue is the queue the card was in when answered
CREATE TABLE IF NOT EXISTS revlog (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
    reviewed_at INTEGER NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 4),
    queue TEXT NOT NULL,
    interval INTEGER NOT NULL,
    last_interval INTEGER NOT NULL,
    ease_factor INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_revlog_card ON revlog(card_id, reviewed_at);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: scheduler attribution on review rows
const MIGRATION_V2_UP: &str = r#"
-- 'engine' when the custom engine scheduled the answer, 'host' otherwise
ALTER TABLE revlog ADD COLUMN scheduled_by TEXT NOT NULL DEFAULT 'host';

UPDATE schema_version SET version = 2, applied_at = datetime('now');
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
