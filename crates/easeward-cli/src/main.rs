//! Easeward CLI
//!
//! Command-line interface for grading cards in a collection, running the
//! streak backfill and checking deck options.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use easeward_core::{
    AnswerOutcome, BackfillOptions, CardRecord, ConfigTable, CustomData, GLOBAL_GROUP, NewCard,
    Queue, Rating, Resolution, Storage, backfill_streaks, default_config_path, read_streak,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Easeward - streak-aware review scheduling
#[derive(Parser)]
#[command(name = "easeward")]
#[command(author = "Easeward Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade cards, backfill streaks and check deck options")]
#[command(long_about = "Easeward schedules review cards on top of an SM-2 host scheduler.\n\nConsecutive successful answers earn an ease reward, and per-deck multiplier functions decide the next interval.")]
struct Cli {
    /// Collection database (defaults to the platform data directory)
    #[arg(long, global = true, env = "EASEWARD_DB")]
    db: Option<PathBuf>,

    /// Deck options table (defaults to the platform config directory)
    #[arg(long, global = true, env = "EASEWARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a card to a deck
    Add {
        /// Deck name
        #[arg(long)]
        deck: String,
        /// Queue: new, learning, review or relearning
        #[arg(long, default_value = "new")]
        queue: Queue,
        /// Current interval in days
        #[arg(long, default_value = "0")]
        interval: u32,
        /// Ease factor in permille (2500 = 2.5)
        #[arg(long, default_value = "0")]
        ease: u32,
        /// Due day number (defaults to today)
        #[arg(long)]
        due: Option<i32>,
        /// Custom data JSON object
        #[arg(long, default_value = "")]
        custom_data: String,
    },

    /// Show a card and its review log
    Show {
        /// Card id
        card_id: i64,
    },

    /// Show what each answer would do, without answering
    Preview {
        /// Card id
        card_id: i64,
    },

    /// Answer a card
    Answer {
        /// Card id
        card_id: i64,
        /// again, hard, good, easy (or 1-4)
        rating: Rating,
    },

    /// Rebuild streaks of review cards from the review log
    Backfill {
        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// Only process cards with a larger id
        #[arg(long)]
        resume_after: Option<i64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show collection statistics
    Stats,

    /// Deck options commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Validate the deck options table
    Check {
        /// Also show which group this deck resolves to
        #[arg(long)]
        deck: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let db = cli.db;
    let config = cli.config;

    match cli.command {
        Commands::Add {
            deck,
            queue,
            interval,
            ease,
            due,
            custom_data,
        } => run_add(db, deck, queue, interval, ease, due, custom_data),
        Commands::Show { card_id } => run_show(db, card_id),
        Commands::Preview { card_id } => run_preview(db, config, card_id),
        Commands::Answer { card_id, rating } => run_answer(db, config, card_id, rating),
        Commands::Backfill {
            dry_run,
            resume_after,
            json,
        } => run_backfill(db, dry_run, resume_after, json),
        Commands::Stats => run_stats(db),
        Commands::Config {
            command: ConfigCommands::Check { deck },
        } => run_config_check(config, deck),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn open_storage(db: Option<PathBuf>) -> anyhow::Result<Storage> {
    Storage::new(db).context("Failed to open collection")
}

fn config_path(config: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match config {
        Some(path) => Ok(path),
        None => Ok(default_config_path()?),
    }
}

/// Load the deck options table. A missing file is an empty table, so every
/// card falls back to host scheduling.
fn load_config(path: &Path) -> anyhow::Result<ConfigTable> {
    if !path.exists() {
        tracing::warn!(
            "No deck options at {}, cards will use host scheduling",
            path.display()
        );
        return Ok(ConfigTable::new());
    }
    ConfigTable::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn print_card(card: &CardRecord) {
    println!("{}: {}", "Card".white().bold(), card.id);
    println!("{}: {}", "Deck".white().bold(), card.deck_name);
    println!("{}: {}", "Queue".white().bold(), card.queue);
    println!("{}: {}", "Due".white().bold(), card.due);
    println!("{}: {} days", "Interval".white().bold(), card.interval);
    println!(
        "{}: {:.2}",
        "Ease".white().bold(),
        f64::from(card.ease_factor) / 1000.0
    );
    println!("{}: {}", "Reviews".white().bold(), card.reps);
    println!("{}: {}", "Lapses".white().bold(), card.lapses);
    let streak = match read_streak(&card.custom_data) {
        Ok(streak) => streak.to_string().normal(),
        Err(e) => format!("unreadable ({})", e).red(),
    };
    println!("{}: {}", "Streak".white().bold(), streak);
    if !card.custom_data.is_empty() {
        println!("{}: {}", "Custom Data".white().bold(), card.custom_data);
    }
}

fn describe_outcome(outcome: &AnswerOutcome) -> String {
    let update = outcome.update();
    let source = match outcome.defer_reason() {
        None => "easeward".green().to_string(),
        Some(reason) => format!("host: {}", reason).yellow().to_string(),
    };
    format!(
        "{:<10} {:>6} days  ease {:.2}  [{}]",
        update.queue.to_string(),
        update.interval,
        f64::from(update.ease_factor) / 1000.0,
        source
    )
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Run add command
fn run_add(
    db: Option<PathBuf>,
    deck: String,
    queue: Queue,
    interval: u32,
    ease: u32,
    due: Option<i32>,
    custom_data: String,
) -> anyhow::Result<()> {
    // Reject documents the engine could never read back
    CustomData::parse(&custom_data)?.to_json()?;

    let storage = open_storage(db)?;
    let card = storage.add_card(NewCard {
        deck,
        queue,
        due,
        interval,
        ease_factor: ease,
        custom_data,
        ..Default::default()
    })?;

    println!("{} {}", "Added card".green().bold(), card.id);
    Ok(())
}

/// Run show command
fn run_show(db: Option<PathBuf>, card_id: i64) -> anyhow::Result<()> {
    let storage = open_storage(db)?;
    let card = storage
        .get_card(card_id)?
        .with_context(|| format!("Card {} not found", card_id))?;

    println!("{}", "=== Card ===".cyan().bold());
    print_card(&card);

    let events = storage.review_events(card_id)?;
    println!();
    println!("{}", "=== Review Log ===".cyan().bold());
    if events.is_empty() {
        println!("{}", "No reviews yet.".dimmed());
    }
    for event in events {
        let scheduler = if event.scheduled_by_engine {
            "easeward".green()
        } else {
            "host".normal()
        };
        println!(
            "  {}  {:<5} {:<10} {:>5} -> {:<5} ease {:.2}  {}",
            event
                .reviewed_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            event.rating.as_str(),
            event.queue.as_str(),
            event.last_interval,
            event.interval,
            f64::from(event.ease_factor) / 1000.0,
            scheduler
        );
    }

    Ok(())
}

/// Run preview command
fn run_preview(db: Option<PathBuf>, config: Option<PathBuf>, card_id: i64) -> anyhow::Result<()> {
    let storage = open_storage(db)?;
    let table = load_config(&config_path(config)?)?;
    let today = storage.today()?;

    println!("{}", format!("=== Preview (day {}) ===", today).cyan().bold());
    for (rating, outcome) in storage.preview_card(card_id, &table, today)? {
        println!("  {:<5} {}", rating.as_str(), describe_outcome(&outcome));
    }
    Ok(())
}

/// Run answer command
fn run_answer(
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    card_id: i64,
    rating: Rating,
) -> anyhow::Result<()> {
    let storage = open_storage(db)?;
    let table = load_config(&config_path(config)?)?;
    let answered = storage.answer_card(card_id, rating, &table)?;

    println!(
        "{} {}",
        format!("Answered {}:", rating).green().bold(),
        describe_outcome(&answered.outcome)
    );
    println!();
    print_card(&answered.card);
    Ok(())
}

/// Run backfill command
fn run_backfill(
    db: Option<PathBuf>,
    dry_run: bool,
    resume_after: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let storage = open_storage(db)?;
    let report = backfill_streaks(
        &storage,
        BackfillOptions {
            dry_run,
            resume_after,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let title = if dry_run {
        "=== Streak Backfill (dry run) ==="
    } else {
        "=== Streak Backfill ==="
    };
    println!("{}", title.cyan().bold());
    println!("{}: {}", "Scanned".white().bold(), report.scanned);
    let updated_label = if dry_run { "Would update" } else { "Updated" };
    println!("{}: {}", updated_label.white().bold(), report.updated);
    println!("{}: {}", "Unchanged".white().bold(), report.unchanged);
    println!("{}: {}", "Without history".white().bold(), report.without_history);

    if !report.conflicts.is_empty() {
        println!(
            "{}: {} (re-run to pick them up)",
            "Conflicts".yellow().bold(),
            report.conflicts.len()
        );
    }
    if !report.failures.is_empty() {
        println!();
        println!("{}", "Failures:".red().bold());
        for (card_id, message) in &report.failures {
            println!("  card {}: {}", card_id, message);
        }
    }
    if let Some(last) = report.last_card_id {
        println!("{}: {}", "Last card".dimmed(), last);
    }

    Ok(())
}

/// Run stats command
fn run_stats(db: Option<PathBuf>) -> anyhow::Result<()> {
    let storage = open_storage(db)?;
    let stats = storage.get_stats()?;

    println!("{}", "=== Collection Statistics ===".cyan().bold());
    println!("{}: {}", "Today".white().bold(), storage.today()?);
    println!("{}: {}", "Decks".white().bold(), stats.decks);
    println!("{}: {}", "Cards".white().bold(), stats.cards);
    println!("{}: {}", "Review Cards".white().bold(), stats.review_cards);
    println!("{}: {}", "With Streak".white().bold(), stats.cards_with_streak);
    println!("{}: {}", "Reviews".white().bold(), stats.reviews);
    Ok(())
}

/// Run config check command
fn run_config_check(config: Option<PathBuf>, deck: Option<String>) -> anyhow::Result<()> {
    let path = config_path(config)?;
    println!("{}", "=== Deck Options ===".cyan().bold());
    println!("{}: {}", "File".white().bold(), path.display());

    if !path.exists() {
        println!("{}", "Not found: every card uses host scheduling.".yellow());
        return Ok(());
    }

    let table = ConfigTable::load(&path)?;
    let invalid: Vec<(&str, &str)> = table.invalid_groups().collect();
    println!(
        "{}: {} ({} invalid)",
        "Groups".white().bold(),
        table.len(),
        invalid.len()
    );
    for name in table.group_names() {
        let marker = if invalid.iter().any(|(group, _)| *group == name) {
            "invalid".red()
        } else {
            "ok".green()
        };
        println!("  {:<30} {}", name, marker);
    }
    if table.resolve(GLOBAL_GROUP).config().is_none() {
        println!(
            "{}",
            format!("No valid '{}' group: unlisted decks use host scheduling.", GLOBAL_GROUP)
                .yellow()
        );
    }

    if !invalid.is_empty() {
        println!();
        println!("{}", "Errors:".red().bold());
        for (group, message) in &invalid {
            println!("  {}: {}", group, message);
        }
    }

    if let Some(deck) = deck {
        println!();
        let resolved = match table.resolve(&deck) {
            Resolution::Deck(_) => format!("its own group '{}'", deck).green(),
            Resolution::Global(_) => format!("'{}'", GLOBAL_GROUP).green(),
            Resolution::Invalid { group, .. } => {
                format!("invalid group '{}', host scheduling", group).red()
            }
            Resolution::Missing => "nothing, host scheduling".yellow(),
        };
        println!("{} '{}' resolves to {}", "Deck".white().bold(), deck, resolved);
    }

    if invalid.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} invalid deck options group(s)", invalid.len())
    }
}
