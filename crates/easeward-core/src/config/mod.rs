//! Deck Options
//!
//! Per-deck review configuration and its resolution:
//! - `ReviewConfig` (ease reward + scheduler settings)
//! - `ConfigTable`, a JSON object keyed by deck name
//! - Lookup order: exact deck name, then the `"Global Settings"` group,
//!   otherwise the host keeps full control of the card
//!
//! Groups are parsed one by one. A group that fails to parse stays in the
//! table as invalid: a deck that resolves to it is handed back to the host
//! rather than silently falling through to the global group.

mod ease_reward;
mod multiplier;

pub use ease_reward::{ABSOLUTE_MAXIMUM_EASE, ABSOLUTE_MINIMUM_EASE, EaseReward};
pub use multiplier::{Multiplier, MultiplierError, MultiplierFn};

use directories::ProjectDirs;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Reserved group every deck falls back to
pub const GLOBAL_GROUP: &str = "Global Settings";

/// Default maximum interval in days (100 years)
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36500;

/// File name of the deck options table inside the config directory
pub const CONFIG_FILE_NAME: &str = "deck-options.json";

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Config error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Table is not valid JSON
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Table root is not an object
    #[error("Config must be a JSON object keyed by deck name")]
    NotATable,
    /// Platform directories unavailable
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Config result type
pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// REVIEW CONFIG
// ============================================================================

/// Interval settings for review cards
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerConfig {
    pub enable_fuzz: bool,
    pub maximum_interval: u32,
    pub interval_modifier: f64,
    pub calculate_hard_multiplier: Multiplier,
    pub calculate_good_multiplier: Multiplier,
    pub calculate_easy_multiplier: Multiplier,
}

impl SchedulerConfig {
    /// Constant multipliers, no fuzz, modifier 1.0
    pub fn with_constants(hard: f64, good: f64, easy: f64) -> Self {
        Self {
            enable_fuzz: false,
            maximum_interval: DEFAULT_MAXIMUM_INTERVAL,
            interval_modifier: 1.0,
            calculate_hard_multiplier: Multiplier::Constant(hard),
            calculate_good_multiplier: Multiplier::Constant(good),
            calculate_easy_multiplier: Multiplier::Constant(easy),
        }
    }
}

/// Everything the engine needs for one deck
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfig {
    pub ease_reward: EaseReward,
    pub scheduler: SchedulerConfig,
}

// ============================================================================
// CONFIG TABLE
// ============================================================================

#[derive(Debug, Clone)]
enum GroupEntry {
    Valid(ReviewConfig),
    Invalid(String),
}

/// Where a deck's configuration came from
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    /// The deck has its own group
    Deck(&'a ReviewConfig),
    /// The deck uses the global group
    Global(&'a ReviewConfig),
    /// The group the deck resolves to failed to parse
    Invalid { group: &'a str, message: &'a str },
    /// No deck group and no global group
    Missing,
}

impl<'a> Resolution<'a> {
    /// The resolved config, if any
    pub fn config(&self) -> Option<&'a ReviewConfig> {
        match self {
            Resolution::Deck(config) | Resolution::Global(config) => Some(config),
            Resolution::Invalid { .. } | Resolution::Missing => None,
        }
    }
}

/// Deck options keyed by deck name
#[derive(Debug, Clone, Default)]
pub struct ConfigTable {
    groups: BTreeMap<String, GroupEntry>,
}

impl ConfigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table. Only a non-object root is fatal; bad groups are kept as invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(groups) = root else {
            return Err(ConfigError::NotATable);
        };

        let mut table = Self::new();
        for (name, value) in groups {
            let entry = match serde_json::from_value::<ReviewConfig>(value) {
                Ok(config) => GroupEntry::Valid(config),
                Err(e) => {
                    tracing::warn!("Deck options group '{}' is invalid: {}", name, e);
                    GroupEntry::Invalid(e.to_string())
                }
            };
            table.groups.insert(name, entry);
        }

        tracing::debug!("Loaded {} deck option groups", table.groups.len());
        Ok(table)
    }

    /// Load a table from disk
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Add or replace a group
    pub fn insert(&mut self, name: impl Into<String>, config: ReviewConfig) {
        self.groups.insert(name.into(), GroupEntry::Valid(config));
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Groups that failed to parse, with their error messages
    pub fn invalid_groups(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups.iter().filter_map(|(name, entry)| match entry {
            GroupEntry::Invalid(message) => Some((name.as_str(), message.as_str())),
            GroupEntry::Valid(_) => None,
        })
    }

    /// Resolve the configuration for a deck: exact name, then the global group
    pub fn resolve(&self, deck_name: &str) -> Resolution<'_> {
        let (group, entry) = match self.groups.get_key_value(deck_name) {
            Some(found) => found,
            None => match self.groups.get_key_value(GLOBAL_GROUP) {
                Some(found) => found,
                None => return Resolution::Missing,
            },
        };

        match entry {
            GroupEntry::Invalid(message) => Resolution::Invalid {
                group: group.as_str(),
                message: message.as_str(),
            },
            GroupEntry::Valid(config) if group == deck_name => Resolution::Deck(config),
            GroupEntry::Valid(config) => Resolution::Global(config),
        }
    }
}

/// Resolve the configuration for a deck, or `None` when the host should decide
pub fn resolve<'a>(deck_name: &str, table: &'a ConfigTable) -> Option<&'a ReviewConfig> {
    table.resolve(deck_name).config()
}

/// Platform default location of the deck options table
pub fn default_config_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("com", "easeward", "easeward").ok_or(ConfigError::NoConfigDir)?;
    Ok(proj_dirs.config_dir().join(CONFIG_FILE_NAME))
}
