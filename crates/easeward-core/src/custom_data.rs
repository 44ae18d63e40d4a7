//! Card Custom Data
//!
//! Every card carries a small JSON object that add-ons share. The engine owns
//! a single key (`"c"`, the success streak) and must leave everything else
//! exactly as it found it.
//!
//! Host limits:
//! - keys are shorter than 8 bytes
//! - the serialized object is at most 100 bytes
//! - an empty object is stored as the empty string

use serde_json::{Map, Value};

/// Key holding the consecutive-success counter
pub const STREAK_KEY: &str = "c";

/// Longest key the host accepts, in bytes
pub const MAX_KEY_BYTES: usize = 7;

/// Largest serialized document the host accepts, in bytes
pub const MAX_SERIALIZED_BYTES: usize = 100;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Custom data error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CustomDataError {
    /// Existing document is not valid JSON
    #[error("Malformed custom data: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Existing document is JSON but not an object
    #[error("Custom data must be a JSON object, got: {0}")]
    NotAnObject(String),
    /// Key longer than the host allows
    #[error("Custom data key '{0}' is longer than 7 bytes")]
    KeyTooLong(String),
    /// Serialized document larger than the host allows
    #[error("Custom data would be {0} bytes, limit is 100")]
    TooLarge(usize),
    /// Streak key holds something other than a non-negative integer
    #[error("Streak value is not a non-negative integer: {0}")]
    InvalidStreak(Value),
}

/// Custom data result type
pub type Result<T> = std::result::Result<T, CustomDataError>;

// ============================================================================
// DOCUMENT
// ============================================================================

/// Parsed custom data object
///
/// Backed by an insertion-ordered map so unrelated keys keep their position
/// across writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomData {
    entries: Map<String, Value>,
}

impl CustomData {
    /// Parse a stored document. Empty or whitespace-only input is an empty object.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_json::from_str::<Value>(raw)? {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(CustomDataError::NotAnObject(other.to_string())),
        }
    }

    /// Serialize for storage, enforcing the size limit
    pub fn to_json(&self) -> Result<String> {
        if self.entries.is_empty() {
            return Ok(String::new());
        }

        let json = serde_json::to_string(&self.entries)?;
        if json.len() > MAX_SERIALIZED_BYTES {
            return Err(CustomDataError::TooLarge(json.len()));
        }
        Ok(json)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or replace a key. Existing keys keep their position.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        if key.len() > MAX_KEY_BYTES {
            return Err(CustomDataError::KeyTooLong(key.to_string()));
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    /// Remove a key, keeping the order of what remains
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Current success streak. A missing key reads as zero.
    pub fn streak(&self) -> Result<u32> {
        match self.entries.get(STREAK_KEY) {
            None => Ok(0),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| CustomDataError::InvalidStreak(value.clone())),
        }
    }

    /// Whether the streak key is present at all (an explicit zero counts)
    pub fn has_streak(&self) -> bool {
        self.entries.contains_key(STREAK_KEY)
    }

    /// Set the streak, or drop the key with `None`
    pub fn set_streak(&mut self, streak: Option<u32>) {
        match streak {
            Some(value) => {
                self.entries.insert(STREAK_KEY.to_string(), Value::from(value));
            }
            None => {
                self.remove(STREAK_KEY);
            }
        }
    }
}

// ============================================================================
// MERGE
// ============================================================================

/// Write one key into a stored document and return the new serialization.
///
/// `None` removes the key. Every other key is preserved verbatim. On error the
/// caller's document is untouched, so it can keep using the old string.
pub fn merge(document: &str, key: &str, value: Option<Value>) -> Result<String> {
    let mut data = CustomData::parse(document)?;
    match value {
        Some(value) => data.set(key, value)?,
        None => {
            data.remove(key);
        }
    }
    data.to_json()
}

/// Write the streak key into a stored document. `None` removes it.
pub fn merge_streak(document: &str, streak: Option<u32>) -> Result<String> {
    merge(document, STREAK_KEY, streak.map(Value::from))
}

/// Read the streak from a stored document
pub fn read_streak(document: &str) -> Result<u32> {
    CustomData::parse(document)?.streak()
}
