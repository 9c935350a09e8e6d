//! Persistence adapters: save store, leaderboard store, review submitter.
//!
//! Each capability is a trait; implementations are injected at startup and
//! the engine only ever calls through the interfaces. The traits are
//! synchronous by design: the engine never suspends inside a handler, and
//! the session host keeps the per-session lock across the whole call.

use crate::world::{Character, RunStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from save and leaderboard stores.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Saved-game storage keyed by device id.
pub trait SaveStore: Send + Sync {
    fn save(&self, device_id: &str, record: &Value) -> Result<(), PersistError>;
    fn load(&self, device_id: &str) -> Result<Option<Value>, PersistError>;
    fn delete(&self, device_id: &str) -> Result<(), PersistError>;
}

/// Append-only record of Dragon slayers.
pub trait LeaderboardStore: Send + Sync {
    fn append(&self, entry: &LeaderboardEntry) -> Result<(), PersistError>;
    fn recent(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, PersistError>;
}

/// One leaderboard row: the character summary plus run statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub level: u32,
    pub difficulty: String,
    pub date: DateTime<Utc>,
    pub stats: RunStats,
    pub final_weapon: Option<String>,
    pub final_armor: Option<String>,
    pub companion: Option<String>,
}

impl LeaderboardEntry {
    pub fn from_character(character: &Character) -> Self {
        Self {
            name: character.name.clone(),
            level: character.level,
            difficulty: character.difficulty.name().to_string(),
            date: Utc::now(),
            stats: character.stats,
            final_weapon: character.equipped_weapon().map(|w| w.name.clone()),
            final_armor: character.equipped_armor().map(|a| a.name.clone()),
            companion: character.companion.as_ref().map(|c| c.name.clone()),
        }
    }

    /// One-line rendering for the leaderboard screen.
    pub fn summary_line(&self) -> String {
        format!(
            "{} - Level {} ({}) - {} monsters, {} quests - {}",
            self.name,
            self.level,
            self.difficulty,
            self.stats.monsters_defeated,
            self.stats.quests_completed,
            self.date.format("%Y-%m-%d")
        )
    }
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// In-memory save store; the default for tests and single-process play.
#[derive(Debug, Default)]
pub struct MemorySaveStore {
    records: Mutex<HashMap<String, Value>>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemorySaveStore {
    fn save(&self, device_id: &str, record: &Value) -> Result<(), PersistError> {
        if let Ok(mut records) = self.records.lock() {
            records.insert(device_id.to_string(), record.clone());
        }
        Ok(())
    }

    fn load(&self, device_id: &str) -> Result<Option<Value>, PersistError> {
        Ok(self
            .records
            .lock()
            .ok()
            .and_then(|records| records.get(device_id).cloned()))
    }

    fn delete(&self, device_id: &str) -> Result<(), PersistError> {
        if let Ok(mut records) = self.records.lock() {
            records.remove(device_id);
        }
        Ok(())
    }
}

/// In-memory leaderboard.
#[derive(Debug, Default)]
pub struct MemoryLeaderboard {
    entries: Mutex<Vec<LeaderboardEntry>>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for MemoryLeaderboard {
    fn append(&self, entry: &LeaderboardEntry) -> Result<(), PersistError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, PersistError> {
        Ok(self
            .entries
            .lock()
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// JSON-directory implementations
// ============================================================================

/// Save store writing one JSON file per device under a directory.
#[derive(Debug)]
pub struct JsonDirSaveStore {
    dir: PathBuf,
}

impl JsonDirSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, device_id: &str) -> PathBuf {
        let sanitized: String = device_id
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl SaveStore for JsonDirSaveStore {
    fn save(&self, device_id: &str, record: &Value) -> Result<(), PersistError> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(record)?;
        std::fs::write(self.path_for(device_id), content)?;
        Ok(())
    }

    fn load(&self, device_id: &str) -> Result<Option<Value>, PersistError> {
        let path = self.path_for(device_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn delete(&self, device_id: &str) -> Result<(), PersistError> {
        let path = self.path_for(device_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Leaderboard stored as a JSON array in a single file.
#[derive(Debug)]
pub struct JsonLeaderboard {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLeaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<LeaderboardEntry>, PersistError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl LeaderboardStore for JsonLeaderboard {
    fn append(&self, entry: &LeaderboardEntry) -> Result<(), PersistError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        entries.push(entry.clone());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, PersistError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.into_iter().rev().take(limit).collect())
    }
}

// ============================================================================
// Reviews
// ============================================================================

/// Errors from the review submitter.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("rating must be between 1 and 5")]
    RatingOutOfRange,

    #[error("review text exceeds 2000 characters")]
    TextTooLong,

    #[error("review submission is not configured")]
    NotConfigured,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub const REVIEW_TEXT_LIMIT: usize = 2000;

/// A validated review: rating in 1..=5, text capped at 2000 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub rating: u8,
    pub text: String,
}

impl Review {
    pub fn new(rating: u8, text: impl Into<String>) -> Result<Self, ReviewError> {
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::RatingOutOfRange);
        }
        let text = text.into();
        if text.chars().count() > REVIEW_TEXT_LIMIT {
            return Err(ReviewError::TextTooLong);
        }
        Ok(Self { rating, text })
    }
}

/// Reference to a submitted review artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewReceipt {
    pub path: String,
}

/// Writes a review as a new text artifact in an external document store.
pub trait ReviewSubmitter: Send + Sync {
    fn submit(&self, review: &Review) -> Result<ReviewReceipt, ReviewError>;
}

/// The stand-in used when no document store is configured: every submit
/// fails explicitly, gameplay is unaffected.
#[derive(Debug, Default)]
pub struct UnconfiguredReviews;

impl ReviewSubmitter for UnconfiguredReviews {
    fn submit(&self, _review: &Review) -> Result<ReviewReceipt, ReviewError> {
        Err(ReviewError::NotConfigured)
    }
}

/// Writes each review as a timestamped text file under a directory.
#[derive(Debug)]
pub struct DirReviewSubmitter {
    dir: PathBuf,
}

impl DirReviewSubmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ReviewSubmitter for DirReviewSubmitter {
    fn submit(&self, review: &Review) -> Result<ReviewReceipt, ReviewError> {
        std::fs::create_dir_all(&self.dir)?;
        let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
        let uid = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{timestamp}_{}_{}of5.txt", &uid[..8], review.rating);
        let mut content = format!("Rating: {}/5\nTimestamp: {timestamp}\n", review.rating);
        if !review.text.trim().is_empty() {
            content.push('\n');
            content.push_str(review.text.trim());
            content.push('\n');
        }
        let path = self.dir.join(&name);
        std::fs::write(&path, content)?;
        Ok(ReviewReceipt {
            path: path.to_string_lossy().into_owned(),
        })
    }
}
