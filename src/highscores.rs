//! High score leaderboard (local)
//!
//! The local top 10 doubles as the cache of the global leaderboard and as its
//! fallback when the service is unreachable.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, Storage, StorageError};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// Maximum initials length
pub const MAX_INITIALS: usize = 3;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// 1-3 letters, A-Z
    pub initials: String,
    /// Player's score
    pub score: u64,
    /// Level reached
    pub level: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// Upper-case, keep A-Z only, cap at three letters. `None` if nothing is left.
pub fn sanitize_initials(raw: &str) -> Option<String> {
    let initials: String = raw
        .chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_uppercase())
        .take(MAX_INITIALS)
        .collect();
    (!initials.is_empty()).then_some(initials)
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "missile_commander_highscores";

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build from an arbitrary list: sorted by score desc, earlier first on ties, top 10
    pub fn from_entries(mut entries: Vec<HighScoreEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.timestamp.total_cmp(&b.timestamp))
        });
        entries.truncate(MAX_HIGH_SCORES);
        Self { entries }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Add a new score to the leaderboard (if it qualifies).
    /// Ties rank below the earlier entry.
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, initials: &str, score: u64, level: u32, timestamp: f64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry {
            initials: initials.to_string(),
            score,
            level,
            timestamp,
        };

        // Find insertion point (sorted descending by score)
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };

        // Trim to max size
        self.entries.truncate(MAX_HIGH_SCORES);

        Some(rank)
    }

    /// Check if the leaderboard is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load the persisted list; missing or corrupt data yields an empty board
    pub fn load(storage: &dyn Storage) -> Self {
        match persistence::load_json::<Vec<HighScoreEntry>>(storage, Self::STORAGE_KEY) {
            Ok(Some(entries)) => {
                log::info!("Loaded {} high scores", entries.len());
                Self::from_entries(entries)
            }
            Ok(None) => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
            Err(e) => {
                log::warn!("Discarding unreadable high scores: {}", e);
                Self::new()
            }
        }
    }

    /// Persist as a single list under one key
    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        persistence::save_json(storage, Self::STORAGE_KEY, &self.entries)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Format a timestamp as a relative date string
pub fn format_date(timestamp: f64, now: f64) -> String {
    let diff_ms = now - timestamp;
    let diff_mins = diff_ms / 60_000.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        match diff_days.floor() as i64 {
            1 => "Yesterday".to_string(),
            days if days < 7 => format!("{} days ago", days),
            days if days < 60 => format!("{} weeks ago", days / 7),
            days => format!("{} months ago", days / 30),
        }
    } else if diff_hours >= 1.0 {
        let hours = diff_hours.floor() as i64;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if diff_mins >= 1.0 {
        let mins = diff_mins.floor() as i64;
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}
