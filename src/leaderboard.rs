//! Global leaderboard collaborator and the high-score service built on it
//!
//! The remote store is abstracted behind `Leaderboard`. `HighScoreService`
//! wraps one together with local storage: every remote failure degrades to
//! the locally cached top 10 instead of surfacing to gameplay.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::highscores::{HighScoreEntry, HighScores, MAX_HIGH_SCORES};
use crate::persistence::{Storage, StorageError};
use crate::platform;

/// What the player sends after entering initials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub initials: String,
    pub score: u64,
    pub level: u32,
}

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard service unavailable")]
    Unavailable,
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Push-update callback, receives the refreshed top list
pub type LeaderboardCallback = Rc<dyn Fn(&[HighScoreEntry])>;

/// Remote leaderboard contract.
///
/// `top_scores` is ordered by score descending, ties broken by earlier submission.
#[allow(async_fn_in_trait)]
pub trait Leaderboard {
    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), LeaderboardError>;

    async fn top_scores(&self, limit: usize) -> Result<Vec<HighScoreEntry>, LeaderboardError>;

    /// True if fewer than 10 scores exist or `score` beats the 10th
    async fn check_global_high_score(&self, score: u64) -> Result<bool, LeaderboardError> {
        let top = self.top_scores(MAX_HIGH_SCORES).await?;
        if top.len() < MAX_HIGH_SCORES {
            return Ok(true);
        }
        Ok(top.last().is_none_or(|tenth| score > tenth.score))
    }

    fn subscribe(&self, callback: LeaderboardCallback) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// In-process leaderboard; stands in for the remote service natively and in tests
#[derive(Default)]
pub struct InMemoryLeaderboard {
    // Submission order, oldest first
    scores: RefCell<Vec<HighScoreEntry>>,
    subscribers: RefCell<Vec<(SubscriptionId, LeaderboardCallback)>>,
    next_subscription: Cell<u64>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.borrow().is_empty()
    }

    fn ranked(&self, limit: usize) -> Vec<HighScoreEntry> {
        let mut ranked = self.scores.borrow().clone();
        // Stable sort keeps submission order among equal scores
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(limit);
        ranked
    }

    fn notify(&self) {
        let top = self.ranked(MAX_HIGH_SCORES);
        // Snapshot so callbacks may (un)subscribe
        let callbacks: Vec<LeaderboardCallback> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(&top);
        }
    }
}

impl Leaderboard for InMemoryLeaderboard {
    async fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), LeaderboardError> {
        if submission.initials.is_empty() {
            return Err(LeaderboardError::Rejected("empty initials".into()));
        }
        self.scores.borrow_mut().push(HighScoreEntry {
            initials: submission.initials.clone(),
            score: submission.score,
            level: submission.level,
            timestamp: platform::unix_time_ms(),
        });
        log::debug!("Leaderboard accepted {} ({})", submission.initials, submission.score);
        self.notify();
        Ok(())
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<HighScoreEntry>, LeaderboardError> {
        Ok(self.ranked(limit))
    }

    fn subscribe(&self, callback: LeaderboardCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get());
        self.next_subscription.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, callback));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.borrow_mut();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }
}

/// Leaderboard that is never reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineLeaderboard;

impl Leaderboard for OfflineLeaderboard {
    async fn submit_score(&self, _submission: &ScoreSubmission) -> Result<(), LeaderboardError> {
        Err(LeaderboardError::Unavailable)
    }

    async fn top_scores(&self, _limit: usize) -> Result<Vec<HighScoreEntry>, LeaderboardError> {
        Err(LeaderboardError::Unavailable)
    }

    fn subscribe(&self, _callback: LeaderboardCallback) -> SubscriptionId {
        SubscriptionId(0)
    }

    fn unsubscribe(&self, _id: SubscriptionId) -> bool {
        false
    }
}

/// Remote leaderboard plus local cache/fallback.
///
/// Methods take `&self` and never hold a storage borrow across an await, so
/// the service can be shared through an `Rc` with in-flight futures.
pub struct HighScoreService<L> {
    leaderboard: L,
    storage: RefCell<Box<dyn Storage>>,
}

impl<L: Leaderboard> HighScoreService<L> {
    pub fn new(leaderboard: L, storage: Box<dyn Storage>) -> Self {
        Self {
            leaderboard,
            storage: RefCell::new(storage),
        }
    }

    pub fn leaderboard(&self) -> &L {
        &self.leaderboard
    }

    /// Locally cached top 10
    pub fn local_scores(&self) -> HighScores {
        HighScores::load(&**self.storage.borrow())
    }

    fn cache(&self, scores: &HighScores) {
        if let Err(e) = scores.save(&mut **self.storage.borrow_mut()) {
            log::warn!("Could not cache high scores locally: {}", e);
        }
    }

    /// Whether `score` makes the global top 10; local cache decides when offline
    pub async fn check_high_score(&self, score: u64) -> bool {
        match self.leaderboard.check_global_high_score(score).await {
            Ok(qualifies) => qualifies,
            Err(e) => {
                log::warn!("Global high score check failed, using local list: {}", e);
                self.local_scores().qualifies(score)
            }
        }
    }

    /// Persist a submission and return the refreshed top 10
    pub async fn submit_high_score(&self, submission: &ScoreSubmission) -> Vec<HighScoreEntry> {
        match self.leaderboard.submit_score(submission).await {
            Ok(()) => {
                log::info!(
                    "Submitted high score {} for {}",
                    submission.score,
                    submission.initials
                );
                self.load_high_scores().await
            }
            Err(e) => {
                log::warn!("Global submission failed, saving locally: {}", e);
                let mut local = self.local_scores();
                local.add_score(
                    &submission.initials,
                    submission.score,
                    submission.level,
                    platform::unix_time_ms(),
                );
                self.cache(&local);
                local.entries
            }
        }
    }

    /// Top 10 from the service (cached locally), or the local cache when offline
    pub async fn load_high_scores(&self) -> Vec<HighScoreEntry> {
        match self.leaderboard.top_scores(MAX_HIGH_SCORES).await {
            Ok(entries) => {
                let scores = HighScores::from_entries(entries);
                self.cache(&scores);
                scores.entries
            }
            Err(e) => {
                log::warn!("Could not load global high scores, using local list: {}", e);
                self.local_scores().entries
            }
        }
    }
}
