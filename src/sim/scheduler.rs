//! One-shot deferred tasks on the simulation clock
//!
//! Wave pacing and multiplier decay are "run this once, N ms from now".
//! Tasks are plain data applied by the store against its *current* state when
//! they come due. Every task is stamped with the epoch it was scheduled in;
//! `cancel_all` bumps the epoch so anything scheduled before a reset can never
//! reach the new game, even if a caller held on to it.

use glam::Vec2;

/// Work that can be deferred
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// Launch one staggered missile of the current wave
    LaunchMissile { origin_x: f32, speed: f32, split: bool },
    /// Launch the child of a split missile near its parent's origin
    LaunchSplit { near: Vec2, speed: f32 },
    /// Finish a cleared wave: advance the level and pace the next wave
    AdvanceLevel,
    /// Take back one multiplier pickup
    MultiplierDecay { amount: f32 },
}

impl Task {
    /// Whether this task still owes a missile to the current wave
    pub fn is_launch(&self) -> bool {
        matches!(self, Task::LaunchMissile { .. } | Task::LaunchSplit { .. })
    }
}

/// A task that has come due. Not `Clone`: it can be applied at most once.
#[derive(Debug, PartialEq)]
pub struct DueTask {
    pub epoch: u64,
    pub due_ms: f64,
    pub task: Task,
}

#[derive(Debug, Clone)]
struct Pending {
    seq: u64,
    epoch: u64,
    due_ms: f64,
    task: Task,
}

/// Deferred task queue keyed by game epoch
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    epoch: u64,
    next_seq: u64,
    pending: Vec<Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current epoch; tasks stamped with any other value are stale
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Schedule `task` to run once, `delay_ms` after `now_ms`
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            seq,
            epoch: self.epoch,
            due_ms: now_ms + delay_ms.max(0.0),
            task,
        });
    }

    /// Drop everything pending and invalidate any task already handed out
    pub fn cancel_all(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        self.epoch += 1;
        log::debug!("Scheduler reset to epoch {} ({} tasks dropped)", self.epoch, dropped);
    }

    /// Remove and return every task due at `now_ms`, earliest first.
    /// Ties run in scheduling order.
    pub fn drain_due(&mut self, now_ms: f64) -> Vec<DueTask> {
        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.due_ms <= now_ms {
                due.push(p.clone());
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.seq.cmp(&b.seq)));
        due.into_iter()
            .map(|p| DueTask {
                epoch: p.epoch,
                due_ms: p.due_ms,
                task: p.task,
            })
            .collect()
    }

    /// Number of pending tasks matching `pred`
    pub fn count_pending(&self, pred: impl Fn(&Task) -> bool) -> usize {
        self.pending.iter().filter(|p| pred(&p.task)).count()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
