//! Score and multiplier rules

use crate::tuning::Tuning;

/// Floor of the score multiplier
pub const MIN_MULTIPLIER: f32 = 1.0;

/// Points credited for `points` at multiplier `multiplier`
#[inline]
pub fn credit(points: u64, multiplier: f32) -> u64 {
    (points as f64 * multiplier.max(0.0) as f64).floor() as u64
}

/// Base points for destroying a missile with an explosion from `level`
pub fn kill_score(level: u32, tuning: &Tuning) -> u64 {
    tuning.base_score + level as u64 * tuning.level_bonus
}

/// Multiplier after stacking a pickup worth `value`
pub fn stack_multiplier(current: f32, value: f32, cap: f32) -> f32 {
    (current + value).min(cap)
}

/// Multiplier after one pickup worth `value` expires
pub fn decay_multiplier(current: f32, value: f32) -> f32 {
    (current - value).max(MIN_MULTIPLIER)
}
