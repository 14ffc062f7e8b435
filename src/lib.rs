//! Missile Commander - a Missile-Command-style arcade shooter
//!
//! Core modules:
//! - `sim`: Simulation core (state store, wave director, per-frame step, scoring)
//! - `tuning`: Data-driven game balance
//! - `highscores` / `leaderboard`: Local top-10 cache and global leaderboard service
//! - `persistence`: Key/value storage backends
//! - `audio`: Sound cue playback
//! - `platform`: Browser/native clock and pointer mapping

pub mod audio;
pub mod autopilot;
pub mod highscores;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use highscores::HighScores;
pub use settings::Settings;
pub use tuning::Tuning;

use glam::Vec2;

/// Play-field geometry constants (world units, y up)
pub mod consts {
    use glam::Vec2;

    /// Number of cities laid out at game start
    pub const CITY_COUNT: usize = 6;
    /// Horizontal span the cities are spread across, centred on x = 0
    pub const CITY_SPAN: f32 = 16.0;
    /// Ground line (city footprint and missile target height)
    pub const GROUND_Y: f32 = -2.0;
    /// Half-extent of a city footprint used for impact tests
    pub const CITY_HIT_TOLERANCE: f32 = 0.8;

    /// Missiles launch from this height
    pub const MISSILE_START_Y: f32 = 10.0;
    /// Split missiles launch from this height
    pub const SPLIT_START_Y: f32 = 8.0;
    /// Missile launch x range is [-HALF_WIDTH, HALF_WIDTH]
    pub const MISSILE_SPAWN_HALF_WIDTH: f32 = 10.0;
    /// Random jitter (full width) applied to a missile's target x
    pub const TARGET_JITTER_X: f32 = 2.0;
    /// Random jitter applied above the ground line to a missile's target y
    pub const TARGET_JITTER_Y: f32 = 0.5;
    /// Divisor turning `elapsed * speed` into trajectory progress
    pub const TRAJECTORY_SCALE: f32 = 10.0;

    /// Fixed interceptor launch point, just below the ground line
    pub const LAUNCH_POINT: Vec2 = Vec2::new(0.0, -2.5);

    /// Max radius of an interceptor detonation
    pub const INTERCEPTOR_BLAST_RADIUS: f32 = 1.41;
    /// Max radius of a missile ground impact
    pub const GROUND_BLAST_RADIUS: f32 = 0.96;
    /// Lifetime of every explosion (ms)
    pub const EXPLOSION_DURATION_MS: f64 = 2500.0;

    /// Distance from an interceptor blast at which a power-up is collected
    pub const POWER_UP_PICKUP_RADIUS: f32 = 1.0;
    /// Power-ups spawn with x in [-HALF_WIDTH, HALF_WIDTH]
    pub const POWER_UP_SPAWN_HALF_WIDTH: f32 = 8.0;
    /// Power-ups spawn with y in this range
    pub const POWER_UP_SPAWN_Y: (f32, f32) = (2.0, 7.0);
    /// Collected power-ups linger this long for their pickup animation (ms)
    pub const COLLECTED_LINGER_MS: f64 = 600.0;
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// X positions of the fixed city layout, evenly spaced and symmetric about 0
pub fn city_layout() -> [f32; consts::CITY_COUNT] {
    let spacing = consts::CITY_SPAN / (consts::CITY_COUNT as f32 + 1.0);
    std::array::from_fn(|i| (i as f32 + 1.0) * spacing - consts::CITY_SPAN / 2.0)
}

/// Whether `point` lies inside the footprint of a city standing at `city_x`
#[inline]
pub fn in_city_footprint(city_x: f32, point: Vec2) -> bool {
    (city_x - point.x).abs() < consts::CITY_HIT_TOLERANCE
        && (consts::GROUND_Y - point.y).abs() < consts::CITY_HIT_TOLERANCE
}
