//! Data-driven game balance
//!
//! Every knob of the difficulty curve and scoring rules lives here so a
//! build can ship alternative balance as JSON without touching the sim.

use serde::{Deserialize, Serialize};

/// Difficulty curve and scoring constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Progression ===
    /// Level at which the difficulty curve tops out
    pub max_level: u32,
    /// Lives at game start
    pub starting_lives: u32,

    // === Waves ===
    /// Missile speed at progress ratio 0
    pub base_speed: f32,
    /// Missile speed at progress ratio 1
    pub max_speed: f32,
    /// Missiles per wave at progress ratio 0
    pub min_missiles: u32,
    /// Missiles per wave at progress ratio 1
    pub max_missiles: u32,
    /// Split probability at progress ratio 1
    pub max_split_chance: f32,
    /// Splitting is only enabled above this level
    pub split_min_level: u32,
    /// Split children fly at this fraction of the parent's speed
    pub split_speed_factor: f32,
    /// Split children launch this long after the parent (ms range)
    pub split_delay_ms: (f64, f64),
    /// Minimum time between two wave starts (ms)
    pub wave_cooldown_ms: f64,
    /// Delay before the first wave of a game (ms)
    pub first_wave_delay_ms: f64,
    /// Gap between consecutive missile launches at ratio 0 and 1 (ms)
    pub launch_interval_ms: (f64, f64),
    /// Latest any missile of a wave may launch at ratio 0 and 1 (ms)
    pub max_stagger_ms: (f64, f64),
    /// Delay from wave clear to level advance, at low and capped levels (ms)
    pub clear_delay_ms: (f64, f64),
    /// Levels at or below this use the short clear delay
    pub fast_clear_levels: u32,
    /// Delay from level advance to the next wave, at ratio 0 and 1 (ms)
    pub next_wave_delay_ms: (f64, f64),

    // === Power-ups ===
    /// Chance of a power-up on level advance at ratio 0 and 1
    pub power_up_chance: (f32, f32),
    /// Visible lifetime of an uncollected power-up (ms)
    pub power_up_lifetime_ms: f64,
    /// Fade-out after the visible lifetime (ms)
    pub power_up_fade_ms: f64,
    /// Flat score for collecting any power-up
    pub power_up_bonus: u64,

    // === Scoring ===
    /// Score for destroying a missile at level 0
    pub base_score: u64,
    /// Extra score per level for destroying a missile
    pub level_bonus: u64,
    /// Explosion radius scale used for missile kills
    pub kill_tolerance: f32,
    /// Multiplier ceiling
    pub max_multiplier: f32,
    /// How long a multiplier pickup stays in effect (ms)
    pub multiplier_window_ms: f64,

    // === Player ===
    /// Interceptor speed (units/s)
    pub interceptor_speed: f32,
    /// Interceptor speed factor while rapid fire is active
    pub rapid_fire_factor: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_level: 20,
            starting_lives: 3,

            base_speed: 2.0,
            max_speed: 5.0,
            min_missiles: 4,
            max_missiles: 12,
            max_split_chance: 0.4,
            split_min_level: 3,
            split_speed_factor: 0.8,
            split_delay_ms: (1000.0, 3000.0),
            wave_cooldown_ms: 5000.0,
            first_wave_delay_ms: 1000.0,
            launch_interval_ms: (1750.0, 700.0),
            max_stagger_ms: (12000.0, 6000.0),
            clear_delay_ms: (1500.0, 3000.0),
            fast_clear_levels: 5,
            next_wave_delay_ms: (1000.0, 3000.0),

            power_up_chance: (0.3, 0.8),
            power_up_lifetime_ms: 20_000.0,
            power_up_fade_ms: 3_000.0,
            power_up_bonus: 1000,

            base_score: 100,
            level_bonus: 10,
            kill_tolerance: 1.3,
            max_multiplier: 10.0,
            multiplier_window_ms: 15_000.0,

            interceptor_speed: 8.0,
            rapid_fire_factor: 1.5,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tuning: Tuning = serde_json::from_str(json)?;
        log::info!("Loaded tuning (max level {})", tuning.max_level);
        Ok(tuning)
    }

    /// Normalized difficulty position for a level, in [0, 1]
    pub fn progress_ratio(&self, level: u32) -> f32 {
        if self.max_level == 0 {
            return 1.0;
        }
        (level as f32 / self.max_level as f32).min(1.0)
    }
}
