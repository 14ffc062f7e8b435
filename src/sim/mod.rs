//! Simulation module
//!
//! All gameplay logic lives here. This module must stay headless:
//! - Time only advances through `update_game(dt)`
//! - Seeded RNG only
//! - No rendering, audio or platform dependencies; side effects leave as `GameEvent`s

pub mod ballistics;
pub mod collision;
pub mod director;
pub mod scheduler;
pub mod scoring;
pub mod state;
pub mod tick;

pub use director::{WaveDirector, WaveParams, spawn_power_up, start_wave};
pub use scheduler::{DueTask, Scheduler, Task};
pub use state::{
    ActiveEffects, City, EntityId, Explosion, ExplosionKind, GameEvent, GamePhase, GameState,
    Interceptor, Missile, PowerUp, PowerUpKind,
};
pub use tick::update_game;
