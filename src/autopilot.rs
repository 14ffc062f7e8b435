//! Autopilot - the computer defends the cities
//!
//! Drives the attract mode on the title screen and the native headless demo.
//! It only ever acts through `GameState::launch_interceptor`, the same entry
//! point a player's click uses.

use glam::Vec2;

use crate::consts::{INTERCEPTOR_BLAST_RADIUS, LAUNCH_POINT};
use crate::sim::ballistics;
use crate::sim::{EntityId, GamePhase, GameState, Missile};

/// Default time between shots (ms)
pub const DEFAULT_FIRE_COOLDOWN_MS: f64 = 450.0;

#[derive(Debug, Clone)]
pub struct Autopilot {
    /// Minimum time between launches (ms)
    pub fire_cooldown_ms: f64,
    next_fire_ms: f64,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new(DEFAULT_FIRE_COOLDOWN_MS)
    }
}

impl Autopilot {
    pub fn new(fire_cooldown_ms: f64) -> Self {
        Self {
            fire_cooldown_ms,
            next_fire_ms: 0.0,
        }
    }

    /// Fire at most one interceptor if the cooldown allows
    pub fn update(&mut self, state: &mut GameState) -> Option<EntityId> {
        if state.phase != GamePhase::Playing {
            return None;
        }
        let now = state.now_ms();
        if now < self.next_fire_ms {
            return None;
        }
        let target = choose_target(state)?;
        let id = state.launch_interceptor(target)?;
        self.next_fire_ms = now + self.fire_cooldown_ms;
        log::trace!("Autopilot fired at ({:.2}, {:.2})", target.x, target.y);
        Some(id)
    }
}

/// Where to aim next.
///
/// The most dangerous missile (furthest along its arc) that no pending shot or
/// live blast already covers, led by the interceptor's flight time. With the
/// sky clear, the nearest uncollected power-up instead.
pub fn choose_target(state: &GameState) -> Option<Vec2> {
    let now = state.now_ms();
    let speed = state.tuning.interceptor_speed;

    let covered = |point: Vec2| {
        state
            .interceptors
            .iter()
            .filter(|i| !i.exploded)
            .any(|i| i.target.distance(point) <= INTERCEPTOR_BLAST_RADIUS)
            || state
                .explosions
                .iter()
                .any(|e| e.center.distance(point) <= e.max_radius)
    };

    let threat = state
        .missiles
        .iter()
        .map(|m| (progress(m, now), m))
        .filter(|(_, m)| !covered(m.pos))
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, m)| lead(m, now, speed));

    if threat.is_some() || !state.missiles.is_empty() {
        return threat;
    }

    state
        .power_ups
        .iter()
        .filter(|p| !p.collected())
        .min_by(|a, b| {
            a.pos
                .distance_squared(LAUNCH_POINT)
                .total_cmp(&b.pos.distance_squared(LAUNCH_POINT))
        })
        .map(|p| p.pos)
}

fn progress(missile: &Missile, now_ms: f64) -> f32 {
    ballistics::missile_progress(now_ms - missile.start_ms, missile.speed)
}

/// Missile position when an interceptor fired now would arrive
fn lead(missile: &Missile, now_ms: f64, interceptor_speed: f32) -> Vec2 {
    let flight = ballistics::interceptor_flight_ms(LAUNCH_POINT, missile.pos, interceptor_speed);
    let future = ballistics::missile_progress(now_ms + flight - missile.start_ms, missile.speed);
    ballistics::missile_position(missile.origin, missile.target, future)
}
