//! Flight paths and blast growth
//!
//! Positions are pure functions of elapsed time; nothing here integrates
//! velocity, so a late or irregular frame never drifts an entity off its path.

use glam::Vec2;

use crate::consts::TRAJECTORY_SCALE;

/// Apex of a missile's ballistic arc between `origin` and `target`
pub fn arc_apex(origin: Vec2, target: Vec2) -> Vec2 {
    Vec2::new(
        (origin.x + target.x) / 2.0,
        origin.y.max(target.y) + 2.0 + (target.x - origin.x).abs() * 0.15,
    )
}

/// Point on the quadratic Bezier origin -> apex -> target at `t` in [0, 1]
pub fn quadratic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
}

/// Trajectory progress of a missile; reaches 1.0 on arrival (not clamped)
pub fn missile_progress(elapsed_ms: f64, speed: f32) -> f32 {
    (elapsed_ms / 1000.0) as f32 * speed / TRAJECTORY_SCALE
}

/// Nominal flight time of a missile (ms)
pub fn missile_flight_ms(speed: f32) -> f64 {
    if speed <= 0.0 {
        return f64::INFINITY;
    }
    (TRAJECTORY_SCALE / speed) as f64 * 1000.0
}

/// Missile position along its arc at `progress` (clamped to the target)
pub fn missile_position(origin: Vec2, target: Vec2, progress: f32) -> Vec2 {
    let t = progress.clamp(0.0, 1.0);
    quadratic_bezier(origin, arc_apex(origin, target), target, t)
}

/// Straight-line flight time of an interceptor (ms)
pub fn interceptor_flight_ms(start: Vec2, target: Vec2, speed: f32) -> f64 {
    if speed <= 0.0 {
        return f64::INFINITY;
    }
    (start.distance(target) / speed) as f64 * 1000.0
}

/// Interceptor position after `elapsed_ms`, clamped at the target
pub fn interceptor_position(start: Vec2, target: Vec2, speed: f32, elapsed_ms: f64) -> Vec2 {
    let flight = interceptor_flight_ms(start, target, speed);
    if flight <= 0.0 {
        return target;
    }
    let t = (elapsed_ms / flight).clamp(0.0, 1.0) as f32;
    start.lerp(target, t)
}

/// Ease-out-quart: fast initial bloom that settles toward 1
#[inline]
pub fn ease_out_quart(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(4)
}

/// Current blast radius of an explosion `age_ms` after detonation
pub fn explosion_radius(max_radius: f32, age_ms: f64, duration_ms: f64) -> f32 {
    if duration_ms <= 0.0 {
        return max_radius;
    }
    let progress = (age_ms / duration_ms).clamp(0.0, 1.0) as f32;
    max_radius * ease_out_quart(progress)
}
