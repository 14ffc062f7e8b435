//! Collision tests between blasts and the things they can reach

use glam::Vec2;

use super::state::{City, Explosion, ExplosionKind, Missile, PowerUp};
use crate::consts::POWER_UP_PICKUP_RADIUS;
use crate::in_city_footprint;

/// Whether a blast of `radius` (scaled by `tolerance`) reaches `point`
#[inline]
pub fn blast_reaches(center: Vec2, radius: f32, tolerance: f32, point: Vec2) -> bool {
    center.distance(point) <= radius * tolerance
}

/// Missiles caught by any live explosion this tick, paired with the level of
/// the first blast that reached them. Each missile appears at most once.
pub fn missiles_in_blasts(
    explosions: &[Explosion],
    missiles: &[Missile],
    now_ms: f64,
    tolerance: f32,
) -> Vec<(u32, Option<u32>)> {
    let mut hits: Vec<(u32, Option<u32>)> = Vec::new();
    for explosion in explosions {
        let radius = explosion.radius_at(now_ms);
        for missile in missiles {
            if hits.iter().any(|(id, _)| *id == missile.id) {
                continue;
            }
            if blast_reaches(explosion.center, radius, tolerance, missile.pos) {
                hits.push((missile.id, explosion.level));
            }
        }
    }
    hits
}

/// Uncollected power-ups within pickup range of an interceptor blast
pub fn power_ups_in_blasts(explosions: &[Explosion], power_ups: &[PowerUp]) -> Vec<u32> {
    power_ups
        .iter()
        .filter(|p| !p.collected())
        .filter(|p| {
            explosions
                .iter()
                .filter(|e| e.kind == ExplosionKind::Interceptor)
                .any(|e| e.center.distance(p.pos) <= POWER_UP_PICKUP_RADIUS)
        })
        .map(|p| p.id)
        .collect()
}

/// First standing city whose footprint contains `point`
pub fn city_hit(cities: &[City], point: Vec2) -> Option<u32> {
    cities
        .iter()
        .find(|c| !c.destroyed && in_city_footprint(c.x, point))
        .map(|c| c.id)
}
