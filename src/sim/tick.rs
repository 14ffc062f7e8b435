//! Per-frame simulation step
//!
//! Called once per rendered frame with the real elapsed time. Each pass reads
//! the store as the previous pass left it, so nothing removed earlier in the
//! tick is processed again later in the same tick.

use super::collision;
use super::director;
use super::scoring;
use super::state::{ExplosionKind, GameEvent, GamePhase, GameState};
use super::ballistics::{interceptor_flight_ms, missile_position, missile_progress};
use crate::consts::*;

/// Advance the game by `dt_ms` of wall-clock time
pub fn update_game(state: &mut GameState, dt_ms: f64) {
    state.advance_clock(dt_ms);

    if state.phase != GamePhase::Playing {
        return;
    }

    // Loss check precedes everything else
    if state.all_cities_destroyed() {
        state.end_game();
        return;
    }

    director::run(state);
    expire_explosions(state);
    advance_missiles(state);
    advance_interceptors(state);
    resolve_missile_kills(state);
    collect_power_ups(state);
    expire_power_ups(state);
}

/// Drop finished blasts and refresh the display radius of the rest
fn expire_explosions(state: &mut GameState) {
    let now = state.now_ms();
    state.explosions.retain(|e| !e.is_expired(now));
    for explosion in &mut state.explosions {
        explosion.radius = explosion.radius_at(now);
    }
}

/// Move missiles along their arcs; resolve the ones that reached the ground
fn advance_missiles(state: &mut GameState) {
    let now = state.now_ms();
    let mut impacts = Vec::new();
    for missile in &mut state.missiles {
        let progress = missile_progress(now - missile.start_ms, missile.speed);
        missile.pos = missile_position(missile.origin, missile.target, progress);
        if progress >= 1.0 {
            impacts.push((missile.id, missile.target));
        }
    }

    for (id, target) in impacts {
        if !state.remove_missile(id) {
            continue;
        }
        state.add_explosion(target, GROUND_BLAST_RADIUS, ExplosionKind::Impact);
        let Some(city_id) = collision::city_hit(&state.cities, target) else {
            continue;
        };
        if state.effects.shield_active(now) {
            state.emit(GameEvent::ShieldAbsorbed { city_id });
            log::debug!("Shield absorbed hit on city {}", city_id);
        } else {
            state.destroy_city(city_id);
        }
    }
}

/// Fly interceptors; detonate on arrival, drop them one tick later
fn advance_interceptors(state: &mut GameState) {
    let now = state.now_ms();
    state.interceptors.retain(|i| !i.exploded);

    let mut arrivals = Vec::new();
    for interceptor in &mut state.interceptors {
        let flight = interceptor_flight_ms(interceptor.start, interceptor.target, interceptor.speed);
        if now - interceptor.start_ms >= flight {
            interceptor.exploded = true;
            arrivals.push(interceptor.target);
        }
    }

    for target in arrivals {
        state.add_explosion(target, INTERCEPTOR_BLAST_RADIUS, ExplosionKind::Interceptor);
    }
}

/// Blast vs missile: remove and score each caught missile exactly once
fn resolve_missile_kills(state: &mut GameState) {
    let now = state.now_ms();
    let hits = collision::missiles_in_blasts(
        &state.explosions,
        &state.missiles,
        now,
        state.tuning.kill_tolerance,
    );

    for (id, blast_level) in hits {
        if !state.remove_missile(id) {
            continue;
        }
        let level = blast_level.unwrap_or(state.level);
        let points = state.add_score(scoring::kill_score(level, &state.tuning));
        state.emit(GameEvent::MissileDestroyed { id, points });
    }
}

/// Blast vs power-up
fn collect_power_ups(state: &mut GameState) {
    for id in collision::power_ups_in_blasts(&state.explosions, &state.power_ups) {
        if state.collect_power_up(id).is_some() {
            state.add_score(state.tuning.power_up_bonus);
        }
    }
}

/// Fade out stale power-ups; drop collected ones after their pickup animation
fn expire_power_ups(state: &mut GameState) {
    let now = state.now_ms();
    let lifetime = state.tuning.power_up_lifetime_ms + state.tuning.power_up_fade_ms;
    state.power_ups.retain(|p| match p.collected_at {
        Some(at) => now - at <= COLLECTED_LINGER_MS,
        None => now - p.start_ms <= lifetime,
    });
}
