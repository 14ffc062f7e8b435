//! Wave/level director
//!
//! Per level: Idle -> WaveInProgress -> (clear pending) -> Idle at the next
//! level. Everything delayed goes through the store's scheduler so a reset
//! invalidates it in one step.

use glam::Vec2;
use rand::Rng;

use super::scheduler::{DueTask, Task};
use super::state::{EntityId, GameEvent, GameState, PowerUpKind};
use crate::consts::*;
use crate::lerp;
use crate::tuning::Tuning;

/// Wave pacing state carried between ticks
#[derive(Debug, Clone, Default)]
pub struct WaveDirector {
    pub wave_in_progress: bool,
    /// Wave cleared, level advance scheduled
    pub clear_pending: bool,
    /// When the last wave began (sim ms)
    pub last_wave_ms: Option<f64>,
    /// No wave may start before this (sim ms)
    pub next_wave_not_before: f64,
}

impl WaveDirector {
    pub fn new(first_wave_at: f64) -> Self {
        Self {
            next_wave_not_before: first_wave_at,
            ..Default::default()
        }
    }
}

/// Difficulty-scaled parameters for one wave
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub speed: f32,
    pub missile_count: u32,
    pub split_chance: f32,
    pub launch_interval_ms: f64,
    pub max_stagger_ms: f64,
}

impl WaveParams {
    pub fn for_level(level: u32, tuning: &Tuning) -> Self {
        let ratio = tuning.progress_ratio(level);
        Self {
            speed: missile_speed(level, tuning),
            missile_count: missile_count(level, tuning),
            split_chance: split_chance(level, tuning),
            launch_interval_ms: lerp(
                tuning.launch_interval_ms.0 as f32,
                tuning.launch_interval_ms.1 as f32,
                ratio,
            ) as f64,
            max_stagger_ms: lerp(tuning.max_stagger_ms.0 as f32, tuning.max_stagger_ms.1 as f32, ratio)
                as f64,
        }
    }
}

pub fn missile_speed(level: u32, tuning: &Tuning) -> f32 {
    lerp(tuning.base_speed, tuning.max_speed, tuning.progress_ratio(level))
}

pub fn missile_count(level: u32, tuning: &Tuning) -> u32 {
    let ratio = tuning.progress_ratio(level);
    let span = tuning.max_missiles.saturating_sub(tuning.min_missiles) as f32;
    tuning.min_missiles + (span * ratio).floor() as u32
}

/// Chance that a missile splits; zero until splitting unlocks
pub fn split_chance(level: u32, tuning: &Tuning) -> f32 {
    if level <= tuning.split_min_level {
        return 0.0;
    }
    tuning.max_split_chance * tuning.progress_ratio(level)
}

/// Delay from wave clear to level advance
pub fn clear_delay_ms(level: u32, tuning: &Tuning) -> f64 {
    let (fast, slow) = tuning.clear_delay_ms;
    if level <= tuning.fast_clear_levels {
        return fast;
    }
    let range = tuning.max_level.saturating_sub(tuning.fast_clear_levels).max(1) as f64;
    let t = ((level - tuning.fast_clear_levels) as f64 / range).min(1.0);
    fast + (slow - fast) * t
}

/// Delay from level advance to the next wave
pub fn next_wave_delay_ms(level: u32, tuning: &Tuning) -> f64 {
    let (fast, slow) = tuning.next_wave_delay_ms;
    fast + (slow - fast) * tuning.progress_ratio(level) as f64
}

pub fn power_up_chance(level: u32, tuning: &Tuning) -> f32 {
    lerp(tuning.power_up_chance.0, tuning.power_up_chance.1, tuning.progress_ratio(level))
}

/// Launch offsets for a wave: growing with index, never past the cap.
/// `jitter` yields factors applied to each gap.
pub fn stagger_offsets(params: &WaveParams, mut jitter: impl FnMut() -> f64) -> Vec<f64> {
    let mut offsets = Vec::with_capacity(params.missile_count as usize);
    let mut t = 0.0;
    for i in 0..params.missile_count {
        if i > 0 {
            t = (t + params.launch_interval_ms * jitter()).min(params.max_stagger_ms);
        }
        offsets.push(t);
    }
    offsets
}

/// Run the director for one tick: due tasks first, then the wave state machine
pub fn run(state: &mut GameState) {
    let now = state.now_ms();
    for due in state.scheduler.drain_due(now) {
        apply_task(state, due);
    }

    let pending_launches = state.scheduler.count_pending(Task::is_launch);
    let director = &state.director;

    if director.wave_in_progress && state.missiles.is_empty() && pending_launches == 0 {
        let delay = clear_delay_ms(state.level, &state.tuning);
        state.director.wave_in_progress = false;
        state.director.clear_pending = true;
        state.scheduler.schedule(now, delay, Task::AdvanceLevel);
        log::info!("Wave {} cleared, advancing in {} ms", state.level, delay);
        return;
    }

    let cooled_down = director
        .last_wave_ms
        .is_none_or(|t| now - t >= state.tuning.wave_cooldown_ms);
    if !director.wave_in_progress
        && !director.clear_pending
        && now >= director.next_wave_not_before
        && cooled_down
    {
        start_wave(state);
    }
}

/// Apply one due task to the current state. Stale tasks are dropped.
pub fn apply_task(state: &mut GameState, due: DueTask) {
    if due.epoch != state.scheduler.epoch() {
        log::debug!("Dropping stale task {:?} from epoch {}", due.task, due.epoch);
        return;
    }
    match due.task {
        Task::LaunchMissile {
            origin_x,
            speed,
            split,
        } => launch_missile(state, origin_x, speed, split),
        Task::LaunchSplit { near, speed } => launch_split(state, near, speed),
        Task::AdvanceLevel => advance_level(state),
        Task::MultiplierDecay { amount } => state.decay_multiplier(amount),
    }
}

/// Begin a wave for the current level. No-op (false) with no city left to target.
pub fn start_wave(state: &mut GameState) -> bool {
    if state.all_cities_destroyed() {
        return false;
    }
    let now = state.now_ms();
    let level = state.level;
    let params = WaveParams::for_level(level, &state.tuning);
    let offsets = {
        let rng = state.rng();
        stagger_offsets(&params, || rng.random_range(0.75..1.25))
    };

    for offset in offsets {
        let rng = state.rng();
        let origin_x = rng.random_range(-MISSILE_SPAWN_HALF_WIDTH..MISSILE_SPAWN_HALF_WIDTH);
        let split = params.split_chance > 0.0 && rng.random::<f32>() < params.split_chance;
        if offset <= 0.0 {
            launch_missile(state, origin_x, params.speed, split);
        } else {
            state.scheduler.schedule(
                now,
                offset,
                Task::LaunchMissile {
                    origin_x,
                    speed: params.speed,
                    split,
                },
            );
        }
    }

    state.director.wave_in_progress = true;
    state.director.last_wave_ms = Some(now);
    state.emit(GameEvent::WaveStarted {
        level,
        missiles: params.missile_count,
    });
    log::info!(
        "Wave {}: {} missiles at speed {:.2}, split chance {:.2}",
        level,
        params.missile_count,
        params.speed,
        params.split_chance
    );
    true
}

/// Target near a random standing city, on the ground line
fn pick_target(state: &mut GameState) -> Option<Vec2> {
    let standing: Vec<f32> = state.active_cities().map(|c| c.x).collect();
    if standing.is_empty() {
        return None;
    }
    let rng = state.rng();
    let x = standing[rng.random_range(0..standing.len())];
    Some(Vec2::new(
        x + (rng.random::<f32>() - 0.5) * TARGET_JITTER_X,
        GROUND_Y + rng.random::<f32>() * TARGET_JITTER_Y,
    ))
}

fn launch_missile(state: &mut GameState, origin_x: f32, speed: f32, split: bool) {
    let Some(target) = pick_target(state) else {
        return;
    };
    let origin = Vec2::new(origin_x, MISSILE_START_Y);
    let id = state.add_missile(origin, target, speed);
    state.emit(GameEvent::MissileLaunched { id });

    if split {
        let (lo, hi) = state.tuning.split_delay_ms;
        let delay = state.rng().random_range(lo..hi);
        let base = state.tuning.base_speed;
        let child_speed = base + (speed - base) * state.tuning.split_speed_factor;
        let now = state.now_ms();
        state.scheduler.schedule(
            now,
            delay,
            Task::LaunchSplit {
                near: origin,
                speed: child_speed,
            },
        );
    }
}

fn launch_split(state: &mut GameState, near: Vec2, speed: f32) {
    let Some(target) = pick_target(state) else {
        return;
    };
    let dx = (state.rng().random::<f32>() - 0.5) * 2.0;
    let origin = Vec2::new(near.x + dx, SPLIT_START_Y);
    let id = state.add_missile(origin, target, speed);
    state.emit(GameEvent::MissileLaunched { id });
    log::debug!("Missile split into {}", id);
}

fn advance_level(state: &mut GameState) {
    let finished = state.level;
    state.next_level();
    state.emit(GameEvent::LevelComplete { level: finished });

    let chance = power_up_chance(state.level, &state.tuning);
    if state.rng().random::<f32>() < chance {
        spawn_power_up(state);
    }

    let now = state.now_ms();
    state.director.clear_pending = false;
    state.director.next_wave_not_before = now + next_wave_delay_ms(state.level, &state.tuning);
}

/// Roll a power-up kind: ~50% multiplier, ~30% shield, ~20% rapid fire
pub fn roll_power_up_kind(roll: f32) -> PowerUpKind {
    if roll < 0.5 {
        PowerUpKind::ScoreMultiplier
    } else if roll < 0.8 {
        PowerUpKind::Shield
    } else {
        PowerUpKind::RapidFire
    }
}

/// Magnitude of a power-up; more generous further into the game
pub fn power_up_value(kind: PowerUpKind, level: u32, tuning: &Tuning) -> f32 {
    let ratio = tuning.progress_ratio(level);
    match kind {
        PowerUpKind::ScoreMultiplier => 2.0 + (ratio * 2.0).floor(),
        PowerUpKind::Shield => 5000.0 * (1.0 + ratio),
        PowerUpKind::RapidFire => 8000.0 * (1.0 + ratio),
    }
}

/// Spawn one power-up somewhere in the upper play field
pub fn spawn_power_up(state: &mut GameState) -> EntityId {
    let rng = state.rng();
    let pos = Vec2::new(
        rng.random_range(-POWER_UP_SPAWN_HALF_WIDTH..POWER_UP_SPAWN_HALF_WIDTH),
        rng.random_range(POWER_UP_SPAWN_Y.0..POWER_UP_SPAWN_Y.1),
    );
    let kind = roll_power_up_kind(rng.random());
    let value = power_up_value(kind, state.level, &state.tuning);
    let id = state.add_power_up(pos, kind, value);
    log::info!("Spawned {:?} power-up ({})", kind, value);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::GamePhase;
    use proptest::prelude::*;

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.start_game();
        state
    }

    #[test]
    fn test_difficulty_endpoints() {
        let tuning = Tuning::default();
        assert_eq!(missile_count(1, &tuning), 4);
        assert_eq!(missile_count(20, &tuning), 12);
        assert_eq!(missile_count(50, &tuning), 12);
        assert_eq!(split_chance(3, &tuning), 0.0);
        assert!(split_chance(4, &tuning) > 0.0);
        assert!((split_chance(20, &tuning) - 0.4).abs() < 1e-6);
        assert!((missile_speed(20, &tuning) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_clear_delay_scales_with_level() {
        let tuning = Tuning::default();
        assert_eq!(clear_delay_ms(1, &tuning), 1500.0);
        assert_eq!(clear_delay_ms(5, &tuning), 1500.0);
        assert!(clear_delay_ms(10, &tuning) > 1500.0);
        assert_eq!(clear_delay_ms(20, &tuning), 3000.0);
        assert_eq!(clear_delay_ms(40, &tuning), 3000.0);
        assert!(next_wave_delay_ms(1, &tuning) < next_wave_delay_ms(15, &tuning));
    }

    #[test]
    fn test_stagger_grows_then_caps() {
        let params = WaveParams::for_level(1, &Tuning::default());
        let offsets = stagger_offsets(&params, || 1.0);
        assert_eq!(offsets.len(), params.missile_count as usize);
        assert_eq!(offsets[0], 0.0);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
        assert!(offsets.iter().all(|&o| o <= params.max_stagger_ms));

        let many = WaveParams {
            missile_count: 40,
            ..params
        };
        let offsets = stagger_offsets(&many, || 1.0);
        assert_eq!(*offsets.last().unwrap(), many.max_stagger_ms);
    }

    #[test]
    fn test_faster_cadence_at_higher_levels() {
        let tuning = Tuning::default();
        let low = WaveParams::for_level(1, &tuning);
        let high = WaveParams::for_level(18, &tuning);
        assert!(high.launch_interval_ms < low.launch_interval_ms);
        assert!(high.max_stagger_ms < low.max_stagger_ms);
    }

    #[test]
    fn test_power_up_weights() {
        assert_eq!(roll_power_up_kind(0.0), PowerUpKind::ScoreMultiplier);
        assert_eq!(roll_power_up_kind(0.49), PowerUpKind::ScoreMultiplier);
        assert_eq!(roll_power_up_kind(0.5), PowerUpKind::Shield);
        assert_eq!(roll_power_up_kind(0.79), PowerUpKind::Shield);
        assert_eq!(roll_power_up_kind(0.8), PowerUpKind::RapidFire);
    }

    #[test]
    fn test_power_up_values_grow() {
        let tuning = Tuning::default();
        for kind in [PowerUpKind::ScoreMultiplier, PowerUpKind::Shield, PowerUpKind::RapidFire] {
            assert!(power_up_value(kind, 20, &tuning) > power_up_value(kind, 1, &tuning));
        }
        assert_eq!(power_up_value(PowerUpKind::ScoreMultiplier, 1, &tuning), 2.0);
    }

    #[test]
    fn test_first_wave_waits_for_delay() {
        let mut state = playing(3);
        run(&mut state);
        assert!(!state.wave_in_progress());
        state.advance_clock(1000.0);
        run(&mut state);
        assert!(state.wave_in_progress());
        // First missile goes immediately, the rest are scheduled
        assert_eq!(state.missiles.len(), 1);
        assert_eq!(state.scheduler.count_pending(Task::is_launch), 3);
    }

    #[test]
    fn test_wave_targets_standing_cities_only() {
        let mut state = playing(11);
        let standing = state.cities[4].x;
        let ids: Vec<_> = state.cities.iter().map(|c| c.id).collect();
        for (i, id) in ids.into_iter().enumerate() {
            if i != 4 {
                state.destroy_city(id);
            }
        }
        state.advance_clock(1000.0);
        run(&mut state);
        for _ in 0..20 {
            state.advance_clock(1000.0);
            run(&mut state);
        }
        assert!(!state.missiles.is_empty());
        for m in &state.missiles {
            assert!((m.target.x - standing).abs() <= TARGET_JITTER_X / 2.0 + 1e-4);
            assert!(m.target.y >= GROUND_Y && m.target.y <= GROUND_Y + TARGET_JITTER_Y);
        }
    }

    #[test]
    fn test_no_wave_without_cities() {
        let mut state = playing(5);
        let ids: Vec<_> = state.cities.iter().map(|c| c.id).collect();
        for id in ids {
            state.destroy_city(id);
        }
        assert!(!start_wave(&mut state));
        assert!(state.missiles.is_empty());
        assert!(!state.wave_in_progress());
    }

    #[test]
    fn test_wave_clear_advances_level() {
        let mut state = playing(9);
        state.advance_clock(1000.0);
        run(&mut state);
        assert!(state.wave_in_progress());

        // Knock out the live missile and every scheduled launch
        state.missiles.clear();
        state.scheduler.cancel_all();
        run(&mut state);
        assert!(!state.wave_in_progress());
        assert!(state.director.clear_pending);
        assert_eq!(state.level, 1);

        state.advance_clock(1500.0);
        run(&mut state);
        assert_eq!(state.level, 2);
        assert!(state
            .take_events()
            .contains(&GameEvent::LevelComplete { level: 1 }));
        assert!(!state.director.clear_pending);
    }

    #[test]
    fn test_wave_not_clear_while_launches_pending() {
        let mut state = playing(21);
        state.advance_clock(1000.0);
        run(&mut state);
        state.missiles.clear();
        run(&mut state);
        assert!(state.wave_in_progress());
        assert!(!state.director.clear_pending);
    }

    #[test]
    fn test_stale_task_after_reset_is_dropped() {
        let mut state = playing(4);
        state.advance_clock(1000.0);
        run(&mut state);
        let stale: Vec<DueTask> = state.scheduler.drain_due(f64::MAX);
        assert!(!stale.is_empty());

        state.start_game();
        for due in stale {
            apply_task(&mut state, due);
        }
        assert!(state.missiles.is_empty());
        assert_eq!(state.level, 1);
    }

    #[test]
    fn test_stale_advance_does_not_skip_level() {
        let mut state = playing(6);
        state.advance_clock(1000.0);
        run(&mut state);
        state.missiles.clear();
        state.scheduler.cancel_all();
        run(&mut state);
        let advance = state.scheduler.drain_due(f64::MAX);
        assert_eq!(advance.len(), 1);

        state.start_game();
        apply_task(&mut state, advance.into_iter().next().unwrap());
        assert_eq!(state.level, 1);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_spawn_power_up_in_upper_field() {
        let mut state = playing(8);
        for _ in 0..50 {
            spawn_power_up(&mut state);
        }
        for p in &state.power_ups {
            assert!(p.pos.y >= POWER_UP_SPAWN_Y.0 && p.pos.y < POWER_UP_SPAWN_Y.1);
            assert!(p.pos.x.abs() <= POWER_UP_SPAWN_HALF_WIDTH);
            assert!(!p.collected());
        }
    }

    /// Only the standing cities' x positions are valid targets
    fn assert_targets_standing(state: &GameState, target: Vec2) {
        assert!(
            state
                .active_cities()
                .any(|c| (target.x - c.x).abs() <= TARGET_JITTER_X / 2.0 + 1e-4),
            "target {target:?} is not near a standing city"
        );
        assert!(target.y >= GROUND_Y && target.y <= GROUND_Y + TARGET_JITTER_Y);
    }

    #[test]
    fn test_split_child_follows_parent() {
        let tuning = Tuning {
            first_wave_delay_ms: 1.0e12,
            ..Tuning::default()
        };
        let mut state = GameState::with_tuning(12, tuning);
        state.start_game();
        state.level = 10;
        let first = state.cities[0].id;
        state.destroy_city(first);

        let speed = missile_speed(state.level, &state.tuning);
        let base = state.tuning.base_speed;
        let launched_at = state.now_ms();
        launch_missile(&mut state, 3.0, speed, true);
        assert_eq!(state.missiles.len(), 1);
        let parent_origin = state.missiles[0].origin;
        assert_eq!(state.scheduler.count_pending(Task::is_launch), 1);

        let mut spawned_at = None;
        while state.now_ms() - launched_at < 4000.0 {
            state.advance_clock(50.0);
            run(&mut state);
            if state.missiles.len() == 2 {
                spawned_at = Some(state.now_ms());
                break;
            }
        }
        let delay = spawned_at.expect("split child never launched") - launched_at;
        assert!((1000.0..3050.0).contains(&delay), "child after {delay} ms");

        let child = &state.missiles[1];
        assert_eq!(child.origin.y, SPLIT_START_Y);
        assert!((child.origin.x - parent_origin.x).abs() <= 1.0);
        assert!(child.speed > base && child.speed < speed);
        assert_targets_standing(&state, child.target);
        assert!(!state.wave_in_progress());
    }

    #[test]
    fn test_forced_splits_through_a_wave() {
        // Ratio 1 at level 5, so every missile splits
        let tuning = Tuning {
            max_level: 5,
            max_split_chance: 1.0,
            ..Tuning::default()
        };
        let mut state = GameState::with_tuning(17, tuning);
        state.start_game();
        state.level = 5;
        let ids: Vec<_> = state.cities.iter().take(3).map(|c| c.id).collect();
        for id in ids {
            state.destroy_city(id);
        }

        let params = WaveParams::for_level(5, &state.tuning);
        assert_eq!(params.split_chance, 1.0);
        assert!(start_wave(&mut state));
        for _ in 0..200 {
            state.advance_clock(100.0);
            run(&mut state);
        }

        let base = state.tuning.base_speed;
        let (parents, children): (Vec<_>, Vec<_>) =
            state.missiles.iter().partition(|m| m.origin.y == MISSILE_START_Y);
        assert_eq!(parents.len(), params.missile_count as usize);
        assert_eq!(children.len(), parents.len());
        for child in &children {
            assert_eq!(child.origin.y, SPLIT_START_Y);
            assert!(child.speed > base && child.speed < params.speed);
            assert!(parents.iter().any(|p| (child.origin.x - p.origin.x).abs() <= 1.0));
            assert_targets_standing(&state, child.target);
        }
        assert_eq!(state.scheduler.count_pending(Task::is_launch), 0);
    }

    #[test]
    fn test_wave_cooldown_outlasts_quick_clear() {
        let mut state = playing(14);
        state.advance_clock(1000.0);
        run(&mut state);
        assert_eq!(state.director.last_wave_ms, Some(1000.0));

        // Clear the wave at once; the level advances after the short delay
        state.missiles.clear();
        state.scheduler.cancel_all();
        run(&mut state);
        state.advance_clock(1500.0);
        run(&mut state);
        assert_eq!(state.level, 2);
        let not_before = state.director.next_wave_not_before;
        let cooldown_end = 1000.0 + state.tuning.wave_cooldown_ms;
        assert!(not_before < cooldown_end);

        while state.now_ms() < cooldown_end - 100.0 {
            state.advance_clock(100.0);
            run(&mut state);
            assert!(!state.wave_in_progress(), "wave started at {}", state.now_ms());
        }
        state.advance_clock(100.0);
        run(&mut state);
        assert!(state.wave_in_progress());
        assert_eq!(state.director.last_wave_ms, Some(cooldown_end));
    }

    #[test]
    fn test_level_complete_power_up_roll() {
        for (chance, expected) in [(1.0, 1), (0.0, 0)] {
            let tuning = Tuning {
                power_up_chance: (chance, chance),
                ..Tuning::default()
            };
            let mut state = GameState::with_tuning(23, tuning);
            state.start_game();
            state.take_events();

            advance_level(&mut state);
            assert_eq!(state.level, 2);
            assert_eq!(state.power_ups.len(), expected);
            let events = state.take_events();
            assert!(events.contains(&GameEvent::LevelComplete { level: 1 }));
            let spawned = events
                .iter()
                .filter(|e| matches!(e, GameEvent::PowerUpSpawned { .. }))
                .count();
            assert_eq!(spawned, expected);
        }
    }

    proptest! {
        #[test]
        fn prop_missile_count_monotonic(level in 1u32..20) {
            let tuning = Tuning::default();
            let here = missile_count(level, &tuning);
            prop_assert!(here <= missile_count(level + 1, &tuning));
            prop_assert!(here <= tuning.max_missiles);
        }

        #[test]
        fn prop_split_chance_monotonic(level in 1u32..20) {
            let tuning = Tuning::default();
            let here = split_chance(level, &tuning);
            prop_assert!(here <= split_chance(level + 1, &tuning));
            if level <= 3 {
                prop_assert_eq!(here, 0.0);
            }
        }

        #[test]
        fn prop_power_up_chance_monotonic(level in 1u32..20) {
            let tuning = Tuning::default();
            let here = power_up_chance(level, &tuning);
            prop_assert!(here <= power_up_chance(level + 1, &tuning));
            prop_assert!((0.0..=1.0).contains(&here));
        }
    }
}
