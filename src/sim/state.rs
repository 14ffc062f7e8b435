//! Game state and core simulation types
//!
//! `GameState` is the single authoritative store. The director and the
//! per-frame step only ever touch entities through it.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ballistics;
use super::director::WaveDirector;
use super::scheduler::{Scheduler, Task};
use super::scoring;
use crate::consts::*;
use crate::highscores::{HighScoreEntry, HighScores, sanitize_initials};
use crate::leaderboard::ScoreSubmission;
use crate::tuning::Tuning;
use crate::city_layout;

/// Entity identifier, unique for the lifetime of a `GameState`
pub type EntityId = u32;

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, nothing simulated
    #[default]
    Menu,
    /// Active gameplay
    Playing,
    /// All cities lost; waiting on the leaderboard qualification check
    CheckingHighScore,
    /// Score qualified; waiting for the player's initials
    EnterHighScore,
    /// Run ended
    GameOver,
}

/// A city on the ground line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: EntityId,
    pub x: f32,
    /// Only ever goes false -> true
    pub destroyed: bool,
}

/// An incoming enemy missile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Missile {
    pub id: EntityId,
    /// Launch point of the arc
    pub origin: Vec2,
    /// Current position (recomputed every tick from elapsed time)
    pub pos: Vec2,
    pub target: Vec2,
    pub speed: f32,
    pub start_ms: f64,
}

/// A player-launched interceptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interceptor {
    pub id: EntityId,
    pub start: Vec2,
    pub target: Vec2,
    pub speed: f32,
    pub start_ms: f64,
    /// Set on arrival; the interceptor is dropped on the following tick
    pub exploded: bool,
}

impl Interceptor {
    /// Position at `now_ms`
    pub fn position(&self, now_ms: f64) -> Vec2 {
        ballistics::interceptor_position(self.start, self.target, self.speed, now_ms - self.start_ms)
    }
}

/// What caused an explosion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplosionKind {
    /// Interceptor detonation at the player's aim point
    Interceptor,
    /// Enemy missile hitting the ground
    Impact,
}

/// An expanding blast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub id: EntityId,
    pub center: Vec2,
    /// Last computed radius, for presentation only
    pub radius: f32,
    pub max_radius: f32,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub kind: ExplosionKind,
    /// Level the blast was fired in (interceptor blasts only)
    pub level: Option<u32>,
}

impl Explosion {
    pub fn age(&self, now_ms: f64) -> f64 {
        now_ms - self.start_ms
    }

    /// Authoritative radius at `now_ms`
    pub fn radius_at(&self, now_ms: f64) -> f32 {
        ballistics::explosion_radius(self.max_radius, self.age(now_ms), self.duration_ms)
    }

    pub fn is_expired(&self, now_ms: f64) -> bool {
        self.age(now_ms) > self.duration_ms
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Adds `value` to the score multiplier for a fixed window
    ScoreMultiplier,
    /// Cities absorb impacts for `value` ms
    Shield,
    /// Interceptors fly faster for `value` ms
    RapidFire,
}

/// A floating power-up, collected by interceptor blasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: EntityId,
    pub pos: Vec2,
    pub kind: PowerUpKind,
    pub value: f32,
    pub start_ms: f64,
    /// When it was collected; kept around briefly for the pickup animation
    pub collected_at: Option<f64>,
}

impl PowerUp {
    pub fn collected(&self) -> bool {
        self.collected_at.is_some()
    }

    /// Display opacity: full while fresh, fading out at the end of its life
    pub fn opacity(&self, now_ms: f64, tuning: &Tuning) -> f32 {
        if self.collected() {
            return 0.0;
        }
        let age = now_ms - self.start_ms;
        if age <= tuning.power_up_lifetime_ms {
            return 1.0;
        }
        let fade = (age - tuning.power_up_lifetime_ms) / tuning.power_up_fade_ms.max(1.0);
        (1.0 - fade).clamp(0.0, 1.0) as f32
    }
}

/// Timed effects from shield / rapid-fire pickups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub shield_until_ms: f64,
    pub rapid_fire_until_ms: f64,
}

impl ActiveEffects {
    pub fn shield_active(&self, now_ms: f64) -> bool {
        now_ms < self.shield_until_ms
    }

    pub fn rapid_fire_active(&self, now_ms: f64) -> bool {
        now_ms < self.rapid_fire_until_ms
    }
}

/// Something the host may want to react to (sound, screen shake, HUD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    GameStarted,
    WaveStarted { level: u32, missiles: u32 },
    MissileLaunched { id: EntityId },
    InterceptorLaunched { id: EntityId },
    Explosion { id: EntityId, kind: ExplosionKind },
    MissileDestroyed { id: EntityId, points: u64 },
    CityDestroyed { id: EntityId },
    ShieldAbsorbed { city_id: EntityId },
    PowerUpSpawned { id: EntityId, kind: PowerUpKind },
    PowerUpCollected { id: EntityId, kind: PowerUpKind },
    LevelComplete { level: u32 },
    GameOver { score: u64, level: u32 },
}

/// The authoritative game store
#[derive(Debug, Clone)]
pub struct GameState {
    /// Balance in effect for this store
    pub tuning: Tuning,
    pub phase: GamePhase,
    pub score: u64,
    pub level: u32,
    pub lives: u32,
    pub score_multiplier: f32,
    pub cities: Vec<City>,
    pub missiles: Vec<Missile>,
    pub interceptors: Vec<Interceptor>,
    pub explosions: Vec<Explosion>,
    pub power_ups: Vec<PowerUp>,
    pub effects: ActiveEffects,
    /// Cached top-N list for the leaderboard screens
    pub high_scores: HighScores,
    /// Wave pacing bookkeeping
    pub(crate) director: WaveDirector,
    /// Deferred wave and decay tasks
    pub(crate) scheduler: Scheduler,
    /// Run seed for reproducibility
    pub seed: u64,
    rng: Pcg32,
    /// Simulation clock (ms), advanced by `update_game`
    time_ms: f64,
    events: Vec<GameEvent>,
    high_score_submitted: bool,
    /// Next entity ID
    next_id: EntityId,
}

impl GameState {
    /// Create a store in the menu phase with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let mut state = Self {
            lives: tuning.starting_lives,
            tuning,
            phase: GamePhase::Menu,
            score: 0,
            level: 1,
            score_multiplier: scoring::MIN_MULTIPLIER,
            cities: Vec::new(),
            missiles: Vec::new(),
            interceptors: Vec::new(),
            explosions: Vec::new(),
            power_ups: Vec::new(),
            effects: ActiveEffects::default(),
            high_scores: HighScores::new(),
            director: WaveDirector::default(),
            scheduler: Scheduler::new(),
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ms: 0.0,
            events: Vec::new(),
            high_score_submitted: false,
            next_id: 1,
        };
        state.cities = state.build_cities();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Current simulation time (ms)
    pub fn now_ms(&self) -> f64 {
        self.time_ms
    }

    pub(crate) fn advance_clock(&mut self, dt_ms: f64) {
        self.time_ms += dt_ms.max(0.0);
    }

    pub(crate) fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Hand over everything that happened since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn build_cities(&mut self) -> Vec<City> {
        city_layout()
            .into_iter()
            .map(|x| City {
                id: self.next_entity_id(),
                x,
                destroyed: false,
            })
            .collect()
    }

    // === Lifecycle ===

    /// Reset everything and begin a new run
    pub fn start_game(&mut self) {
        self.scheduler.cancel_all();
        self.phase = GamePhase::Playing;
        self.score = 0;
        self.level = 1;
        self.lives = self.tuning.starting_lives;
        self.score_multiplier = scoring::MIN_MULTIPLIER;
        self.cities = self.build_cities();
        self.missiles.clear();
        self.interceptors.clear();
        self.explosions.clear();
        self.power_ups.clear();
        self.effects = ActiveEffects::default();
        self.high_score_submitted = false;
        self.director = WaveDirector::new(self.time_ms + self.tuning.first_wave_delay_ms);
        self.emit(GameEvent::GameStarted);
        log::info!("Game started (seed {}, epoch {})", self.seed, self.scheduler.epoch());
    }

    /// Stop play and wait on the high-score check. No-op outside `Playing`.
    pub fn end_game(&mut self) {
        if self.phase != GamePhase::Playing {
            return;
        }
        self.scheduler.cancel_all();
        self.phase = GamePhase::CheckingHighScore;
        self.emit(GameEvent::GameOver {
            score: self.score,
            level: self.level,
        });
        log::info!("Game over: score {} at level {}", self.score, self.level);
    }

    /// Advance to the next level; the battlefield is wiped, cities persist
    pub fn next_level(&mut self) {
        self.level += 1;
        self.missiles.clear();
        self.interceptors.clear();
        self.explosions.clear();
        self.power_ups.clear();
        log::info!("Level {}", self.level);
    }

    /// Per-tick entry point, see `sim::tick::update_game`
    pub fn update_game(&mut self, dt_ms: f64) {
        super::tick::update_game(self, dt_ms);
    }

    // === Score ===

    /// Credit `points` at the current multiplier; returns what was added
    pub fn add_score(&mut self, points: u64) -> u64 {
        let credited = scoring::credit(points, self.score_multiplier);
        self.score += credited;
        credited
    }

    /// Direct set; callers clamp
    pub fn set_score_multiplier(&mut self, value: f32) {
        self.score_multiplier = value;
    }

    /// Subtract one expired pickup from whatever the multiplier is now
    pub fn decay_multiplier(&mut self, amount: f32) {
        self.score_multiplier = scoring::decay_multiplier(self.score_multiplier, amount);
        log::debug!("Multiplier decayed by {} to {}", amount, self.score_multiplier);
    }

    // === Entities ===

    pub fn add_missile(&mut self, origin: Vec2, target: Vec2, speed: f32) -> EntityId {
        let id = self.next_entity_id();
        self.missiles.push(Missile {
            id,
            origin,
            pos: origin,
            target,
            speed,
            start_ms: self.time_ms,
        });
        id
    }

    /// Returns false if no such missile (already removed)
    pub fn remove_missile(&mut self, id: EntityId) -> bool {
        let before = self.missiles.len();
        self.missiles.retain(|m| m.id != id);
        self.missiles.len() != before
    }

    pub fn add_interceptor(&mut self, start: Vec2, target: Vec2, speed: f32) -> EntityId {
        let id = self.next_entity_id();
        self.interceptors.push(Interceptor {
            id,
            start,
            target,
            speed,
            start_ms: self.time_ms,
            exploded: false,
        });
        id
    }

    /// Fire an interceptor from the launch point at a world-space target.
    /// Ignored outside `Playing`.
    pub fn launch_interceptor(&mut self, target: Vec2) -> Option<EntityId> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let mut speed = self.tuning.interceptor_speed;
        if self.effects.rapid_fire_active(self.time_ms) {
            speed *= self.tuning.rapid_fire_factor;
        }
        let id = self.add_interceptor(LAUNCH_POINT, target, speed);
        self.emit(GameEvent::InterceptorLaunched { id });
        Some(id)
    }

    pub fn remove_interceptor(&mut self, id: EntityId) -> bool {
        let before = self.interceptors.len();
        self.interceptors.retain(|i| i.id != id);
        self.interceptors.len() != before
    }

    /// Detonate at `center`. Interceptor blasts remember the current level.
    pub fn add_explosion(&mut self, center: Vec2, max_radius: f32, kind: ExplosionKind) -> EntityId {
        let id = self.next_entity_id();
        let level = match kind {
            ExplosionKind::Interceptor => Some(self.level),
            ExplosionKind::Impact => None,
        };
        self.explosions.push(Explosion {
            id,
            center,
            radius: 0.0,
            max_radius,
            start_ms: self.time_ms,
            duration_ms: EXPLOSION_DURATION_MS,
            kind,
            level,
        });
        self.emit(GameEvent::Explosion { id, kind });
        id
    }

    pub fn remove_explosion(&mut self, id: EntityId) -> bool {
        let before = self.explosions.len();
        self.explosions.retain(|e| e.id != id);
        self.explosions.len() != before
    }

    pub fn add_power_up(&mut self, pos: Vec2, kind: PowerUpKind, value: f32) -> EntityId {
        let id = self.next_entity_id();
        self.power_ups.push(PowerUp {
            id,
            pos,
            kind,
            value,
            start_ms: self.time_ms,
            collected_at: None,
        });
        self.emit(GameEvent::PowerUpSpawned { id, kind });
        id
    }

    pub fn remove_power_up(&mut self, id: EntityId) -> bool {
        let before = self.power_ups.len();
        self.power_ups.retain(|p| p.id != id);
        self.power_ups.len() != before
    }

    /// Mark a city destroyed. Returns true only on the false -> true transition.
    pub fn destroy_city(&mut self, id: EntityId) -> bool {
        let Some(city) = self.cities.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        if city.destroyed {
            return false;
        }
        city.destroyed = true;
        self.emit(GameEvent::CityDestroyed { id });
        log::debug!("City {} destroyed", id);
        true
    }

    /// Collect a power-up and apply its effect. `None` if missing or already collected.
    pub fn collect_power_up(&mut self, id: EntityId) -> Option<PowerUpKind> {
        let now = self.time_ms;
        let power_up = self
            .power_ups
            .iter_mut()
            .find(|p| p.id == id && !p.collected())?;
        power_up.collected_at = Some(now);
        let (kind, value) = (power_up.kind, power_up.value);

        match kind {
            PowerUpKind::ScoreMultiplier => {
                self.score_multiplier =
                    scoring::stack_multiplier(self.score_multiplier, value, self.tuning.max_multiplier);
                self.scheduler.schedule(
                    now,
                    self.tuning.multiplier_window_ms,
                    Task::MultiplierDecay { amount: value },
                );
            }
            PowerUpKind::Shield => {
                self.effects.shield_until_ms = self.effects.shield_until_ms.max(now + value as f64);
            }
            PowerUpKind::RapidFire => {
                self.effects.rapid_fire_until_ms =
                    self.effects.rapid_fire_until_ms.max(now + value as f64);
            }
        }
        self.emit(GameEvent::PowerUpCollected { id, kind });
        log::debug!("Collected {:?} ({}), multiplier now {}", kind, value, self.score_multiplier);
        Some(kind)
    }

    // === Derived queries ===

    pub fn active_cities(&self) -> impl Iterator<Item = &City> {
        self.cities.iter().filter(|c| !c.destroyed)
    }

    pub fn all_cities_destroyed(&self) -> bool {
        self.cities.iter().all(|c| c.destroyed)
    }

    /// Whether the current wave is still being fought
    pub fn wave_in_progress(&self) -> bool {
        self.director.wave_in_progress
    }

    // === High-score flow ===

    /// Score awaiting the qualification check, if the game is in that phase
    pub fn pending_high_score_check(&self) -> Option<u64> {
        (self.phase == GamePhase::CheckingHighScore).then_some(self.score)
    }

    /// Apply the qualification result
    pub fn resolve_high_score_check(&mut self, qualifies: bool) {
        if self.phase != GamePhase::CheckingHighScore {
            return;
        }
        self.phase = if qualifies {
            GamePhase::EnterHighScore
        } else {
            GamePhase::GameOver
        };
    }

    /// Accept the player's initials; `None` if invalid, out of phase, or already sent
    pub fn submit_initials(&mut self, raw: &str) -> Option<ScoreSubmission> {
        if self.phase != GamePhase::EnterHighScore || self.high_score_submitted {
            return None;
        }
        let initials = sanitize_initials(raw)?;
        self.high_score_submitted = true;
        Some(ScoreSubmission {
            initials,
            score: self.score,
            level: self.level,
        })
    }

    /// Persisting finished; refresh the cache and end the run
    pub fn finish_high_score_entry(&mut self, scores: Vec<HighScoreEntry>) {
        self.high_scores = HighScores::from_entries(scores);
        if self.phase == GamePhase::EnterHighScore {
            self.phase = GamePhase::GameOver;
        }
    }

    /// Replace the cached leaderboard
    pub fn set_high_scores(&mut self, scores: Vec<HighScoreEntry>) {
        self.high_scores = HighScores::from_entries(scores);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> GameState {
        let mut state = GameState::new(7);
        state.start_game();
        state
    }

    #[test]
    fn test_start_game_layout() {
        let state = playing();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!((state.score, state.level, state.lives), (0, 1, 3));
        assert_eq!(state.score_multiplier, 1.0);
        assert_eq!(state.cities.len(), 6);
        assert!(state.cities.iter().all(|c| !c.destroyed));

        let mut xs: Vec<f32> = state.cities.iter().map(|c| c.x).collect();
        xs.dedup();
        assert_eq!(xs.len(), 6);
        assert!((xs[0] + xs[5]).abs() < 1e-5);
        assert!(xs[0] > -8.0 && xs[5] < 8.0);
    }

    #[test]
    fn test_start_game_resets_everything() {
        let mut state = playing();
        state.add_missile(Vec2::new(0.0, 10.0), Vec2::new(0.0, -2.0), 2.0);
        state.add_power_up(Vec2::new(1.0, 4.0), PowerUpKind::Shield, 5000.0);
        state.add_score(500);
        state.set_score_multiplier(4.0);
        state.next_level();
        let first = state.cities[0].id;
        state.destroy_city(first);

        state.start_game();
        assert_eq!((state.score, state.level), (0, 1));
        assert_eq!(state.score_multiplier, 1.0);
        assert!(state.missiles.is_empty() && state.power_ups.is_empty());
        assert!(state.cities.iter().all(|c| !c.destroyed));
    }

    #[test]
    fn test_add_score_uses_multiplier_at_call_time() {
        let mut state = playing();
        state.set_score_multiplier(3.0);
        assert_eq!(state.add_score(110), 330);
        state.set_score_multiplier(1.0);
        assert_eq!(state.score, 330);
        state.add_score(5);
        assert_eq!(state.score, 335);
    }

    #[test]
    fn test_remove_missile_twice_is_noop() {
        let mut state = playing();
        let id = state.add_missile(Vec2::new(0.0, 10.0), Vec2::new(0.0, -2.0), 2.0);
        let other = state.add_missile(Vec2::new(1.0, 10.0), Vec2::new(1.0, -2.0), 2.0);
        assert!(state.remove_missile(id));
        assert!(!state.remove_missile(id));
        assert_eq!(state.missiles.len(), 1);
        assert_eq!(state.missiles[0].id, other);
    }

    #[test]
    fn test_remove_other_entities_twice_is_noop() {
        let mut state = playing();
        let interceptor = state.add_interceptor(Vec2::ZERO, Vec2::new(2.0, 5.0), 6.0);
        let explosion = state.add_explosion(Vec2::new(2.0, 5.0), 1.0, ExplosionKind::Interceptor);
        let power_up = state.add_power_up(Vec2::new(-3.0, 6.0), PowerUpKind::Shield, 5000.0);
        let kept = state.add_power_up(Vec2::new(3.0, 6.0), PowerUpKind::RapidFire, 8000.0);

        assert!(state.remove_interceptor(interceptor));
        assert!(!state.remove_interceptor(interceptor));
        assert!(state.interceptors.is_empty());

        assert!(state.remove_explosion(explosion));
        assert!(!state.remove_explosion(explosion));
        assert!(state.explosions.is_empty());

        assert!(state.remove_power_up(power_up));
        assert!(!state.remove_power_up(power_up));
        assert_eq!(state.power_ups.len(), 1);
        assert_eq!(state.power_ups[0].id, kept);
    }

    #[test]
    fn test_ids_are_unique() {
        let mut state = playing();
        let mut ids = vec![
            state.add_missile(Vec2::ZERO, Vec2::ZERO, 1.0),
            state.add_interceptor(Vec2::ZERO, Vec2::ONE, 1.0),
            state.add_explosion(Vec2::ZERO, 1.0, ExplosionKind::Impact),
            state.add_power_up(Vec2::ZERO, PowerUpKind::RapidFire, 1.0),
        ];
        ids.extend(state.cities.iter().map(|c| c.id));
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_destroy_city_is_monotonic() {
        let mut state = playing();
        let id = state.cities[2].id;
        assert!(state.destroy_city(id));
        assert!(!state.destroy_city(id));
        assert!(state.cities[2].destroyed);
        assert!(!state.destroy_city(9999));
        state.next_level();
        assert!(state.cities[2].destroyed);
        assert_eq!(state.cities.len(), 6);
    }

    #[test]
    fn test_next_level_clears_battlefield() {
        let mut state = playing();
        state.add_missile(Vec2::ZERO, Vec2::ZERO, 1.0);
        state.add_interceptor(Vec2::ZERO, Vec2::ONE, 1.0);
        state.add_explosion(Vec2::ZERO, 1.0, ExplosionKind::Impact);
        state.add_power_up(Vec2::ZERO, PowerUpKind::Shield, 1.0);
        state.next_level();
        assert_eq!(state.level, 2);
        assert!(state.missiles.is_empty());
        assert!(state.interceptors.is_empty());
        assert!(state.explosions.is_empty());
        assert!(state.power_ups.is_empty());
        assert_eq!(state.cities.len(), 6);
    }

    #[test]
    fn test_collect_multiplier_stacks_and_caps() {
        let mut state = playing();
        for _ in 0..8 {
            let id = state.add_power_up(Vec2::ZERO, PowerUpKind::ScoreMultiplier, 3.0);
            assert_eq!(state.collect_power_up(id), Some(PowerUpKind::ScoreMultiplier));
            assert!(state.score_multiplier <= 10.0);
        }
        assert_eq!(state.score_multiplier, 10.0);
    }

    #[test]
    fn test_collect_twice_only_applies_once() {
        let mut state = playing();
        let id = state.add_power_up(Vec2::ZERO, PowerUpKind::ScoreMultiplier, 2.0);
        assert!(state.collect_power_up(id).is_some());
        assert!(state.collect_power_up(id).is_none());
        assert_eq!(state.score_multiplier, 3.0);
    }

    #[test]
    fn test_shield_and_rapid_fire_windows() {
        let mut state = playing();
        let shield = state.add_power_up(Vec2::ZERO, PowerUpKind::Shield, 4000.0);
        let rapid = state.add_power_up(Vec2::ZERO, PowerUpKind::RapidFire, 2000.0);
        state.collect_power_up(shield);
        state.collect_power_up(rapid);
        assert!(state.effects.shield_active(state.now_ms() + 3999.0));
        assert!(!state.effects.shield_active(state.now_ms() + 4000.0));
        assert!(state.effects.rapid_fire_active(state.now_ms() + 1000.0));

        let id = state.launch_interceptor(Vec2::new(0.0, 5.0)).unwrap();
        let interceptor = state.interceptors.iter().find(|i| i.id == id).unwrap();
        assert_eq!(interceptor.speed, 8.0 * 1.5);
    }

    #[test]
    fn test_launch_interceptor_requires_playing() {
        let mut state = GameState::new(1);
        assert!(state.launch_interceptor(Vec2::new(1.0, 1.0)).is_none());
        state.start_game();
        let id = state.launch_interceptor(Vec2::new(1.0, 1.0)).unwrap();
        assert_eq!(state.interceptors[0].start, LAUNCH_POINT);
        assert!(state.take_events().contains(&GameEvent::InterceptorLaunched { id }));
    }

    #[test]
    fn test_high_score_flow() {
        let mut state = playing();
        state.add_score(1200);
        state.end_game();
        assert_eq!(state.pending_high_score_check(), Some(1200));
        assert!(state.launch_interceptor(Vec2::ONE).is_none());

        state.resolve_high_score_check(true);
        assert_eq!(state.phase, GamePhase::EnterHighScore);
        assert!(state.submit_initials("7!").is_none());
        let submission = state.submit_initials("abcd").unwrap();
        assert_eq!(submission.initials, "ABC");
        assert_eq!(submission.score, 1200);
        assert!(state.submit_initials("XYZ").is_none());

        state.finish_high_score_entry(vec![HighScoreEntry {
            initials: "ABC".into(),
            score: 1200,
            level: 1,
            timestamp: 0.0,
        }]);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.high_scores.top_score(), Some(1200));

        state.start_game();
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_non_qualifying_goes_to_game_over() {
        let mut state = playing();
        state.end_game();
        state.resolve_high_score_check(false);
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_explosion_expiry() {
        let mut state = playing();
        state.add_explosion(Vec2::ZERO, 1.4, ExplosionKind::Interceptor);
        let e = &state.explosions[0];
        assert_eq!(e.level, Some(1));
        assert!(!e.is_expired(2500.0 + e.start_ms));
        assert!(e.is_expired(2500.1 + e.start_ms));
    }
}
