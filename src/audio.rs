//! Sound cues
//!
//! The simulation never plays sound itself; hosts feed drained `GameEvent`s
//! through `AudioManager::play_events`. On wasm the cues are synthesized with
//! the Web Audio API, natively they are only logged. Playback never fails
//! outward: a missing context or a rejected node just drops the cue.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::settings::Settings;
use crate::sim::GameEvent;

#[cfg(target_arch = "wasm32")]
use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Any detonation
    Explosion,
    /// Enemy missile enters the sky
    MissileLaunch,
    /// Player interceptor fired
    Interceptor,
    /// Power-up collected
    PowerUp,
    /// City destroyed
    CityDestroy,
    /// Game over
    GameOver,
    /// Wave cleared
    LevelComplete,
}

impl SoundEffect {
    /// Cue name shared with the web front end
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::Explosion => "explosion",
            SoundEffect::MissileLaunch => "missileLaunch",
            SoundEffect::Interceptor => "interceptor",
            SoundEffect::PowerUp => "powerUp",
            SoundEffect::CityDestroy => "cityDestroy",
            SoundEffect::GameOver => "gameOver",
            SoundEffect::LevelComplete => "levelComplete",
        }
    }

    /// Relative loudness of the cue
    pub fn base_volume(&self) -> f32 {
        match self {
            SoundEffect::MissileLaunch => 0.7,
            SoundEffect::Interceptor => 0.8,
            _ => 1.0,
        }
    }

    /// Playback-rate range the pitch is drawn from
    pub fn pitch_range(&self) -> (f32, f32) {
        match self {
            SoundEffect::Explosion => (0.8, 1.2),
            SoundEffect::MissileLaunch => (0.9, 1.1),
            SoundEffect::Interceptor => (0.95, 1.05),
            _ => (1.0, 1.0),
        }
    }

    /// Sound to play for a simulation event, if any
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::Explosion { .. } => Some(SoundEffect::Explosion),
            GameEvent::MissileLaunched { .. } => Some(SoundEffect::MissileLaunch),
            GameEvent::InterceptorLaunched { .. } => Some(SoundEffect::Interceptor),
            GameEvent::PowerUpCollected { .. } => Some(SoundEffect::PowerUp),
            GameEvent::CityDestroyed { .. } => Some(SoundEffect::CityDestroy),
            GameEvent::GameOver { .. } => Some(SoundEffect::GameOver),
            GameEvent::LevelComplete { .. } => Some(SoundEffect::LevelComplete),
            _ => None,
        }
    }
}

/// A resolved cue: what to play, how loud, how fast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    pub effect: SoundEffect,
    pub volume: f32,
    pub pitch: f32,
}

/// Audio manager for the game
pub struct AudioManager {
    #[cfg(target_arch = "wasm32")]
    ctx: Option<AudioContext>,
    enabled: bool,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
    rng: Pcg32,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        Self::with_seed(0x5eed_a0d1)
    }

    /// Manager with a fixed pitch-randomization seed
    pub fn with_seed(seed: u64) -> Self {
        #[cfg(target_arch = "wasm32")]
        let ctx = {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            ctx
        };
        Self {
            #[cfg(target_arch = "wasm32")]
            ctx,
            enabled: true,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        #[cfg(target_arch = "wasm32")]
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Global toggle gating every cue
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::info!("Sound {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Temporary mute (window blur), independent of the toggle
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_enabled(settings.sound_enabled);
        self.set_master_volume(settings.master_volume);
        self.set_sfx_volume(settings.sfx_volume);
    }

    /// Get effective volume
    fn effective_volume(&self) -> f32 {
        if !self.enabled || self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Resolve volume and pitch; `None` when nothing would be heard
    pub fn cue(&mut self, effect: SoundEffect) -> Option<Cue> {
        let volume = self.effective_volume() * effect.base_volume();
        if volume <= 0.0 {
            return None;
        }
        let (lo, hi) = effect.pitch_range();
        let pitch = if hi > lo {
            self.rng.random_range(lo..hi)
        } else {
            lo
        };
        Some(Cue {
            effect,
            volume,
            pitch,
        })
    }

    /// Play a sound effect
    pub fn play(&mut self, effect: SoundEffect) {
        let Some(cue) = self.cue(effect) else {
            return;
        };
        self.render(cue);
    }

    /// Play the cue for every event that has one
    pub fn play_events(&mut self, events: &[GameEvent]) {
        for effect in events.iter().filter_map(SoundEffect::for_event) {
            self.play(effect);
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn render(&self, cue: Cue) {
        log::trace!(
            "sfx {} vol={:.2} pitch={:.2}",
            cue.effect.name(),
            cue.volume,
            cue.pitch
        );
    }

    #[cfg(target_arch = "wasm32")]
    fn render(&self, cue: Cue) {
        let Some(ctx) = &self.ctx else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let (vol, pitch) = (cue.volume, cue.pitch);
        match cue.effect {
            SoundEffect::Explosion => self.play_explosion(ctx, vol, pitch),
            SoundEffect::MissileLaunch => self.play_missile_launch(ctx, vol, pitch),
            SoundEffect::Interceptor => self.play_interceptor(ctx, vol, pitch),
            SoundEffect::PowerUp => self.play_power_up(ctx, vol),
            SoundEffect::CityDestroy => self.play_city_destroy(ctx, vol),
            SoundEffect::GameOver => self.play_game_over(ctx, vol),
            SoundEffect::LevelComplete => self.play_level_complete(ctx, vol),
        }
    }
}

// === Sound generators ===

#[cfg(target_arch = "wasm32")]
impl AudioManager {
    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Frequency sweep with an exponential decay
    fn sweep(
        &self,
        ctx: &AudioContext,
        osc_type: OscillatorType,
        from: f32,
        to: f32,
        peak: f32,
        duration: f64,
    ) {
        let Some((osc, gain)) = self.create_osc(ctx, from, osc_type) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(peak, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + duration)
            .ok();
        osc.frequency().set_value_at_time(from, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(to, t + duration)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + duration + 0.05).ok();
    }

    /// Arpeggio of short notes
    fn notes(&self, ctx: &AudioContext, freqs: &[f32], step: f64, peak: f32, length: f64) {
        for (i, freq) in freqs.iter().enumerate() {
            let delay = i as f64 * step;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Triangle) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(peak, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + length)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + length + 0.1).ok();
            }
        }
    }

    /// Explosion - boom with a crack on top
    fn play_explosion(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Sawtooth, 100.0 * pitch, 30.0 * pitch, vol * 0.5, 0.4);
        self.sweep(ctx, OscillatorType::Square, 1500.0 * pitch, 800.0 * pitch, vol * 0.2, 0.1);
    }

    /// Missile launch - falling whistle
    fn play_missile_launch(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Sine, 900.0 * pitch, 300.0 * pitch, vol * 0.2, 0.5);
    }

    /// Interceptor - whoosh up
    fn play_interceptor(&self, ctx: &AudioContext, vol: f32, pitch: f32) {
        self.sweep(ctx, OscillatorType::Triangle, 200.0 * pitch, 600.0 * pitch, vol * 0.3, 0.2);
    }

    /// Power-up - happy ding
    fn play_power_up(&self, ctx: &AudioContext, vol: f32) {
        self.notes(ctx, &[600.0, 800.0, 1000.0], 0.08, vol * 0.25, 0.15);
    }

    /// City destroyed - deep rumble
    fn play_city_destroy(&self, ctx: &AudioContext, vol: f32) {
        self.sweep(ctx, OscillatorType::Sine, 300.0, 20.0, vol * 0.4, 0.8);
        self.sweep(ctx, OscillatorType::Square, 400.0, 200.0, vol * 0.2, 0.25);
    }

    /// Game over - sad descending
    fn play_game_over(&self, ctx: &AudioContext, vol: f32) {
        self.notes(ctx, &[400.0, 350.0, 300.0, 200.0], 0.2, vol * 0.3, 0.3);
    }

    /// Level complete - fanfare
    fn play_level_complete(&self, ctx: &AudioContext, vol: f32) {
        self.notes(ctx, &[400.0, 500.0, 600.0, 800.0], 0.1, vol * 0.3, 0.4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ExplosionKind, PowerUpKind};

    #[test]
    fn test_event_mapping() {
        let cases = [
            (GameEvent::MissileLaunched { id: 1 }, Some(SoundEffect::MissileLaunch)),
            (GameEvent::InterceptorLaunched { id: 1 }, Some(SoundEffect::Interceptor)),
            (
                GameEvent::Explosion { id: 1, kind: ExplosionKind::Impact },
                Some(SoundEffect::Explosion),
            ),
            (
                GameEvent::PowerUpCollected { id: 1, kind: PowerUpKind::Shield },
                Some(SoundEffect::PowerUp),
            ),
            (GameEvent::CityDestroyed { id: 1 }, Some(SoundEffect::CityDestroy)),
            (GameEvent::LevelComplete { level: 2 }, Some(SoundEffect::LevelComplete)),
            (GameEvent::GameOver { score: 0, level: 1 }, Some(SoundEffect::GameOver)),
            (GameEvent::GameStarted, None),
            (GameEvent::ShieldAbsorbed { city_id: 1 }, None),
        ];
        for (event, expected) in cases {
            assert_eq!(SoundEffect::for_event(&event), expected, "{event:?}");
        }
    }

    #[test]
    fn test_pitch_stays_in_range() {
        let mut audio = AudioManager::with_seed(7);
        for _ in 0..200 {
            let cue = audio.cue(SoundEffect::Explosion).unwrap();
            assert!((0.8..1.2).contains(&cue.pitch));
            let cue = audio.cue(SoundEffect::Interceptor).unwrap();
            assert!((0.95..1.05).contains(&cue.pitch));
        }
        assert_eq!(audio.cue(SoundEffect::PowerUp).unwrap().pitch, 1.0);
    }

    #[test]
    fn test_toggle_and_volume_gate_cues() {
        let mut audio = AudioManager::with_seed(1);
        audio.set_master_volume(4.0);
        assert_eq!(audio.master_volume(), 1.0);
        let cue = audio.cue(SoundEffect::MissileLaunch).unwrap();
        assert!((cue.volume - 0.7).abs() < 1e-6);

        audio.set_enabled(false);
        assert!(audio.cue(SoundEffect::GameOver).is_none());
        // Playing while disabled is a silent no-op
        audio.play_events(&[GameEvent::GameOver { score: 1, level: 1 }]);

        audio.set_enabled(true);
        audio.set_muted(true);
        assert!(audio.cue(SoundEffect::GameOver).is_none());
    }

    #[test]
    fn test_apply_settings() {
        let mut audio = AudioManager::with_seed(1);
        let settings = Settings {
            sound_enabled: false,
            master_volume: -1.0,
            ..Settings::default()
        };
        audio.apply_settings(&settings);
        assert!(!audio.is_enabled());
        assert_eq!(audio.master_volume(), 0.0);
    }
}
