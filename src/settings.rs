//! Player preferences
//!
//! Persisted separately from high scores.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, Storage, StorageError};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Audio ===
    /// Sound on/off toggle
    pub sound_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Mute when window loses focus
    pub mute_on_blur: bool,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    /// Let the autopilot defend on the title screen
    pub attract_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            master_volume: 0.8,
            sfx_volume: 1.0,
            mute_on_blur: true,
            show_fps: false,
            attract_mode: true,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "missile_commander_settings";

    /// Flip the sound toggle, returns the new state
    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        self.sound_enabled
    }

    /// Load settings; anything missing or unreadable falls back to defaults
    pub fn load(storage: &dyn Storage) -> Self {
        match persistence::load_json(storage, Self::STORAGE_KEY) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring unreadable settings: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        persistence::save_json(storage, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}
