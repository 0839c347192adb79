use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine configuration.
///
/// Captures the knobs fixed at engine construction: pool capacity and
/// the initial master volumes. Serializable so hosts can ship it as a
/// JSON settings file next to the rest of their audio configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of effect buses; the engine adds one dedicated BGM bus.
    /// Fixed for the lifetime of the engine.
    pub effect_buses: usize,

    /// Initial master volume applied to every effect bus (0.0-1.0)
    pub effect_volume: f32,

    /// Initial master volume of the BGM bus (0.0-1.0)
    pub bgm_volume: f32,

    /// Volume used by `play_effect` when the caller does not pass one
    pub default_effect_volume: f32,

    /// Whether BGM playback loops at end-of-buffer
    pub bgm_loops: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            effect_buses: 8,
            effect_volume: 1.0,
            bgm_volume: 1.0,
            default_effect_volume: 1.0,
            bgm_loops: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        Ok(config.sanitized())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Clamp volumes into `[0, 1]` and guarantee at least one effect
    /// bus. Out-of-range values degrade gracefully instead of erroring.
    pub fn sanitized(mut self) -> Self {
        self.effect_buses = self.effect_buses.max(1);
        self.effect_volume = crate::voice::clamp_volume(self.effect_volume);
        self.bgm_volume = crate::voice::clamp_volume(self.bgm_volume);
        self.default_effect_volume = crate::voice::clamp_volume(self.default_effect_volume);
        self
    }
}
