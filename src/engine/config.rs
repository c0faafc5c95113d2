// Configuration management
//
// Engine defaults (projection, bank grants, effect parameters, window
// settings) persisted as a TOML file next to the executable.

use crate::vram::VramBanks;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Default configuration file path
const CONFIG_FILE: &str = "engine_config.toml";

/// Engine configuration
///
/// Stores all user-configurable defaults applied at init.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window settings for the display layer
    pub video: VideoConfig,

    /// Projection defaults programmed at init
    pub projection: ProjectionConfig,

    /// Video memory bank grants
    pub vram: VramConfig,

    /// Special effect parameters
    pub effects: EffectsConfig,
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Window scale (1-8)
    pub scale: u32,

    /// Enable VSync
    pub vsync: bool,

    /// Target FPS
    pub fps: u32,
}

/// Projection defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Vertical field of view in degrees
    pub fov: f32,

    /// Near clipping plane
    pub znear: f32,

    /// Far clipping plane
    pub zfar: f32,
}

/// Video memory bank grants
///
/// Single-screen mode grants `texture_banks` to the texture allocator.
/// Dual-screen mode grants `dual_texture_banks` and claims banks C and D
/// for display capture, so a dual selection that includes C or D makes
/// `init_dual` fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VramConfig {
    /// Banks granted in single-screen mode
    pub texture_banks: VramBanks,

    /// Banks granted in dual-screen mode
    pub dual_texture_banks: VramBanks,
}

/// Special effect parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectsConfig {
    /// Noise amplitude mask
    pub noise_mask: i16,

    /// Sine frequency multiplier
    pub sine_mult: i32,

    /// Sine amplitude shift
    pub sine_shift: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig {
                scale: 3,
                vsync: true,
                fps: 60,
            },
            projection: ProjectionConfig {
                fov: 70.0,
                znear: 0.1,
                zfar: 40.0,
            },
            vram: VramConfig {
                texture_banks: VramBanks::ABCD,
                dual_texture_banks: VramBanks::AB,
            },
            effects: EffectsConfig {
                noise_mask: 0xF,
                sine_mult: 10,
                sine_shift: 9,
            },
        }
    }
}

impl EngineConfig {
    /// Load the configuration from the default path, falling back to
    /// defaults (and writing them out) when the file is missing or
    /// malformed
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(CONFIG_FILE)
    }

    /// Load the configuration from a specific path with the same
    /// fallback behavior
    pub fn load_or_default_from<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(_) => Self::default(),
            },
            Err(_) => {
                let config = Self::default();
                let _ = config.save_to(path);
                config
            }
        }
    }

    /// Save the configuration to the default path
    pub fn save(&self) -> io::Result<()> {
        self.save_to(CONFIG_FILE)
    }

    /// Save the configuration to a specific path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)
    }
}
