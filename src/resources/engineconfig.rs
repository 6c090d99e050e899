//! Engine configuration.
//!
//! Settings are loaded from an INI file; anything missing keeps its default.
//! `init` hooks may edit the config further before the window is opened.
//!
//! # Configuration File Format
//!
//! ```ini
//! [window]
//! title = spork
//! width = 800
//! height = 600
//! vsync = 1
//! target_fps = 60
//!
//! [render]
//! clear_color = 0,0,0
//! scale = 1.0
//!
//! [audio]
//! enabled = true
//! volume = 1.0
//! auto_stop = false
//! ```

use std::path::PathBuf;

use configparser::ini::Ini;
use log::info;

use crate::components::geometry::{Color, Vec2};
use crate::error::{EngineError, Result};

const DEFAULT_TITLE: &str = "no title currently";
const DEFAULT_WINDOW_WIDTH: u32 = 800;
const DEFAULT_WINDOW_HEIGHT: u32 = 600;
const DEFAULT_VSYNC: u32 = 1;
const DEFAULT_TARGET_FPS: u32 = 60;
const DEFAULT_MASTER_VOLUME: f32 = 1.0;
const DEFAULT_CONFIG_PATH: &str = "./config.ini";

/// Window, render and audio settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window title.
    pub title: String,
    /// Window width in pixels.
    pub window_width: u32,
    /// Window height in pixels.
    pub window_height: u32,
    /// Present interval in vertical blanks; 0 disables vsync.
    pub vsync: u32,
    /// Frame cap used when vsync is off.
    pub target_fps: u32,
    /// Colour the surface is cleared to every frame.
    pub clear_color: Color,
    /// Default painter scale.
    pub scale: Vec2,
    /// Open an audio device at startup.
    pub audio_enabled: bool,
    /// Mixer output gain.
    pub master_volume: f32,
    /// Drop finished non-looping tracks from the mixer automatically.
    pub auto_stop_finished: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Built-in defaults: 800x600, vsync on, black background, audio at full volume.
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            vsync: DEFAULT_VSYNC,
            target_fps: DEFAULT_TARGET_FPS,
            clear_color: Color::BLACK,
            scale: Vec2::ONE,
            audio_enabled: true,
            master_volume: DEFAULT_MASTER_VOLUME,
            auto_stop_finished: false,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Defaults, reading from and saving to `path`.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    /// Load configuration from the INI file.
    ///
    /// Missing or malformed values retain their current values.
    pub fn load_from_file(&mut self) -> Result<()> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| EngineError::Config(format!("Failed to load config file: {}", e)))?;

        if let Some(title) = config.get("window", "title") {
            self.title = title;
        }
        read_u32(&config, "window", "width", &mut self.window_width);
        read_u32(&config, "window", "height", &mut self.window_height);
        read_u32(&config, "window", "vsync", &mut self.vsync);
        read_u32(&config, "window", "target_fps", &mut self.target_fps);

        if let Some(color) = config.get("render", "clear_color").as_deref().and_then(Color::parse) {
            self.clear_color = color;
        }
        if let Some(scale) = config.getfloat("render", "scale").ok().flatten() {
            self.scale = Vec2::new(scale as f32, scale as f32);
        }

        read_bool(&config, "audio", "enabled", &mut self.audio_enabled);
        read_bool(&config, "audio", "auto_stop", &mut self.auto_stop_finished);
        if let Some(volume) = config.getfloat("audio", "volume").ok().flatten() {
            self.master_volume = (volume as f32).max(0.0);
        }

        info!(
            "Loaded config: '{}' {}x{}, vsync={}, fps={}, audio={} vol={}",
            self.title,
            self.window_width,
            self.window_height,
            self.vsync,
            self.target_fps,
            self.audio_enabled,
            self.master_volume
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<()> {
        let mut config = Ini::new();
        let entries = [
            ("window", "title", self.title.clone()),
            ("window", "width", self.window_width.to_string()),
            ("window", "height", self.window_height.to_string()),
            ("window", "vsync", self.vsync.to_string()),
            ("window", "target_fps", self.target_fps.to_string()),
            ("render", "clear_color", self.clear_color.to_string()),
            ("render", "scale", self.scale.x.to_string()),
            ("audio", "enabled", self.audio_enabled.to_string()),
            ("audio", "volume", self.master_volume.to_string()),
            ("audio", "auto_stop", self.auto_stop_finished.to_string()),
        ];
        for (section, key, value) in entries {
            config.set(section, key, Some(value));
        }

        config
            .write(&self.config_path)
            .map_err(|e| EngineError::Config(format!("Failed to save config file: {}", e)))?;

        info!("Saved config to {}", self.config_path.display());

        Ok(())
    }

    pub fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    /// `(width, height)` in pixels.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

/// Overwrite `target` when `key` holds an unsigned integer.
fn read_u32(config: &Ini, section: &str, key: &str, target: &mut u32) {
    if let Some(value) = config.getuint(section, key).ok().flatten() {
        *target = value.min(u32::MAX as u64) as u32;
    }
}

fn read_bool(config: &Ini, section: &str, key: &str, target: &mut bool) {
    if let Some(value) = config.getbool(section, key).ok().flatten() {
        *target = value;
    }
}
