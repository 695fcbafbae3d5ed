//! Lumen settings and their `config.ron` persistence.
//!
//! Every section falls back to its defaults field by field, so a partial or
//! older file still loads.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Lighting controller settings.
    pub lighting: LightingConfig,
    /// Demo driver settings.
    pub demo: DemoConfig,
    /// Logging settings.
    pub debug: DebugConfig,
}

/// Lighting controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    /// Request light estimation when a session supports it. When `false`
    /// every session is treated as lacking probe support.
    pub light_estimation: bool,
    /// Interval between reflection cubemap refreshes, in milliseconds.
    pub reflection_refresh_ms: u64,
    /// Edge length of the placeholder reflection cube render target.
    pub reflection_cube_size: u32,
    /// Static fill light used while no estimate is available.
    pub hemisphere: HemisphereConfig,
    /// Equirectangular panorama loaded at startup, if any.
    pub panorama: Option<String>,
}

/// Hemisphere light configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HemisphereConfig {
    /// Linear RGB sky color.
    pub sky_color: [f32; 3],
    /// Linear RGB ground color.
    pub ground_color: [f32; 3],
    /// Intensity multiplier.
    pub intensity: f32,
}

/// Demo driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of simulated frames to run.
    pub frames: u32,
    /// Simulated frame interval in milliseconds.
    pub frame_interval_ms: u64,
    /// Whether the simulated platform offers a GPU reflection binding.
    pub gpu_binding: bool,
}

/// Logging and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Write JSON logs to the config directory's `logs/` folder.
    pub file_logging: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            light_estimation: true,
            reflection_refresh_ms: 1000,
            reflection_cube_size: 16,
            hemisphere: HemisphereConfig::default(),
            panorama: None,
        }
    }
}

impl Default for HemisphereConfig {
    fn default() -> Self {
        Self {
            sky_color: [1.0, 1.0, 1.0],
            // #448844
            ground_color: [0x44 as f32 / 255.0, 0x88 as f32 / 255.0, 0x44 as f32 / 255.0],
            intensity: 1.0,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: 180,
            frame_interval_ms: 16,
            gpu_binding: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            file_logging: false,
        }
    }
}

/// Platform config directory for Lumen, e.g. `~/.config/lumen` on Linux.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lumen")
}

impl Config {
    /// Path of the config file inside `config_dir`.
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE)
    }

    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::file_path(config_dir);
        if path.is_file() {
            let config = Self::read_from(&path)?;
            log::info!("config loaded from {}", path.display());
            return Ok(config);
        }

        let config = Self::default();
        config.save(config_dir)?;
        log::info!("wrote default config to {}", path.display());
        Ok(config)
    }

    /// Write this config to `config_dir/config.ron`, creating the directory.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = Self::file_path(config_dir);
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .struct_names(false)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, pretty)?;

        std::fs::create_dir_all(config_dir).map_err(write_err)?;
        std::fs::write(&path, text).map_err(write_err)
    }

    /// Re-read the file on disk. Returns the new config only when it differs
    /// from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = Self::read_from(&Self::file_path(config_dir))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("config changed on disk");
        Ok(Some(fresh))
    }

    fn read_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_studio_lighting() {
        let config = Config::default();
        assert!(config.lighting.light_estimation);
        assert_eq!(config.lighting.reflection_refresh_ms, 1000);
        assert_eq!(config.lighting.reflection_cube_size, 16);
        assert_eq!(config.lighting.hemisphere.sky_color, [1.0; 3]);
        assert_eq!(config.lighting.hemisphere.intensity, 1.0);
        assert!(config.lighting.panorama.is_none());
    }

    #[test]
    fn test_default_ground_is_green() {
        let hemi = HemisphereConfig::default();
        assert!(hemi.ground_color[1] > hemi.ground_color[0]);
        assert_eq!(hemi.ground_color[0], hemi.ground_color[2]);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let text = "(lighting: (reflection_refresh_ms: 250), debug: (log_level: \"debug\"))";
        let config: Config = ron::from_str(text).unwrap();
        assert_eq!(config.lighting.reflection_refresh_ms, 250);
        assert_eq!(config.lighting.reflection_cube_size, 16);
        assert_eq!(config.demo, DemoConfig::default());
        assert_eq!(config.debug.log_level, "debug");
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let config: Config = ron::from_str("(lighting: (legacy_tonemap: true))").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(Config::file_path(dir.path()).is_file());
    }

    #[test]
    fn test_saved_settings_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.lighting.panorama = Some("assets/studio.hdr".into());
        config.lighting.light_estimation = false;
        config.demo.frames = 10;
        config.save(dir.path()).unwrap();

        assert_eq!(Config::load_or_create(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_reload_reports_only_changes() {
        let dir = tempfile::tempdir().unwrap();
        let original = Config::default();
        original.save(dir.path()).unwrap();
        assert!(original.reload(dir.path()).unwrap().is_none());

        let mut edited = original.clone();
        edited.lighting.reflection_cube_size = 32;
        edited.save(dir.path()).unwrap();
        let fresh = original.reload(dir.path()).unwrap().unwrap();
        assert_eq!(fresh.lighting.reflection_cube_size, 32);
    }

    #[test]
    fn test_broken_file_names_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = Config::file_path(dir.path());
        std::fs::write(&path, "(lighting: [oops").unwrap();

        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(&err, ConfigError::Parse { path: p, .. } if *p == path));
        assert!(err.to_string().contains("config.ron"));
    }

    #[test]
    fn test_reload_without_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::default().reload(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
