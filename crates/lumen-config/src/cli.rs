//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Lumen command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "lumen", about = "Adaptive AR scene lighting")]
pub struct CliArgs {
    /// Equirectangular panorama to load as the static environment map.
    #[arg(long)]
    pub panorama: Option<String>,

    /// Reflection cubemap refresh interval in milliseconds.
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Enable or disable light estimation.
    #[arg(long)]
    pub light_estimation: Option<bool>,

    /// Number of simulated frames to run.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref path) = args.panorama {
            self.lighting.panorama = Some(path.clone());
        }
        if let Some(ms) = args.refresh_ms {
            self.lighting.reflection_refresh_ms = ms;
        }
        if let Some(enabled) = args.light_estimation {
            self.lighting.light_estimation = enabled;
        }
        if let Some(frames) = args.frames {
            self.demo.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
