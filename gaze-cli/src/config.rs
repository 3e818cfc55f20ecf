//! Configuration loading and parsing

use crate::report::OutputFormat;
use anyhow::{Context, Result};
use gaze_pipeline::{EyeSelection, Experiment, MicrosaccadeParams, Origin, Screen, VelocityConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub velocity: VelocityConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub properties: PropertiesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// Recording files, extended by `--input` on the command line
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub screen_width_px: f64,
    pub screen_height_px: f64,
    pub screen_width_cm: f64,
    pub screen_height_cm: f64,
    pub distance_cm: f64,
    #[serde(default)]
    pub origin: Origin,
    pub sampling_rate: f64,
}

impl ExperimentConfig {
    /// Validate the geometry into an [`Experiment`]
    pub fn to_experiment(&self) -> gaze_pipeline::Result<Experiment> {
        let screen = Screen::new(
            self.screen_width_px,
            self.screen_height_px,
            self.screen_width_cm,
            self.screen_height_cm,
            self.distance_cm,
            self.origin,
        )?;
        Experiment::new(screen, self.sampling_rate)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionConfig {
    /// Eye to detect events on (default: auto)
    #[serde(default)]
    pub eye: EyeSelection,

    /// Replace events of earlier runs instead of merging with them
    #[serde(default = "default_clear")]
    pub clear: bool,

    #[serde(flatten)]
    pub params: MicrosaccadeParams,
}

fn default_clear() -> bool {
    true
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            eye: EyeSelection::Auto,
            clear: default_clear(),
            params: MicrosaccadeParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertiesConfig {
    /// Event properties to compute (default: all built-in properties)
    #[serde(default = "default_properties")]
    pub names: Vec<String>,
}

fn default_properties() -> Vec<String> {
    ["duration", "amplitude", "dispersion", "disposition", "peak_velocity"]
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        Self {
            names: default_properties(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Report format; inferred from the output file extension if absent
    pub format: Option<OutputFormat>,
    /// Report file (default: stdout)
    pub path: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .velocity
        .resolve()
        .with_context(|| format!("Invalid [velocity] section in {:?}", path))?;
    config
        .experiment
        .to_experiment()
        .with_context(|| format!("Invalid [experiment] section in {:?}", path))?;

    Ok(config)
}
