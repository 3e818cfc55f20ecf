//! Pipeline configuration types
//!
//! This module defines the parameters of the velocity and detection stages.
//! All types deserialize with serde so that the application layer can read
//! them straight from its configuration file; names are resolved into the
//! closed method enums here, once.

use crate::events::threshold::ThresholdMethod;
use crate::gaze::savgol::SavitzkyGolayConfig;
use crate::gaze::transforms::VelocityMethod;
use crate::types::{GazeError, Result};
use serde::{Deserialize, Serialize};

/// Velocity stage configuration as written in a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// Differentiation method name (default: "smooth")
    #[serde(default = "default_velocity_method")]
    pub method: String,

    /// Extra configuration, only valid for "savitzky_golay"
    #[serde(default)]
    pub savitzky_golay: Option<SavitzkyGolayConfig>,
}

fn default_velocity_method() -> String {
    "smooth".to_string()
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            method: default_velocity_method(),
            savitzky_golay: None,
        }
    }
}

impl VelocityConfig {
    /// Resolve into a [`VelocityMethod`]
    ///
    /// # Errors
    /// Fails for unknown method names and for extra configuration given to a
    /// method other than "savitzky_golay".
    pub fn resolve(&self) -> Result<VelocityMethod> {
        VelocityMethod::from_name(&self.method, self.savitzky_golay.clone())
    }
}

/// Detection threshold: a noise estimate method or explicit per-axis values
///
/// Written as a method name (`"mad"`) or as `[thx, thy]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThreshold", into = "RawThreshold")]
pub enum Threshold {
    Method(ThresholdMethod),
    Explicit([f64; 2]),
}

/// Serialized form of [`Threshold`]; names are resolved in `TryFrom` so an
/// unknown name reports the valid methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Name(String),
    Values([f64; 2]),
}

impl TryFrom<RawThreshold> for Threshold {
    type Error = GazeError;

    fn try_from(raw: RawThreshold) -> Result<Self> {
        match raw {
            RawThreshold::Name(name) => Ok(Threshold::Method(name.parse()?)),
            RawThreshold::Values(values) => Ok(Threshold::Explicit(values)),
        }
    }
}

impl From<Threshold> for RawThreshold {
    fn from(threshold: Threshold) -> Self {
        match threshold {
            Threshold::Method(method) => RawThreshold::Name(method.to_string()),
            Threshold::Explicit(values) => RawThreshold::Values(values),
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Threshold::Method(ThresholdMethod::default())
    }
}

/// Parameters of the Engbert microsaccade detection algorithm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MicrosaccadeParams {
    /// Minimum event duration in time ticks, inclusive (default: 6)
    #[serde(default = "default_minimum_duration")]
    pub minimum_duration: i64,

    /// Velocity noise level (default: engbert2015)
    #[serde(default)]
    pub threshold: Threshold,

    /// Factor applied to the threshold to get the ellipse radii (default: 6)
    #[serde(default = "default_threshold_factor")]
    pub threshold_factor: f64,

    /// Every threshold component must exceed this value (default: 1e-10)
    #[serde(default = "default_minimum_threshold")]
    pub minimum_threshold: f64,

    /// Treat samples with missing velocity as candidates (default: false)
    #[serde(default)]
    pub include_nan: bool,
}

fn default_minimum_duration() -> i64 {
    6
}

fn default_threshold_factor() -> f64 {
    6.0
}

fn default_minimum_threshold() -> f64 {
    1e-10
}

impl Default for MicrosaccadeParams {
    fn default() -> Self {
        Self {
            minimum_duration: default_minimum_duration(),
            threshold: Threshold::default(),
            threshold_factor: default_threshold_factor(),
            minimum_threshold: default_minimum_threshold(),
            include_nan: false,
        }
    }
}

impl MicrosaccadeParams {
    /// Create parameters with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the minimum duration
    pub fn with_minimum_duration(mut self, ticks: i64) -> Self {
        self.minimum_duration = ticks;
        self
    }

    /// Builder method: estimate the threshold with a method
    pub fn with_threshold_method(mut self, method: ThresholdMethod) -> Self {
        self.threshold = Threshold::Method(method);
        self
    }

    /// Builder method: use an explicit threshold
    pub fn with_threshold(mut self, threshold: [f64; 2]) -> Self {
        self.threshold = Threshold::Explicit(threshold);
        self
    }

    /// Builder method: set the threshold factor
    pub fn with_threshold_factor(mut self, factor: f64) -> Self {
        self.threshold_factor = factor;
        self
    }

    /// Builder method: set the minimum threshold
    pub fn with_minimum_threshold(mut self, minimum: f64) -> Self {
        self.minimum_threshold = minimum;
        self
    }

    /// Builder method: include samples with missing velocity
    pub fn with_include_nan(mut self, include: bool) -> Self {
        self.include_nan = include;
        self
    }
}
