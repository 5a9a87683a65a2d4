//! Configuration management for the face tracker

use crate::constants::{
    DEFAULT_ALTERNATE_LABEL, DEFAULT_DETECTION_INTERVAL_MS, DEFAULT_MIN_HIT_DISTANCE, DEFAULT_MOVEMENT_THRESHOLD,
    DEFAULT_PRIMARY_LABEL, DEFAULT_SAMPLE_COUNT, DEFAULT_SAMPLE_DELAY_MS, DEFAULT_STALENESS_INTERVAL_MS,
    DEFAULT_STALENESS_WINDOW_SECS, DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH,
};
use crate::detection::ImageRotation;
use crate::geometry::{DeviceOrientation, ViewBounds};
use crate::registry::{ExpiryAction, TrackingMode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hit-test sampling
    pub normalizer: NormalizerConfig,

    /// Face liveness rules
    pub registry: RegistryConfig,

    /// Timer cadences
    pub cadence: CadenceConfig,

    /// Label names
    pub labels: LabelConfig,

    /// View geometry
    pub view: ViewConfig,
}

/// Hit-test sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Hit-test samples per detected face
    pub samples: usize,

    /// Pause after each sample, in milliseconds
    pub sample_delay_ms: u64,

    /// Intersections at or below this distance are ignored
    pub min_hit_distance: f32,
}

/// Face liveness parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Single slot or one face per label
    pub mode: TrackingMode,

    /// Minimum displacement before an anchor is moved
    pub movement_threshold: f32,

    /// Seconds without observation before a face is stale
    pub staleness_window_secs: f64,

    /// Hide or remove stale anchors
    pub expiry_action: ExpiryAction,
}

/// Timer cadences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Period of the detection cycle, in milliseconds
    pub detection_interval_ms: u64,

    /// Period of the staleness sweep, in milliseconds
    pub staleness_interval_ms: u64,
}

/// Label names toggled by the press-and-hold gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub primary: String,
    pub alternate: String,
}

/// View geometry used to map detections onto the screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// View width in points
    pub width: f32,

    /// View height in points
    pub height: f32,

    /// Device orientation
    pub orientation: DeviceOrientation,

    /// Rotation applied to camera images before detection
    pub image_rotation: ImageRotation,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLE_COUNT,
            sample_delay_ms: DEFAULT_SAMPLE_DELAY_MS,
            min_hit_distance: DEFAULT_MIN_HIT_DISTANCE,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mode: TrackingMode::default(),
            movement_threshold: DEFAULT_MOVEMENT_THRESHOLD,
            staleness_window_secs: DEFAULT_STALENESS_WINDOW_SECS,
            expiry_action: ExpiryAction::default(),
        }
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL_MS,
            staleness_interval_ms: DEFAULT_STALENESS_INTERVAL_MS,
        }
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_LABEL.to_string(),
            alternate: DEFAULT_ALTERNATE_LABEL.to_string(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEW_WIDTH,
            height: DEFAULT_VIEW_HEIGHT,
            orientation: DeviceOrientation::default(),
            image_rotation: ImageRotation::default(),
        }
    }
}

impl CadenceConfig {
    #[must_use]
    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    #[must_use]
    pub fn staleness_interval(&self) -> Duration {
        Duration::from_millis(self.staleness_interval_ms)
    }
}

impl ViewConfig {
    #[must_use]
    pub fn bounds(&self) -> ViewBounds {
        ViewBounds::new(self.width, self.height)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.normalizer.samples == 0 {
            return Err(Error::ConfigError("Sample count must be greater than 0".to_string()));
        }
        if self.normalizer.min_hit_distance.is_nan() || self.normalizer.min_hit_distance < 0.0 {
            return Err(Error::ConfigError("Minimum hit distance must not be negative".to_string()));
        }

        if self.registry.movement_threshold.is_nan() || self.registry.movement_threshold <= 0.0 {
            return Err(Error::ConfigError("Movement threshold must be positive".to_string()));
        }
        if self.registry.staleness_window_secs.is_nan() || self.registry.staleness_window_secs <= 0.0 {
            return Err(Error::ConfigError("Staleness window must be positive".to_string()));
        }

        if self.cadence.detection_interval_ms == 0 {
            return Err(Error::ConfigError("Detection interval must be greater than 0".to_string()));
        }
        if self.cadence.staleness_interval_ms == 0 {
            return Err(Error::ConfigError("Staleness interval must be greater than 0".to_string()));
        }

        if self.labels.primary.trim().is_empty() || self.labels.alternate.trim().is_empty() {
            return Err(Error::ConfigError("Labels must not be empty".to_string()));
        }

        if self.view.bounds().is_empty() {
            return Err(Error::ConfigError(format!(
                "View bounds must be positive, got {}x{}",
                self.view.width, self.view.height
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face anchor configuration

# Hit-test sampling
normalizer:
  samples: 3
  sample_delay_ms: 12
  min_hit_distance: 0.10

# Face liveness
registry:
  mode: single          # single | multi
  movement_threshold: 0.03
  staleness_window_secs: 1.5
  expiry_action: hide   # hide | remove

# Timer cadences
cadence:
  detection_interval_ms: 600
  staleness_interval_ms: 1000

# Gesture labels
labels:
  primary: "Johan"
  alternate: "Danny"

# View geometry
view:
  width: 375.0
  height: 667.0
  orientation: portrait # portrait | portrait_upside_down | landscape_left | landscape_right
  image_rotation: rotate90
"#;
