//! Constants used throughout the tracker

/// Hit-test samples taken per detected face
pub const DEFAULT_SAMPLE_COUNT: usize = 3;

/// Pause between two hit-test samples, in milliseconds
pub const DEFAULT_SAMPLE_DELAY_MS: u64 = 12;

/// Feature points at or below this distance from the camera are rejected
pub const DEFAULT_MIN_HIT_DISTANCE: f32 = 0.10;

/// Anchors only move when the new position is at least this far away
pub const DEFAULT_MOVEMENT_THRESHOLD: f32 = 0.03;

/// Seconds without an observation after which a face is considered gone
pub const DEFAULT_STALENESS_WINDOW_SECS: f64 = 1.5;

/// Detection cadence in milliseconds
pub const DEFAULT_DETECTION_INTERVAL_MS: u64 = 600;

/// Staleness sweep cadence in milliseconds
pub const DEFAULT_STALENESS_INTERVAL_MS: u64 = 1000;

/// Label shown while no gesture is active
pub const DEFAULT_PRIMARY_LABEL: &str = "Johan";

/// Label shown while the press-and-hold gesture is active
pub const DEFAULT_ALTERNATE_LABEL: &str = "Danny";

/// Default view bounds (points)
pub const DEFAULT_VIEW_WIDTH: f32 = 375.0;
pub const DEFAULT_VIEW_HEIGHT: f32 = 667.0;

/// Title shown by the HUD while the session initializes
pub const HUD_INITIALIZING_TITLE: &str = "Initializing";
