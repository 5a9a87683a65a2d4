//! Screen-space and world-space geometry helpers.
//!
//! Face detectors report bounding boxes in a normalized, orientation-independent
//! space (unit square, origin at the bottom-left). Hit-testing needs view
//! coordinates (points, origin at the top-left), so every box goes through
//! [`transform_bounding_box`] with the device orientation at the time of the frame.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

/// Position in the tracked world, in meters
pub type WorldPoint = Point3<f32>;

/// Position on screen, in view points
pub type ScreenPoint = Point2<f32>;

/// Rectangle in normalized detector coordinates (0..1, origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }
}

/// Rectangle in view coordinates (points, origin top-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Center of the rectangle, used as the hit-test location
    #[must_use]
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Size of the view the scene is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBounds {
    pub width: f32,
    pub height: f32,
}

impl ViewBounds {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Physical orientation of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
    Unknown,
}

impl DeviceOrientation {
    #[must_use]
    pub fn is_landscape(self) -> bool {
        matches!(self, Self::LandscapeLeft | Self::LandscapeRight)
    }
}

/// View size and device orientation, shared between the UI and the detection worker
#[derive(Debug)]
pub struct ViewState {
    inner: RwLock<(ViewBounds, DeviceOrientation)>,
}

impl ViewState {
    #[must_use]
    pub fn new(bounds: ViewBounds, orientation: DeviceOrientation) -> Self {
        Self {
            inner: RwLock::new((bounds, orientation)),
        }
    }

    /// Current bounds and orientation, read together
    #[must_use]
    pub fn get(&self) -> (ViewBounds, DeviceOrientation) {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_orientation(&self, orientation: DeviceOrientation) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).1 = orientation;
    }

    pub fn set_bounds(&self, bounds: ViewBounds) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).0 = bounds;
    }
}

/// Map a normalized detection box into view coordinates for the given orientation.
///
/// Landscape orientations swap the axes, so the box width scales with the view
/// height and vice versa. Orientations without a defined screen rotation
/// (face up/down, unknown) use the portrait mapping.
#[must_use]
pub fn transform_bounding_box(
    bbox: &NormalizedRect,
    bounds: ViewBounds,
    orientation: DeviceOrientation,
) -> ScreenRect {
    let (width, height) = if orientation.is_landscape() {
        (bbox.width * bounds.height, bbox.height * bounds.width)
    } else {
        (bbox.width * bounds.width, bbox.height * bounds.height)
    };

    let (x, y) = match orientation {
        DeviceOrientation::LandscapeLeft => (bbox.y * bounds.width, bbox.x * bounds.height),
        DeviceOrientation::LandscapeRight => (
            (1.0 - bbox.max_y()) * bounds.width,
            (1.0 - bbox.max_x()) * bounds.height,
        ),
        DeviceOrientation::PortraitUpsideDown => {
            ((1.0 - bbox.max_x()) * bounds.width, bbox.y * bounds.height)
        }
        _ => (bbox.x * bounds.width, (1.0 - bbox.max_y()) * bounds.height),
    };

    ScreenRect::new(x, y, width, height)
}

/// Arithmetic mean of a set of world points, `None` for an empty set
#[must_use]
#[allow(clippy::cast_precision_loss)] // sample counts are tiny
pub fn centroid(points: &[WorldPoint]) -> Option<WorldPoint> {
    if points.is_empty() {
        return None;
    }

    let sum = points.iter().fold(nalgebra::Vector3::<f32>::zeros(), |acc, p| acc + p.coords);
    Some(WorldPoint::from(sum / points.len() as f32))
}
