//! Interface to the camera/world-tracking session.
//!
//! The session is an external collaborator: it owns the camera, estimates the
//! device pose and answers hit-test queries against the feature points it has
//! found in the environment. The tracker only consumes it through [`FrameSource`].

use crate::geometry::{ScreenPoint, WorldPoint};
use crate::hud::TrackingState;
use image::RgbImage;
use nalgebra::Matrix4;
use std::sync::Arc;

/// A captured camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Session clock time the frame was captured at, in seconds
    pub timestamp: f64,
    /// Camera image in sensor orientation
    pub image: Arc<RgbImage>,
}

impl Frame {
    #[must_use]
    pub fn new(timestamp: f64, image: RgbImage) -> Self {
        Self {
            timestamp,
            image: Arc::new(image),
        }
    }
}

/// Kind of surface a hit-test should intersect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTestKind {
    /// Points the tracker recognized as part of a continuous surface
    FeaturePoint,
    /// Detected planes, bounded by their estimated extent.
    ///
    /// The tracker only samples feature points; sources may answer this kind
    /// for other callers.
    ExistingPlane,
}

/// One intersection reported by a hit-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestResult {
    /// Distance from the camera to the intersection, in meters
    pub distance: f32,
    /// Pose of the intersection in world space
    pub world_transform: Matrix4<f32>,
}

impl HitTestResult {
    /// Build a result whose transform is a pure translation to `position`
    #[must_use]
    pub fn at(position: WorldPoint, distance: f32) -> Self {
        Self {
            distance,
            world_transform: Matrix4::new_translation(&position.coords),
        }
    }

    /// Translation part of the world transform
    #[must_use]
    pub fn position(&self) -> WorldPoint {
        let column = self.world_transform.column(3);
        WorldPoint::new(column[0], column[1], column[2])
    }
}

/// Supplier of frames and hit-test results.
///
/// Implementations must tolerate being queried from a background thread at the
/// detection cadence plus the normalizer's sampling bursts.
pub trait FrameSource: Send + Sync {
    /// Most recent frame, if the session has produced one
    fn current_frame(&self) -> Option<Frame>;

    /// All intersections of the given kind under a view point, ordered by distance
    fn hit_test(&self, point: ScreenPoint, kind: HitTestKind) -> Vec<HitTestResult>;

    /// Current session clock time, in seconds
    fn now(&self) -> f64;

    /// Current world-tracking quality
    fn tracking_state(&self) -> TrackingState {
        TrackingState::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_result_position() {
        let hit = HitTestResult::at(WorldPoint::new(0.5, -0.25, -1.5), 1.6);
        assert_eq!(hit.position(), WorldPoint::new(0.5, -0.25, -1.5));
        assert_eq!(hit.distance, 1.6);
    }

    #[test]
    fn test_frame_shares_image() {
        let frame = Frame::new(2.5, RgbImage::new(4, 2));
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.image, &copy.image));
        assert_eq!(copy.timestamp, 2.5);
    }
}
