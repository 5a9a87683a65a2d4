//! Coordinate normalization: stable world positions from noisy hit-tests.
//!
//! A single feature-point hit-test under a face is jittery; the tracked
//! environment keeps shifting while the session refines its map. The normalizer
//! takes a short burst of samples at the center of the face rectangle, keeps the
//! closest usable intersection of each, and averages what it collected.

use crate::config::NormalizerConfig;
use crate::geometry::{centroid, ScreenRect, WorldPoint};
use crate::session::{FrameSource, HitTestKind};
use log::debug;
use std::time::Duration;

/// Burst-sampling hit-test averager
#[derive(Debug, Clone)]
pub struct CoordinateNormalizer {
    samples: usize,
    sample_delay: Duration,
    min_hit_distance: f32,
}

impl CoordinateNormalizer {
    /// Create a normalizer
    ///
    /// # Panics
    ///
    /// Panics if `samples` is zero
    #[must_use]
    pub fn new(samples: usize, sample_delay: Duration, min_hit_distance: f32) -> Self {
        assert!(samples > 0, "Sample count must be greater than 0");
        Self {
            samples,
            sample_delay,
            min_hit_distance,
        }
    }

    #[must_use]
    pub fn from_config(config: &NormalizerConfig) -> Self {
        Self::new(
            config.samples.max(1),
            Duration::from_millis(config.sample_delay_ms),
            config.min_hit_distance,
        )
    }

    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Stabilized world position under `rect`, or `None` if no sample hit.
    ///
    /// Blocks the calling thread for `samples * sample_delay`; run it on a
    /// worker, never on the presentation thread.
    pub fn normalize(&self, source: &dyn FrameSource, rect: &ScreenRect) -> Option<WorldPoint> {
        let mut points = Vec::with_capacity(self.samples);

        for _ in 0..self.samples {
            if let Some(point) = self.determine_world_coord(source, rect) {
                points.push(point);
            }
            if !self.sample_delay.is_zero() {
                std::thread::sleep(self.sample_delay);
            }
        }

        if points.is_empty() {
            debug!("No usable hit-test samples for {:?}", rect);
        }
        centroid(&points)
    }

    /// Single hit-test sample at the center of `rect`.
    ///
    /// Intersections at or below the minimum distance are treated as noise
    /// right in front of the lens.
    pub fn determine_world_coord(&self, source: &dyn FrameSource, rect: &ScreenRect) -> Option<WorldPoint> {
        source
            .hit_test(rect.center(), HitTestKind::FeaturePoint)
            .into_iter()
            .filter(|hit| hit.distance > self.min_hit_distance)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .map(|hit| hit.position())
    }
}

impl Default for CoordinateNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizerConfig::default())
    }
}
