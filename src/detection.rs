//! Face detection interface and image preparation.
//!
//! The detector itself is an external collaborator. This module defines what
//! the tracker expects from it and how camera images are rotated into the
//! orientation the detector works in.

use crate::geometry::NormalizedRect;
use crate::Result;
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};

/// Face detection result
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// Bounding box in normalized image coordinates (origin bottom-left)
    pub bbox: NormalizedRect,
    /// Confidence score reported by the detector. The tracker keeps every
    /// detection it is given; thresholding is up to the detector.
    pub score: f32,
}

impl FaceDetection {
    #[must_use]
    pub fn new(bbox: NormalizedRect, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// Finds face rectangles in an image.
///
/// Errors and empty results are both non-fatal for the tracker: either way the
/// current detection tick produces no observations.
pub trait FaceDetector: Send + Sync {
    /// Detect all faces in the image, in detector order
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceDetection>>;
}

/// Clockwise rotation applied to camera images before detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageRotation {
    None,
    /// Sensor images are landscape; portrait UIs rotate them a quarter turn
    #[default]
    Rotate90,
    Rotate180,
    Rotate270,
}

/// Rotate a camera image into detector orientation
#[must_use]
pub fn reorient(image: &RgbImage, rotation: ImageRotation) -> RgbImage {
    match rotation {
        ImageRotation::None => image.clone(),
        ImageRotation::Rotate90 => imageops::rotate90(image),
        ImageRotation::Rotate180 => imageops::rotate180(image),
        ImageRotation::Rotate270 => imageops::rotate270(image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_reorient_dimensions() {
        let image = RgbImage::new(640, 480);
        assert_eq!(reorient(&image, ImageRotation::None).dimensions(), (640, 480));
        assert_eq!(reorient(&image, ImageRotation::Rotate90).dimensions(), (480, 640));
        assert_eq!(reorient(&image, ImageRotation::Rotate180).dimensions(), (640, 480));
        assert_eq!(reorient(&image, ImageRotation::Rotate270).dimensions(), (480, 640));
    }

    #[test]
    fn test_reorient_moves_pixels_clockwise() {
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));

        // Top-left ends up top-right after a clockwise quarter turn
        let rotated = reorient(&image, ImageRotation::Rotate90);
        assert_eq!(rotated.get_pixel(1, 0), &Rgb([255, 0, 0]));

        let flipped = reorient(&image, ImageRotation::Rotate180);
        assert_eq!(flipped.get_pixel(2, 1), &Rgb([255, 0, 0]));
    }
}
