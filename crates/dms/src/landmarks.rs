//! Facial landmark types and the provider seam

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::DmsError;

/// Landmark in frame-relative coordinates, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
}

/// Landmark in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x as f32 - other.x as f32;
        let dy = self.y as f32 - other.y as f32;
        dx.hypot(dy)
    }
}

/// One detected face: the full mesh, in model index order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub points: Vec<NormalizedLandmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<NormalizedLandmark>) -> Self {
        Self { points }
    }

    /// Scale to a `width` x `height` frame, truncating toward zero
    pub fn to_pixels(&self, width: u32, height: u32) -> Vec<Point> {
        self.points
            .iter()
            .map(|p| Point {
                x: (p.x * width as f32) as i32,
                y: (p.y * height as f32) as i32,
            })
            .collect()
    }
}

/// Locates facial landmarks in an RGB image.
///
/// Returns zero or more faces; callers use only the first. Implementations may
/// keep tracking state between calls, but each call must stand on its own.
pub trait LandmarkProvider {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, DmsError>;
}

impl<P: LandmarkProvider + ?Sized> LandmarkProvider for Box<P> {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        (**self).detect(image)
    }
}

/// Provider that never finds a face. Used when no model is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFaceProvider;

impl LandmarkProvider for NoFaceProvider {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        Ok(Vec::new())
    }
}
