//! Eye aspect ratio (EAR)
//!
//! Each eye is a six-point contour `[corner, top, top, corner, bottom, bottom]`.
//! The ratio is the mean eyelid gap over the corner-to-corner width:
//!
//! ```text
//! EAR = (|P1 - P5| + |P2 - P4|) / (2 * |P0 - P3|)
//! ```

use serde::{Deserialize, Serialize};

use crate::landmarks::Point;
use crate::DmsError;

/// Six ordered landmarks outlining one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeContour(pub [Point; 6]);

impl EyeContour {
    pub fn points(&self) -> &[Point; 6] {
        &self.0
    }
}

/// Openness ratio of a single eye
pub fn calculate_ratio(eye: &EyeContour) -> Result<f32, DmsError> {
    let p = eye.points();
    let a = p[1].distance(&p[5]);
    let b = p[2].distance(&p[4]);
    let c = p[0].distance(&p[3]);

    if c == 0.0 {
        return Err(DmsError::DegenerateGeometry);
    }

    Ok((a + b) / (2.0 * c))
}

/// Per-frame measurement for both eyes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarMeasurement {
    pub left: EyeContour,
    pub right: EyeContour,
    pub left_ratio: f32,
    pub right_ratio: f32,
    /// Mean of the two eyes
    pub average: f32,
}

/// Picks both eye contours out of a landmark set and measures them
#[derive(Debug, Clone)]
pub struct EarAnalyzer {
    left_eye: [usize; 6],
    right_eye: [usize; 6],
}

impl EarAnalyzer {
    pub fn new(left_eye: [usize; 6], right_eye: [usize; 6]) -> Self {
        Self {
            left_eye,
            right_eye,
        }
    }

    pub fn compute_average_ratio(&self, landmarks: &[Point]) -> Result<EarMeasurement, DmsError> {
        let left = select_contour(landmarks, &self.left_eye)?;
        let right = select_contour(landmarks, &self.right_eye)?;

        let left_ratio = calculate_ratio(&left)?;
        let right_ratio = calculate_ratio(&right)?;

        Ok(EarMeasurement {
            left,
            right,
            left_ratio,
            right_ratio,
            average: (left_ratio + right_ratio) / 2.0,
        })
    }
}

impl Default for EarAnalyzer {
    fn default() -> Self {
        Self::new(crate::config::LEFT_EYE, crate::config::RIGHT_EYE)
    }
}

fn select_contour(landmarks: &[Point], indices: &[usize; 6]) -> Result<EyeContour, DmsError> {
    let mut points = [Point::default(); 6];
    for (slot, &index) in points.iter_mut().zip(indices) {
        *slot = *landmarks.get(index).ok_or(DmsError::LandmarkIndex {
            index,
            len: landmarks.len(),
        })?;
    }
    Ok(EyeContour(points))
}
