//! Face mesh landmark model (468 points) on ONNX Runtime

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, error, info};

use crate::landmarks::{FaceLandmarks, LandmarkProvider, NormalizedLandmark};
use crate::{DmsConfig, DmsError};

/// Model input edge length
pub const INPUT_SIZE: u32 = 192;

/// Points in the face mesh topology
pub const MESH_POINTS: usize = 468;

/// Face mesh regressor.
///
/// The whole frame is resized to 192x192 (NCHW, values in [0, 1]). Output 0
/// holds x, y, z per point in input pixels, output 1 a face-presence logit.
pub struct FaceMeshModel {
    session: Session,
    gate: PresenceGate,
}

/// Face presence threshold with hysteresis between detecting and tracking
#[derive(Debug, Clone, Copy, PartialEq)]
struct PresenceGate {
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
    tracking: bool,
}

impl PresenceGate {
    fn new(min_detection_confidence: f32, min_tracking_confidence: f32) -> Self {
        Self {
            min_detection_confidence,
            min_tracking_confidence,
            tracking: false,
        }
    }

    /// Score a face needs on the next call
    fn threshold(&self) -> f32 {
        if self.tracking {
            self.min_tracking_confidence
        } else {
            self.min_detection_confidence
        }
    }

    /// Record whether the last call found a face
    fn observe(&mut self, found: bool) {
        if self.tracking && !found {
            debug!("Face lost");
        }
        self.tracking = found;
    }
}

impl FaceMeshModel {
    pub fn new(path: &str, config: &DmsConfig) -> Result<Self, DmsError> {
        info!("Loading face mesh model from {}", path);
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                error!("Failed to load face mesh model: {}", e);
                DmsError::ModelLoad(e.to_string())
            })?;

        Ok(Self {
            session,
            gate: PresenceGate::new(config.min_detection_confidence, config.min_tracking_confidence),
        })
    }
}

impl LandmarkProvider for FaceMeshModel {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        let input = preprocess(image);
        let outputs = self
            .session
            .run(ort::inputs![input].map_err(|e| DmsError::Inference(e.to_string()))?)
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let coords = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;
        let presence = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| DmsError::Inference(e.to_string()))?;

        let logit = presence.iter().next().copied().ok_or_else(|| {
            DmsError::Inference("face presence output is empty".into())
        })?;
        let coords: Vec<f32> = coords.iter().copied().collect();

        let face = decode(&coords, logit, self.gate.threshold());
        self.gate.observe(face.is_some());
        Ok(face.into_iter().collect())
    }
}

fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = imageops::resize(image, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let size = INPUT_SIZE as usize;

    let mut input = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    input
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turn raw model outputs into normalized landmarks, or `None` if the face
/// score is below `threshold`.
fn decode(coords: &[f32], presence_logit: f32, threshold: f32) -> Option<FaceLandmarks> {
    let score = sigmoid(presence_logit);
    if score < threshold || coords.len() < MESH_POINTS * 3 {
        return None;
    }

    let scale = INPUT_SIZE as f32;
    let points = coords
        .chunks_exact(3)
        .take(MESH_POINTS)
        .map(|xyz| NormalizedLandmark {
            x: xyz[0] / scale,
            y: xyz[1] / scale,
        })
        .collect();

    Some(FaceLandmarks::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_shape_and_range() {
        let image = RgbImage::from_pixel(640, 480, image::Rgb([255, 0, 51]));
        let input = preprocess(&image);
        assert_eq!(input.shape(), &[1, 3, 192, 192]);
        assert!((input[[0, 0, 10, 10]] - 1.0).abs() < 1e-6);
        assert_eq!(input[[0, 1, 10, 10]], 0.0);
        assert!((input[[0, 2, 100, 100]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_normalizes_coordinates() {
        let mut coords = vec![0.0f32; MESH_POINTS * 3];
        coords[0] = 96.0;
        coords[1] = 48.0;
        let face = decode(&coords, 5.0, 0.5).unwrap();
        assert_eq!(face.points.len(), MESH_POINTS);
        assert_eq!(face.points[0], NormalizedLandmark { x: 0.5, y: 0.25 });
    }

    #[test]
    fn test_decode_rejects_low_presence() {
        let coords = vec![0.0f32; MESH_POINTS * 3];
        assert!(decode(&coords, -5.0, 0.5).is_none());
        // sigmoid(0) == 0.5 meets a 0.5 threshold
        assert!(decode(&coords, 0.0, 0.5).is_some());
    }

    #[test]
    fn test_decode_rejects_short_output() {
        assert!(decode(&[0.0; 30], 5.0, 0.5).is_none());
    }

    #[test]
    fn test_gate_switches_to_tracking_threshold() {
        let mut gate = PresenceGate::new(0.8, 0.3);
        assert_eq!(gate.threshold(), 0.8);

        gate.observe(true);
        assert_eq!(gate.threshold(), 0.3);

        // A score that keeps tracking alive is not enough to start it
        let coords = vec![0.0f32; MESH_POINTS * 3];
        let logit = 0.0; // sigmoid = 0.5
        assert!(decode(&coords, logit, gate.threshold()).is_some());

        gate.observe(false);
        assert_eq!(gate.threshold(), 0.8);
        assert!(decode(&coords, logit, gate.threshold()).is_none());
    }

    #[test]
    fn test_missing_model_file() {
        let result = FaceMeshModel::new("/no/such/model.onnx", &DmsConfig::default());
        assert!(matches!(result, Err(DmsError::ModelLoad(_))));
    }
}
