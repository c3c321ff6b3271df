//! DMS configuration

use serde::{Deserialize, Serialize};

use crate::state::FaceLossPolicy;
use crate::DmsError;

/// Left-eye contour in the 468-point face mesh:
/// corner, top-outer, top-inner, corner, bottom-inner, bottom-outer
pub const LEFT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Right-eye contour, same ordering as [`LEFT_EYE`]
pub const RIGHT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// DMS configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Average EAR below this counts as eyes closed
    pub ear_threshold: f32,

    /// Consecutive closed-eye frames before the alert fires
    pub closed_eyes_frames: u32,

    /// What a frame without a face does to the closed-eye run
    pub face_loss_policy: FaceLossPolicy,

    /// Landmark indices of the left eye contour
    pub left_eye: [usize; 6],

    /// Landmark indices of the right eye contour
    pub right_eye: [usize; 6],

    /// Face presence confidence needed to start tracking
    pub min_detection_confidence: f32,

    /// Face presence confidence needed to keep tracking
    pub min_tracking_confidence: f32,

    /// Frames kept for PERCLOS
    pub perclos_window: usize,

    /// Model paths
    pub face_model_path: Option<String>,

    /// TrueType font for overlay text; built-in bitmap font when unset
    pub font_path: Option<String>,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.25,
            closed_eyes_frames: 20,
            face_loss_policy: FaceLossPolicy::Reset,
            left_eye: LEFT_EYE,
            right_eye: RIGHT_EYE,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
            perclos_window: 900,
            face_model_path: None,
            font_path: None,
        }
    }
}

impl DmsConfig {
    /// Create strict config (alerts sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.27,
            closed_eyes_frames: 12,
            ..Default::default()
        }
    }

    /// Create lenient config (alerts later)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.22,
            closed_eyes_frames: 30,
            face_loss_policy: FaceLossPolicy::Hold,
            ..Default::default()
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !self.ear_threshold.is_finite() || self.ear_threshold <= 0.0 {
            return Err(DmsError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        if self.closed_eyes_frames == 0 {
            return Err(DmsError::Config("closed_eyes_frames must be at least 1".into()));
        }
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DmsError::Config(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DmsConfig::default();
        assert_eq!(config.ear_threshold, 0.25);
        assert_eq!(config.closed_eyes_frames, 20);
        assert_eq!(config.left_eye.len(), 6);
        assert_eq!(config.right_eye.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(DmsConfig::strict().validate().is_ok());
        assert!(DmsConfig::lenient().validate().is_ok());
        assert!(DmsConfig::strict().closed_eyes_frames < DmsConfig::lenient().closed_eyes_frames);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_frames = DmsConfig {
            closed_eyes_frames: 0,
            ..Default::default()
        };
        assert!(matches!(zero_frames.validate(), Err(DmsError::Config(_))));

        let bad_threshold = DmsConfig {
            ear_threshold: f32::NAN,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());

        let bad_confidence = DmsConfig {
            min_tracking_confidence: 1.5,
            ..Default::default()
        };
        assert!(bad_confidence.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: DmsConfig =
            serde_json::from_str(r#"{"closed_eyes_frames": 5, "face_loss_policy": "hold"}"#).unwrap();
        assert_eq!(config.closed_eyes_frames, 5);
        assert_eq!(config.face_loss_policy, FaceLossPolicy::Hold);
        assert_eq!(config.ear_threshold, 0.25);
    }
}
