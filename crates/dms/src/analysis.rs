//! DMS analysis results

use serde::{Deserialize, Serialize};

use crate::ear::EarMeasurement;

/// Outcome of one processed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Frame sequence number from the source
    pub sequence: u32,

    /// Whether the landmark provider found a face
    pub face_detected: bool,

    /// Eye measurement (absent without a face or with degenerate geometry)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<EarMeasurement>,

    /// Consecutive closed-eye frames so far
    pub closed_frames: u32,

    /// Drowsiness alert active
    pub alert: bool,

    /// Fraction of recent measured frames with eyes closed
    pub perclos: f32,
}

impl FrameAnalysis {
    /// Average EAR, if the eyes were measured
    pub fn average_ratio(&self) -> Option<f32> {
        self.ear.as_ref().map(|m| m.average)
    }
}
