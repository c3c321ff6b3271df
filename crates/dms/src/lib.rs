//! Driver Monitoring System (DMS)
//!
//! Per-frame drowsiness estimation from facial landmarks:
//! - Eye aspect ratio (EAR) from two six-point eye contours
//! - Run-length debounce of closed-eye frames into an alert
//! - Overlay rendering (contours, EAR readout, alert banner)
//!
//! Frames flow one way: mirror, landmarks, EAR, tracker, overlay. The tracker
//! counter is the only state carried from one frame to the next.

pub mod analysis;
pub mod config;
pub mod ear;
pub mod face_mesh;
pub mod landmarks;
pub mod overlay;
pub mod state;

pub use analysis::FrameAnalysis;
pub use config::{DmsConfig, LEFT_EYE, RIGHT_EYE};
pub use ear::{calculate_ratio, EarAnalyzer, EarMeasurement, EyeContour};
pub use face_mesh::FaceMeshModel;
pub use landmarks::{FaceLandmarks, LandmarkProvider, NoFaceProvider, NormalizedLandmark, Point};
pub use overlay::{FrameRenderer, Glyphs, OverlayStyle, TextStyle};
pub use state::{DrowsinessTracker, FaceLossPolicy, TrackerStatus};

use std::path::Path;

use camera_capture::frame::VideoFrame;
use thiserror::Error;
use tracing::{debug, warn};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// Eye corners coincide, so the ratio has no denominator
    #[error("Degenerate eye geometry: zero corner-to-corner distance")]
    DegenerateGeometry,

    #[error("Landmark index {index} out of range for {len} landmarks")]
    LandmarkIndex { index: usize, len: usize },
}

/// Annotated frame plus what was measured on it
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Mirrored, annotated frame; same size and pixel format as the input
    pub frame: VideoFrame,
    pub analysis: FrameAnalysis,
}

/// Build the landmark provider the configuration asks for
pub fn provider_from_config(config: &DmsConfig) -> Result<Box<dyn LandmarkProvider>, DmsError> {
    match &config.face_model_path {
        Some(path) => Ok(Box::new(FaceMeshModel::new(path, config)?)),
        None => {
            warn!("No face model path configured. No faces will be detected.");
            Ok(Box::new(NoFaceProvider))
        }
    }
}

/// Drowsiness detection session: one tracker, one provider
pub struct DrowsinessDetector<P = Box<dyn LandmarkProvider>> {
    provider: P,
    analyzer: EarAnalyzer,
    tracker: DrowsinessTracker,
    renderer: FrameRenderer,
}

impl<P: LandmarkProvider> DrowsinessDetector<P> {
    /// Create a detector with a validated configuration
    pub fn new(config: &DmsConfig, provider: P) -> Result<Self, DmsError> {
        config.validate()?;

        let glyphs = match &config.font_path {
            Some(path) => Glyphs::load(Path::new(path))?,
            None => Glyphs::Bitmap,
        };

        Ok(Self {
            provider,
            analyzer: EarAnalyzer::new(config.left_eye, config.right_eye),
            tracker: DrowsinessTracker::new(
                config.ear_threshold,
                config.closed_eyes_frames,
                config.face_loss_policy,
            )
            .with_perclos_window(config.perclos_window),
            renderer: FrameRenderer::new(OverlayStyle::default(), glyphs),
        })
    }

    /// Replace the overlay renderer
    pub fn with_renderer(mut self, renderer: FrameRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Mirror, measure, track and annotate one frame.
    ///
    /// Provider failures are returned without touching the tracker. A face
    /// with coincident eye corners counts as a frame without a face.
    pub fn process_frame(&mut self, frame: &VideoFrame) -> Result<ProcessedFrame, DmsError> {
        let mirrored = frame.mirrored();
        let mut image = mirrored
            .to_rgb_image()
            .map_err(|e| DmsError::ImageProcessing(e.to_string()))?;

        metrics::counter!("dms_frames_processed").increment(1);

        let faces = self.provider.detect(&image)?;
        let face_detected = !faces.is_empty();

        let ear = match faces.first() {
            Some(face) => {
                let points = face.to_pixels(image.width(), image.height());
                match self.analyzer.compute_average_ratio(&points) {
                    Ok(measurement) => Some(measurement),
                    Err(DmsError::DegenerateGeometry) => {
                        warn!("Frame {}: degenerate eye geometry, skipping ratio", frame.sequence);
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                metrics::counter!("dms_faces_missing").increment(1);
                None
            }
        };

        let average = ear.as_ref().map(|m| m.average);
        let status = self.tracker.update(average);

        if let Some(value) = average {
            metrics::gauge!("dms_eye_aspect_ratio").set(value as f64);
        }
        if status.alert {
            metrics::counter!("dms_alert_frames").increment(1);
        }
        debug!(
            "Frame {}: face={} ear={:?} closed_frames={} alert={}",
            frame.sequence, face_detected, average, status.closed_frames, status.alert
        );

        self.renderer.annotate(&mut image, ear.as_ref(), status.alert);

        Ok(ProcessedFrame {
            frame: VideoFrame::from_rgb_image(
                image,
                mirrored.format,
                mirrored.timestamp_ns,
                mirrored.sequence,
            ),
            analysis: FrameAnalysis {
                sequence: frame.sequence,
                face_detected,
                ear,
                closed_frames: status.closed_frames,
                alert: status.alert,
                perclos: self.tracker.perclos(),
            },
        })
    }

    pub fn tracker(&self) -> &DrowsinessTracker {
        &self.tracker
    }

    /// Reset driver state (new session)
    pub fn reset(&mut self) {
        self.tracker.reset();
    }
}
