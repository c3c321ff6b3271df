//! Camera Capture Library for the Somnolence Detector
//!
//! Provides the frame-source side of the pipeline:
//! - Packed RGB/BGR video frames
//! - Image-sequence source (a directory of stills, read in order)
//! - Synthetic source for tests and demos

pub mod frame;
pub mod source;

pub use frame::{PixelFormat, VideoFrame};
pub use source::{open_source, FrameSource, ImageSequenceSource, SourceConfig, SyntheticSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    /// The source could not be opened. Fatal at startup.
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),
}
