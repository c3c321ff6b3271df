//! Frame sources
//!
//! A source is opened once, read frame by frame until a read fails, and then
//! released. Failing to open is fatal; a failed read just ends the stream.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{CameraError, PixelFormat, VideoFrame};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Pulls frames from a camera, a file sequence or a generator
pub trait FrameSource {
    /// Whether the source can still deliver frames
    fn is_open(&self) -> bool;

    /// Next frame, or `None` once a read fails or the stream is exhausted
    fn read(&mut self) -> Option<VideoFrame>;

    /// Free the underlying device or files. Further reads return `None`.
    fn release(&mut self);
}

/// Which source to open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Directory of still images, read in lexical file-name order
    ImageSequence {
        dir: PathBuf,
        #[serde(default)]
        format: PixelFormat,
    },
    /// Blank frames, for demos and tests
    Synthetic {
        width: u32,
        height: u32,
        frames: u32,
        #[serde(default)]
        format: PixelFormat,
    },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::ImageSequence {
            dir: PathBuf::from("frames"),
            format: PixelFormat::Bgr24,
        }
    }
}

/// Open the configured source
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>, CameraError> {
    match config {
        SourceConfig::ImageSequence { dir, format } => {
            Ok(Box::new(ImageSequenceSource::open(dir, *format)?))
        }
        SourceConfig::Synthetic {
            width,
            height,
            frames,
            format,
        } => Ok(Box::new(SyntheticSource::new(*width, *height, *frames, *format))),
    }
}

/// Reads a directory of still images as a video stream
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    format: PixelFormat,
    open: bool,
}

impl ImageSequenceSource {
    /// List the images in `dir`. Fails if there is nothing to read.
    pub fn open(dir: &Path, format: PixelFormat) -> Result<Self, CameraError> {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "{}: no image files found",
                dir.display()
            )));
        }

        info!("Opened image sequence {} ({} frames)", dir.display(), files.len());

        Ok(Self {
            files,
            position: 0,
            format,
            open: true,
        })
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn is_open(&self) -> bool {
        self.open && self.position < self.files.len()
    }

    fn read(&mut self) -> Option<VideoFrame> {
        if !self.open {
            return None;
        }
        let path = self.files.get(self.position)?;
        let sequence = self.position as u32;

        match VideoFrame::from_file(path, self.format, sequence) {
            Ok(frame) => {
                debug!("Read frame {} from {}", sequence, path.display());
                self.position += 1;
                Some(frame)
            }
            Err(e) => {
                warn!("Failed to decode {}: {}", path.display(), e);
                self.position = self.files.len();
                None
            }
        }
    }

    fn release(&mut self) {
        if self.open {
            debug!("Releasing image sequence");
        }
        self.open = false;
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Emits a fixed number of blank frames, then ends
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    format: PixelFormat,
    remaining: u32,
    sequence: u32,
    open: bool,
    releases: usize,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, frames: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            remaining: frames,
            sequence: 0,
            open: true,
            releases: 0,
        }
    }

    /// How many times `release` has been called
    pub fn release_count(&self) -> usize {
        self.releases
    }
}

impl FrameSource for SyntheticSource {
    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self) -> Option<VideoFrame> {
        if !self.open || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mut frame = VideoFrame::blank(self.width, self.height, self.format);
        frame.sequence = self.sequence;
        frame.timestamp_ns = self.sequence as u64 * 33_333_333;
        self.sequence += 1;
        Some(frame)
    }

    fn release(&mut self) {
        self.open = false;
        self.releases += 1;
    }
}
