//! Somnolence Detection
//!
//! Drives the drowsiness pipeline over a frame source: opens the source,
//! processes frames one at a time until a read fails or a stop is requested,
//! writes annotated frames out and releases the source.

pub mod settings;

pub use settings::AppConfig;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use camera_capture::{CameraError, FrameSource};
use dms::{DmsError, DrowsinessDetector, LandmarkProvider};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// The frame source could not be opened
    #[error("Frame source unavailable: {0}")]
    Source(#[from] CameraError),

    #[error("Detector setup failed: {0}")]
    Detector(#[from] DmsError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Failed to write {path}: {message}")]
    Output { path: PathBuf, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub faces: u64,
    pub alert_frames: u64,
    /// Frames the landmark provider failed on
    pub skipped_frames: u64,
}

/// Initialize logging
pub fn init_logging(level: &str) -> Result<(), AppError> {
    let level = Level::from_str(level).map_err(|e| AppError::Logging(e.to_string()))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Logging(e.to_string()))
}

/// Build the detector, open the source and process the whole stream
pub fn run(config: &AppConfig, stop: &AtomicBool) -> Result<RunSummary, AppError> {
    config.detector.validate()?;
    let provider = dms::provider_from_config(&config.detector)?;
    let mut detector = DrowsinessDetector::new(&config.detector, provider)?;

    if let Some(dir) = &config.output_dir {
        std::fs::create_dir_all(dir).map_err(|e| AppError::Output {
            path: dir.clone(),
            message: e.to_string(),
        })?;
    }

    let mut source = camera_capture::open_source(&config.source)?;
    process_stream(
        source.as_mut(),
        &mut detector,
        config.output_dir.as_deref(),
        stop,
    )
}

/// Process frames until the source runs dry or `stop` is set. The source is
/// released exactly once, whatever the outcome.
pub fn process_stream<P: LandmarkProvider>(
    source: &mut dyn FrameSource,
    detector: &mut DrowsinessDetector<P>,
    output_dir: Option<&Path>,
    stop: &AtomicBool,
) -> Result<RunSummary, AppError> {
    let mut summary = RunSummary::default();
    let outcome = drain(source, detector, output_dir, stop, &mut summary);
    source.release();

    info!(
        "Processed {} frames ({} with a face, {} alerting, {} skipped)",
        summary.frames, summary.faces, summary.alert_frames, summary.skipped_frames
    );
    outcome.map(|()| summary)
}

fn drain<P: LandmarkProvider>(
    source: &mut dyn FrameSource,
    detector: &mut DrowsinessDetector<P>,
    output_dir: Option<&Path>,
    stop: &AtomicBool,
    summary: &mut RunSummary,
) -> Result<(), AppError> {
    while !stop.load(Ordering::SeqCst) {
        let Some(frame) = source.read() else {
            info!("Frame source ended");
            return Ok(());
        };
        summary.frames += 1;

        let processed = match detector.process_frame(&frame) {
            Ok(processed) => processed,
            Err(e) => {
                warn!("Skipping frame {}: {}", frame.sequence, e);
                summary.skipped_frames += 1;
                continue;
            }
        };

        if processed.analysis.face_detected {
            summary.faces += 1;
        }
        if processed.analysis.alert {
            summary.alert_frames += 1;
        }
        if tracing::enabled!(Level::DEBUG) {
            if let Ok(json) = serde_json::to_string(&processed.analysis) {
                debug!("{}", json);
            }
        }

        if let Some(dir) = output_dir {
            let path = dir.join(format!("frame_{:06}.png", processed.frame.sequence));
            processed.frame.save(&path).map_err(|e| AppError::Output {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
    }

    info!("Stop requested");
    Ok(())
}
