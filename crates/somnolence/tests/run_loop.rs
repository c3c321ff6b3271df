use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use camera_capture::{CameraError, FrameSource, PixelFormat, SourceConfig, SyntheticSource};
use dms::{DmsConfig, DmsError, DrowsinessDetector, FaceLandmarks, LandmarkProvider, NoFaceProvider};
use image::RgbImage;
use somnolence::{process_stream, run, AppConfig, AppError, RunSummary};

/// Fails on every frame
struct BrokenProvider;

impl LandmarkProvider for BrokenProvider {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceLandmarks>, DmsError> {
        Err(DmsError::Inference("model crashed".into()))
    }
}

fn synthetic_config(frames: u32, output_dir: Option<PathBuf>) -> AppConfig {
    AppConfig {
        source: SourceConfig::Synthetic {
            width: 320,
            height: 240,
            frames,
            format: PixelFormat::Bgr24,
        },
        output_dir,
        ..Default::default()
    }
}

#[test]
fn test_run_writes_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("annotated");
    let summary = run(&synthetic_config(3, Some(out.clone())), &AtomicBool::new(false)).unwrap();

    assert_eq!(
        summary,
        RunSummary {
            frames: 3,
            faces: 0,
            alert_frames: 0,
            skipped_frames: 0,
        }
    );

    let mut written: Vec<_> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    written.sort();
    assert_eq!(written.len(), 3);
    assert!(written[0].ends_with("frame_000000.png"));

    let decoded = image::open(&written[2]).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 240));
}

#[test]
fn test_missing_source_is_fatal() {
    let config = AppConfig {
        source: SourceConfig::ImageSequence {
            dir: PathBuf::from("/no/such/camera"),
            format: PixelFormat::Bgr24,
        },
        ..Default::default()
    };
    let result = run(&config, &AtomicBool::new(false));
    assert!(matches!(result, Err(AppError::Source(CameraError::Open(_)))));
}

#[test]
fn test_read_failure_ends_stream_and_releases_once() {
    let mut source = SyntheticSource::new(64, 48, 2, PixelFormat::Rgb24);
    let mut detector = DrowsinessDetector::new(&DmsConfig::default(), NoFaceProvider).unwrap();

    let summary =
        process_stream(&mut source, &mut detector, None, &AtomicBool::new(false)).unwrap();

    assert_eq!(summary.frames, 2);
    assert_eq!(source.release_count(), 1);
    assert!(!source.is_open());
}

#[test]
fn test_stop_flag_checked_between_frames() {
    let mut source = SyntheticSource::new(64, 48, 10, PixelFormat::Rgb24);
    let mut detector = DrowsinessDetector::new(&DmsConfig::default(), NoFaceProvider).unwrap();

    let summary = process_stream(&mut source, &mut detector, None, &AtomicBool::new(true)).unwrap();

    assert_eq!(summary.frames, 0);
    assert_eq!(source.release_count(), 1);
}

#[test]
fn test_provider_errors_skip_frames() {
    let mut source = SyntheticSource::new(64, 48, 4, PixelFormat::Rgb24);
    let mut detector = DrowsinessDetector::new(&DmsConfig::default(), BrokenProvider).unwrap();

    let summary =
        process_stream(&mut source, &mut detector, None, &AtomicBool::new(false)).unwrap();

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.skipped_frames, 4);
    assert_eq!(source.release_count(), 1);
}

#[test]
fn test_unwritable_output_releases_source() {
    let dir = tempfile::tempdir().unwrap();
    // A file where the output directory should be
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"").unwrap();

    let mut source = SyntheticSource::new(64, 48, 3, PixelFormat::Rgb24);
    let mut detector = DrowsinessDetector::new(&DmsConfig::default(), NoFaceProvider).unwrap();

    let result = process_stream(
        &mut source,
        &mut detector,
        Some(&blocker.join("nested")),
        &AtomicBool::new(false),
    );

    assert!(matches!(result, Err(AppError::Output { .. })));
    assert_eq!(source.release_count(), 1);
}

#[test]
fn test_invalid_detector_config_is_fatal() {
    let mut config = synthetic_config(1, None);
    config.detector.ear_threshold = -1.0;
    let result = run(&config, &AtomicBool::new(false));
    assert!(matches!(result, Err(AppError::Detector(DmsError::Config(_)))));
}

#[test]
fn test_detector_config_checked_before_model_load() {
    let mut config = synthetic_config(1, None);
    config.detector.face_model_path = Some("/no/such/face_mesh.onnx".into());
    config.detector.min_tracking_confidence = 1.5;
    let result = run(&config, &AtomicBool::new(false));
    assert!(matches!(result, Err(AppError::Detector(DmsError::Config(_)))));
}
