//! Driver state tracking

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What a frame without a measurable face does to the closed-eye run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceLossPolicy {
    /// Clear the run; any dropped detection ends the episode
    #[default]
    Reset,
    /// Leave the run untouched until the face comes back
    Hold,
}

/// Tracker output for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrackerStatus {
    /// Consecutive frames with the average EAR below threshold
    pub closed_frames: u32,
    /// `closed_frames >= closed_eyes_frames`
    pub alert: bool,
}

/// Run-length debounce over the per-frame "eyes closed" signal
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    ear_threshold: f32,
    closed_eyes_frames: u32,
    face_loss_policy: FaceLossPolicy,
    closed_frames: u32,
    /// Closed flags of recent measured frames (for PERCLOS)
    history: VecDeque<bool>,
    history_len: usize,
}

impl DrowsinessTracker {
    pub fn new(ear_threshold: f32, closed_eyes_frames: u32, face_loss_policy: FaceLossPolicy) -> Self {
        Self {
            ear_threshold,
            closed_eyes_frames,
            face_loss_policy,
            closed_frames: 0,
            history: VecDeque::new(),
            history_len: 900,
        }
    }

    /// Keep the last `len` measured frames for PERCLOS
    pub fn with_perclos_window(mut self, len: usize) -> Self {
        self.history_len = len;
        self.history.truncate(len);
        self
    }

    /// Feed one frame's average EAR, or `None` if no face was measured
    pub fn update(&mut self, average_ratio: Option<f32>) -> TrackerStatus {
        let was_alert = self.is_alert();

        match average_ratio {
            Some(ratio) => {
                let closed = ratio < self.ear_threshold;
                if closed {
                    self.closed_frames = self.closed_frames.saturating_add(1);
                } else {
                    self.closed_frames = 0;
                }
                self.push_sample(closed);
            }
            None => match self.face_loss_policy {
                FaceLossPolicy::Reset => self.closed_frames = 0,
                FaceLossPolicy::Hold => {}
            },
        }

        let status = self.status();
        if status.alert && !was_alert {
            info!("Eyes closed for {} frames, drowsiness alert raised", status.closed_frames);
        } else if was_alert && !status.alert {
            info!("Drowsiness alert cleared");
        }
        status
    }

    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            closed_frames: self.closed_frames,
            alert: self.is_alert(),
        }
    }

    pub fn closed_frames(&self) -> u32 {
        self.closed_frames
    }

    pub fn is_alert(&self) -> bool {
        self.closed_frames >= self.closed_eyes_frames
    }

    /// Calculate PERCLOS (Percentage of Eye Closure) over the window
    /// Higher PERCLOS indicates drowsiness
    pub fn perclos(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        let closed = self.history.iter().filter(|&&c| c).count();
        closed as f32 / self.history.len() as f32
    }

    /// Reset state (new detection session)
    pub fn reset(&mut self) {
        debug!("Resetting drowsiness tracker");
        self.closed_frames = 0;
        self.history.clear();
    }

    fn push_sample(&mut self, closed: bool) {
        if self.history_len == 0 {
            return;
        }
        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tracker() -> DrowsinessTracker {
        DrowsinessTracker::new(0.25, 20, FaceLossPolicy::Reset)
    }

    #[test]
    fn test_open_eyes_never_alert() {
        let mut t = tracker();
        for _ in 0..100 {
            assert_eq!(t.update(Some(0.3)), TrackerStatus { closed_frames: 0, alert: false });
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let mut t = tracker();
        assert_eq!(t.update(Some(0.25)).closed_frames, 0);
        assert_eq!(t.update(Some(0.2499)).closed_frames, 1);
    }

    #[test]
    fn test_alert_fires_on_exact_frame() {
        let mut t = tracker();
        for i in 1..20 {
            let status = t.update(Some(0.2));
            assert_eq!(status.closed_frames, i);
            assert!(!status.alert, "alert too early at frame {}", i);
        }
        let status = t.update(Some(0.2));
        assert_eq!(status, TrackerStatus { closed_frames: 20, alert: true });

        // Alert persists while eyes stay closed
        assert!(t.update(Some(0.1)).alert);
    }

    #[test]
    fn test_single_open_frame_resets() {
        let mut t = tracker();
        for _ in 0..20 {
            t.update(Some(0.2));
        }
        assert!(t.is_alert());

        assert_eq!(t.update(Some(0.3)), TrackerStatus::default());
        assert_eq!(t.update(Some(0.2)).closed_frames, 1);
    }

    #[test]
    fn test_face_loss_resets_by_default() {
        let mut t = tracker();
        for _ in 0..25 {
            t.update(Some(0.2));
        }
        assert_eq!(t.update(None), TrackerStatus::default());
    }

    #[test]
    fn test_face_loss_hold_keeps_run() {
        let mut t = DrowsinessTracker::new(0.25, 3, FaceLossPolicy::Hold);
        t.update(Some(0.1));
        t.update(Some(0.1));
        assert_eq!(t.update(None).closed_frames, 2);
        assert!(t.update(Some(0.1)).alert);
    }

    #[test]
    fn test_reset() {
        let mut t = tracker();
        t.update(Some(0.1));
        t.reset();
        assert_eq!(t.closed_frames(), 0);
        assert_eq!(t.perclos(), 0.0);
    }

    #[test]
    fn test_perclos_window() {
        let mut t = tracker().with_perclos_window(4);
        assert_eq!(t.perclos(), 0.0);

        t.update(Some(0.1));
        t.update(Some(0.3));
        assert!((t.perclos() - 0.5).abs() < f32::EPSILON);

        // Face-absent frames are not samples
        t.update(None);
        assert!((t.perclos() - 0.5).abs() < f32::EPSILON);

        for _ in 0..4 {
            t.update(Some(0.1));
        }
        assert_eq!(t.perclos(), 1.0);
    }

    proptest! {
        #[test]
        fn prop_alert_iff_run_reaches_limit(
            samples in proptest::collection::vec(proptest::option::of(0.0f32..0.5), 0..200),
            limit in 1u32..40,
        ) {
            let mut t = DrowsinessTracker::new(0.25, limit, FaceLossPolicy::Reset);
            let mut run = 0u32;
            for sample in samples {
                run = match sample {
                    Some(r) if r < 0.25 => run + 1,
                    _ => 0,
                };
                let status = t.update(sample);
                prop_assert_eq!(status.closed_frames, run);
                prop_assert_eq!(status.alert, run >= limit);
            }
        }
    }
}
