//! Blink metrics
//!
//! - Eye Aspect Ratio (EAR) from six eye-contour points
//! - Per-frame closed-eye flags and a consecutive-closure drowsiness alarm
//! - Blink counts per one-second window

use serde::{Deserialize, Serialize};

use crate::trace::BlinkTrace;

/// Six eye-contour points in the usual 68-landmark order: outer corner,
/// two upper lid points, inner corner, two lower lid points.
pub type EyeContour = [[f64; 2]; 6];

/// Blink count in one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkSample {
    /// Window start in seconds
    pub time_s: f64,
    /// Closed-eye frames in the window
    pub count: u32,
}

/// Closed-eye frames per `⌊fps⌋`-frame window, windows stepping by their
/// own length. The last window may be partial.
pub fn blink_rate_series(trace: &BlinkTrace, fps: f64) -> Vec<BlinkSample> {
    let window = fps.floor();
    if !(window >= 1.0) || !window.is_finite() {
        return Vec::new();
    }
    trace
        .flags()
        .chunks(window as usize)
        .enumerate()
        .map(|(i, chunk)| BlinkSample {
            time_s: (i * window as usize) as f64 / fps,
            count: chunk.iter().filter(|&&closed| closed).count() as u32,
        })
        .collect()
}

/// Mean count per window; 0 for an empty series.
pub fn mean_blink_rate(series: &[BlinkSample]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().map(|s| s.count as f64).sum::<f64>() / series.len() as f64
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// `(|p1−p5| + |p2−p4|) / (2·|p0−p3|)`; 0 when the eye has no width.
pub fn eye_aspect_ratio(eye: &EyeContour) -> f64 {
    let v1 = distance(eye[1], eye[5]);
    let v2 = distance(eye[2], eye[4]);
    let h = distance(eye[0], eye[3]);

    if h < 1e-9 {
        return 0.0;
    }

    (v1 + v2) / (2.0 * h)
}

/// Result of feeding one frame to [`BlinkDetector::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EyeState {
    pub closed: bool,
    /// Consecutive closed frames including this one
    pub closed_frames: usize,
    /// Eyes have been closed for at least `closed_frames_alarm` frames
    pub alarm: bool,
}

/// EAR-threshold blink detector.
#[derive(Debug, Clone, PartialEq)]
pub struct BlinkDetector {
    /// Average EAR below this counts as closed
    pub threshold: f64,
    pub closed_frames_alarm: usize,
    closed_run: usize,
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(0.25, 20)
    }
}

impl BlinkDetector {
    pub fn new(threshold: f64, closed_frames_alarm: usize) -> Self {
        Self {
            threshold,
            closed_frames_alarm,
            closed_run: 0,
        }
    }

    pub fn is_closed(&self, left: &EyeContour, right: &EyeContour) -> bool {
        let ear = (eye_aspect_ratio(left) + eye_aspect_ratio(right)) / 2.0;
        ear < self.threshold
    }

    /// Closed flags for a sequence of per-frame `(left, right)` EARs.
    pub fn flags<I>(&self, ears: I) -> BlinkTrace
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        ears.into_iter()
            .map(|(left, right)| (left + right) / 2.0 < self.threshold)
            .collect()
    }

    /// Track consecutive closed frames; an open frame resets the count.
    pub fn update(&mut self, left: &EyeContour, right: &EyeContour) -> EyeState {
        let closed = self.is_closed(left, right);
        self.closed_run = if closed { self.closed_run + 1 } else { 0 };
        EyeState {
            closed,
            closed_frames: self.closed_run,
            alarm: closed && self.closed_run >= self.closed_frames_alarm,
        }
    }

    pub fn reset(&mut self) {
        self.closed_run = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eye(openness: f64) -> EyeContour {
        [
            [0.0, 0.0],
            [1.0, openness],
            [2.0, openness],
            [3.0, 0.0],
            [2.0, -openness],
            [1.0, -openness],
        ]
    }

    #[test]
    fn test_ear() {
        // verticals 2·o each, width 3 -> 4o / 6
        assert_relative_eq!(eye_aspect_ratio(&eye(0.45)), 0.3, epsilon = 1e-12);
        assert_eq!(eye_aspect_ratio(&[[1.0, 1.0]; 6]), 0.0);
    }

    #[test]
    fn test_detector_alarm() {
        let mut detector = BlinkDetector::new(0.25, 3);
        let open = eye(0.45);
        let closed = eye(0.05);
        assert!(!detector.update(&open, &open).closed);
        assert!(!detector.update(&closed, &closed).alarm);
        assert!(!detector.update(&closed, &closed).alarm);
        let state = detector.update(&closed, &closed);
        assert_eq!(state.closed_frames, 3);
        assert!(state.alarm);
        assert_eq!(detector.update(&open, &closed).closed_frames, 1);
        assert_eq!(detector.update(&open, &open), EyeState::default());
    }

    #[test]
    fn test_flags() {
        let flags = BlinkDetector::default().flags([(0.3, 0.3), (0.1, 0.2), (0.3, 0.19)]);
        assert_eq!(flags.flags(), &[false, true, true]);
    }

    #[test]
    fn test_rate_series() {
        let trace: BlinkTrace = (0..75).map(|i| i % 10 == 0).collect();
        let series = blink_rate_series(&trace, 30.0);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0], BlinkSample { time_s: 0.0, count: 3 });
        assert_eq!(series[1].time_s, 1.0);
        // frames 60..75 hold 60 and 70
        assert_eq!(series[2].count, 2);
        assert_relative_eq!(mean_blink_rate(&series), 8.0 / 3.0);
        assert_eq!(mean_blink_rate(&[]), 0.0);
    }
}
