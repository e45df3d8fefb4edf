//! Head-motion intensity from facial landmark displacement.

use serde::{Deserialize, Serialize};

/// Landmarks of one frame; `None` when no face was detected.
pub type LandmarkFrame = Option<Vec<[f64; 2]>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub time_s: f64,
    /// Mean landmark displacement since the previous sampled face, in pixels
    pub intensity: f64,
}

/// Mean Euclidean landmark displacement between consecutive frames.
///
/// The first detected face and frames without a face give 0. A frame
/// without a face does not reset the reference, so the next face is
/// compared with the last one seen. Landmark sets of different sizes
/// cannot be matched and also give 0.
pub fn motion_intensity(frames: &[LandmarkFrame]) -> Vec<f64> {
    let mut previous: Option<&[[f64; 2]]> = None;
    frames
        .iter()
        .map(|frame| {
            let Some(current) = frame.as_deref() else {
                return 0.0;
            };
            let motion = match previous {
                Some(prev) if prev.len() == current.len() && !current.is_empty() => {
                    let total: f64 = prev
                        .iter()
                        .zip(current)
                        .map(|(a, b)| (b[0] - a[0]).hypot(b[1] - a[1]))
                        .sum();
                    total / current.len() as f64
                }
                _ => 0.0,
            };
            previous = Some(current);
            motion
        })
        .collect()
}

/// [`motion_intensity`] over every `⌊fps·interval_s⌋`-th frame.
pub fn motion_series(frames: &[LandmarkFrame], fps: f64, interval_s: f64) -> Vec<MotionSample> {
    let step = (fps * interval_s).floor();
    if !(step >= 1.0) || !step.is_finite() {
        return Vec::new();
    }
    let step = step as usize;
    let sampled: Vec<LandmarkFrame> = frames.iter().step_by(step).cloned().collect();
    motion_intensity(&sampled)
        .into_iter()
        .enumerate()
        .map(|(i, intensity)| MotionSample {
            time_s: (i * step) as f64 / fps,
            intensity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(dx: f64) -> LandmarkFrame {
        Some(vec![[10.0 + dx, 20.0], [30.0 + dx, 20.0], [20.0, 40.0 + dx]])
    }

    #[test]
    fn test_intensity() {
        let motion = motion_intensity(&[face(0.0), face(3.0), None, face(3.0), face(0.0)]);
        assert_eq!(motion, vec![0.0, 3.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_mismatched_landmarks() {
        let frames = [face(0.0), Some(vec![[0.0, 0.0]]), Some(vec![[4.0, 3.0]])];
        let motion = motion_intensity(&frames);
        assert_eq!(motion[1], 0.0);
        assert_relative_eq!(motion[2], 5.0);
    }

    #[test]
    fn test_series_sampling() {
        let frames: Vec<LandmarkFrame> = (0..90).map(|i| face(i as f64 * 0.1)).collect();
        let series = motion_series(&frames, 30.0, 1.0);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].intensity, 0.0);
        assert_eq!(series[2].time_s, 2.0);
        assert_relative_eq!(series[1].intensity, 3.0, epsilon = 1e-9);
        assert!(motion_series(&frames, 30.0, 0.0).is_empty());
    }
}
