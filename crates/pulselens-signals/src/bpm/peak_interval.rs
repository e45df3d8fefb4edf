//! Heart rate from time-domain peak spacing.

use ndarray::ArrayView1;
use serde::Serialize;

use crate::dsp::{find_peaks, mean, std_dev, PeakCriteria};

/// Peak threshold above the signal mean, in standard deviations.
const HEIGHT_STD_FACTOR: f64 = 0.3;
/// Minimum peak spacing in seconds (150 BPM).
const MIN_PEAK_SPACING_S: f64 = 0.4;
/// Accepted beat-to-beat intervals in seconds (43-150 BPM).
const VALID_INTERVAL_S: (f64, f64) = (0.4, 1.4);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeakIntervalEstimate {
    /// 0 when no estimate could be made
    pub bpm: f64,
    /// Detected peak indices, ascending
    pub peaks: Vec<usize>,
}

/// Mean beat rate from the spacing of prominent peaks.
///
/// Peaks must rise `0.3σ` above the mean and lie at least `⌊0.4·fps⌋`
/// samples apart; intervals outside 0.4-1.4 s are discarded.
pub fn peak_interval_bpm(signal: ArrayView1<f64>, fps: f64) -> PeakIntervalEstimate {
    if (signal.len() as f64) < fps || signal.is_empty() {
        return PeakIntervalEstimate::default();
    }

    let height = mean(signal) + HEIGHT_STD_FACTOR * std_dev(signal);
    let distance = (fps * MIN_PEAK_SPACING_S).floor();
    let peaks = find_peaks(signal, &PeakCriteria::default().height(height).distance(distance));
    if peaks.len() < 2 {
        return PeakIntervalEstimate { bpm: 0.0, peaks };
    }

    let valid: Vec<f64> = peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 / fps)
        .filter(|dt| (VALID_INTERVAL_S.0..=VALID_INTERVAL_S.1).contains(dt))
        .collect();
    if valid.is_empty() {
        return PeakIntervalEstimate { bpm: 0.0, peaks };
    }

    let avg = valid.iter().sum::<f64>() / valid.len() as f64;
    PeakIntervalEstimate {
        bpm: 60.0 / avg,
        peaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use std::f64::consts::PI;

    #[test]
    fn test_sine_rate() {
        let fps = 30.0;
        let x = Array1::from_shape_fn(300, |i| (2.0 * PI * 1.0 * i as f64 / fps).cos());
        let est = peak_interval_bpm(x.view(), fps);
        // The maximum at index 0 sits on the edge and is not a peak
        assert_eq!(est.peaks, (1..10).map(|k| k * 30).collect::<Vec<_>>());
        assert_relative_eq!(est.bpm, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_too_short() {
        let x = Array1::from_shape_fn(29, |i| (i as f64).sin());
        assert_eq!(peak_interval_bpm(x.view(), 30.0), PeakIntervalEstimate::default());
    }

    #[test]
    fn test_single_peak() {
        let x = Array1::from_shape_fn(60, |i| -((i as f64 - 30.0) / 5.0).powi(2));
        let est = peak_interval_bpm(x.view(), 30.0);
        assert_eq!(est.bpm, 0.0);
        assert_eq!(est.peaks, vec![30]);
    }

    #[test]
    fn test_intervals_out_of_range() {
        // 0.25 Hz beats: 4 s apart, outside the accepted interval range
        let fps = 30.0;
        let x = Array1::from_shape_fn(600, |i| (2.0 * PI * 0.25 * i as f64 / fps).sin());
        let est = peak_interval_bpm(x.view(), fps);
        assert!(est.peaks.len() >= 2);
        assert_eq!(est.bpm, 0.0);
    }
}
