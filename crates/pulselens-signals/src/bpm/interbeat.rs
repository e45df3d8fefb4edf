//! Interbeat-interval heart rate with a trimmed mean.

use ndarray::ArrayView1;

use crate::dsp::{find_peaks, PeakCriteria};

/// Upper heart-rate bound used to space peaks, in BPM.
pub const INTERBEAT_MAX_BPM: f64 = 160.0;
/// Minimum peak prominence, in signal units.
pub const BEAT_PROMINENCE: f64 = 10.0;

/// Heart rate from the median half of the interbeat intervals.
///
/// Peaks are at least `60·fps/160 − 1` samples apart and stand out by a
/// prominence of 10, so the input is expected at raw-trace amplitude.
/// Returns `None` when fewer than two peaks are found.
pub fn interbeat_bpm(signal: ArrayView1<f64>, fps: f64) -> Option<f64> {
    interbeat_bpm_with(signal, fps, INTERBEAT_MAX_BPM, BEAT_PROMINENCE)
}

/// [`interbeat_bpm`] with an explicit rate ceiling and prominence.
pub fn interbeat_bpm_with(signal: ArrayView1<f64>, fps: f64, max_bpm: f64, prominence: f64) -> Option<f64> {
    let peaks = beat_peaks(signal, fps, max_bpm, prominence);
    trimmed_interval_bpm(&peaks, fps)
}

pub(crate) fn beat_peaks(signal: ArrayView1<f64>, fps: f64, max_bpm: f64, prominence: f64) -> Vec<usize> {
    if signal.is_empty() || !(max_bpm > 0.0) {
        return Vec::new();
    }
    let distance = 60.0 * fps / max_bpm - 1.0;
    find_peaks(
        signal,
        &PeakCriteria::default().distance(distance).prominence(prominence),
    )
}

/// `60·fps / mean` over the middle half of the sorted peak spacings.
///
/// With `m` spacings the mean runs over `M = max(1, ⌊m/2⌋)` of them,
/// starting at `⌊m/2⌋ − ⌊M/2⌋`.
pub(crate) fn trimmed_interval_bpm(peaks: &[usize], fps: f64) -> Option<f64> {
    let mut deltas: Vec<usize> = peaks.windows(2).map(|w| w[1] - w[0]).collect();
    if deltas.is_empty() {
        return None;
    }
    deltas.sort_unstable();

    let m = deltas.len();
    let keep = (m / 2).max(1);
    let start = m / 2 - keep / 2;
    let middle = &deltas[start..start + keep];
    let mean_delta = middle.iter().sum::<usize>() as f64 / keep as f64;
    Some(60.0 * fps / mean_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use std::f64::consts::PI;

    #[test]
    fn test_trimmed_mean_drops_outliers() {
        // spacings 30, 30, 30, 5, 90 -> sorted 5, 30, 30, 30, 90 -> middle two are 30
        let peaks = [0, 30, 60, 90, 95, 185];
        assert_relative_eq!(trimmed_interval_bpm(&peaks, 30.0).unwrap(), 60.0);
    }

    #[test]
    fn test_trimmed_mean_small_counts() {
        assert_eq!(trimmed_interval_bpm(&[], 30.0), None);
        assert_eq!(trimmed_interval_bpm(&[12], 30.0), None);
        assert_relative_eq!(trimmed_interval_bpm(&[0, 20], 30.0).unwrap(), 90.0);
        // m = 3: M = 1, start = 1 -> the median
        assert_relative_eq!(trimmed_interval_bpm(&[0, 10, 40, 100], 30.0).unwrap(), 60.0);
    }

    #[test]
    fn test_raw_amplitude_pulse() {
        let fps = 30.0;
        let x = Array1::from_shape_fn(600, |i| 100.0 + 20.0 * (2.0 * PI * 1.2 * i as f64 / fps).sin());
        assert_relative_eq!(interbeat_bpm(x.view(), fps).unwrap(), 72.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weak_signal_has_no_beats() {
        let x = Array1::from_shape_fn(600, |i| (2.0 * PI * 1.2 * i as f64 / 30.0).sin());
        assert_eq!(interbeat_bpm(x.view(), 30.0), None);
        assert_eq!(interbeat_bpm(Array1::<f64>::zeros(0).view(), 30.0), None);
    }
}
