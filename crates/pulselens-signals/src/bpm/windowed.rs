//! Sliding-window heart-rate time series.

use ndarray::{s, ArrayView1};
use serde::{Deserialize, Serialize};

use super::spectral::fft_peak_bpm_in_band;

/// One point of a BPM time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmSample {
    /// Window start, in seconds from the first analyzed frame
    pub time_s: f64,
    pub bpm: f64,
}

/// Windowing and plausibility limits for [`windowed_bpm_series`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesConfig {
    pub window_seconds: f64,
    pub step_seconds: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Spectral search band in Hz
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            window_seconds: 5.0,
            step_seconds: 1.0,
            min_bpm: 40.0,
            max_bpm: 180.0,
            low_hz: 0.7,
            high_hz: 4.0,
        }
    }
}

/// FFT-peak BPM per window, every window position included.
///
/// Estimates outside `[min_bpm, max_bpm]` are dropped, so the series may
/// have gaps but never holds an implausible value.
pub fn windowed_bpm_series(signal: ArrayView1<f64>, fps: f64, config: &SeriesConfig) -> Vec<BpmSample> {
    series(signal, fps, config, true)
}

/// As [`windowed_bpm_series`] but without the final window position, the
/// layout the legacy charts were produced with.
pub fn legacy_bpm_series(signal: ArrayView1<f64>, fps: f64, config: &SeriesConfig) -> Vec<BpmSample> {
    series(signal, fps, config, false)
}

fn series(signal: ArrayView1<f64>, fps: f64, config: &SeriesConfig, include_last: bool) -> Vec<BpmSample> {
    let window = (config.window_seconds * fps).floor();
    let step = (config.step_seconds * fps).floor().max(1.0);
    if !(window >= 1.0) || !step.is_finite() {
        return Vec::new();
    }
    let (window, step) = (window as usize, step as usize);

    let mut out = Vec::new();
    let mut start = 0;
    while start + window < signal.len() || (include_last && start + window == signal.len()) {
        let segment = signal.slice(s![start..start + window]);
        let bpm = fft_peak_bpm_in_band(segment, fps, config.low_hz, config.high_hz);
        if (config.min_bpm..=config.max_bpm).contains(&bpm) {
            out.push(BpmSample {
                time_s: start as f64 / fps,
                bpm,
            });
        }
        start += step;
    }
    out
}
