//! Continuous wavelet transform heart-rate estimate.
//!
//! The waveform is transformed with a Mexican-hat (Ricker) wavelet over a
//! geometric ladder of scales. The scale row with the largest coefficient
//! sum is treated as the pulse carrier and handed to the same trimmed
//! interbeat estimate as [`interbeat_bpm`](super::interbeat_bpm).

use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;

use super::interbeat::{beat_peaks, trimmed_interval_bpm};

/// Support of the sampled wavelet, in units of scale.
const SUPPORT: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveletConfig {
    /// Lower rate bound; the smallest scale is `(min_bpm/60)/2`.
    pub min_bpm: f64,
    /// Upper rate bound used to space peaks.
    pub max_bpm: f64,
    pub prominence: f64,
    /// Scales per doubling.
    pub voices_per_octave: u32,
}

impl Default for WaveletConfig {
    fn default() -> Self {
        Self {
            min_bpm: 36.0,
            max_bpm: 240.0,
            prominence: 10.0,
            voices_per_octave: 32,
        }
    }
}

impl WaveletConfig {
    /// Scales from `(min_bpm/60)/2` up to, not including, `fps/2`.
    pub fn scales(&self, fps: f64) -> Vec<f64> {
        let first = self.min_bpm / 60.0 / 2.0;
        let ratio = 2f64.powf(1.0 / self.voices_per_octave.max(1) as f64);
        let upper = fps / 2.0;
        if !(first > 0.0) || !upper.is_finite() {
            return Vec::new();
        }
        std::iter::successors(Some(first), |a| Some(a * ratio))
            .take_while(|&a| a < upper)
            .collect()
    }
}

/// Normalized Mexican-hat wavelet `2/(√3·π^¼)·(1−t²)·e^{−t²/2}`.
pub fn mexican_hat(t: f64) -> f64 {
    let norm = 2.0 / (3f64.sqrt() * PI.powf(0.25));
    let t2 = t * t;
    norm * (1.0 - t2) * (-t2 / 2.0).exp()
}

/// One CWT row at scale `a`: `W[b] = Σ_k x[b+k]·ψ(k/a)/√a`, `|k| ≤ ⌊8a⌋`,
/// zero outside the signal.
pub fn cwt_row(signal: ArrayView1<f64>, scale: f64) -> Array1<f64> {
    let n = signal.len() as isize;
    let half = (SUPPORT * scale).floor() as isize;
    let gain = scale.sqrt().recip();
    let kernel: Vec<f64> = (-half..=half).map(|k| mexican_hat(k as f64 / scale) * gain).collect();

    Array1::from_shape_fn(signal.len(), |b| {
        let b = b as isize;
        kernel
            .iter()
            .zip(-half..=half)
            .filter_map(|(w, k)| {
                let idx = b + k;
                (0..n).contains(&idx).then(|| w * signal[idx as usize])
            })
            .sum()
    })
}

/// Heart rate from the dominant CWT scale.
///
/// The first row whose coefficient sum strictly exceeds every earlier one
/// (and zero) wins; row 0 is used when no sum is positive. Returns `None`
/// for an empty signal or when fewer than two peaks are found on the row.
pub fn wavelet_bpm(signal: ArrayView1<f64>, fps: f64, config: &WaveletConfig) -> Option<f64> {
    if signal.is_empty() {
        return None;
    }
    let scales = config.scales(fps);
    if scales.is_empty() {
        return None;
    }

    let mut best_sum = 0.0_f64;
    let mut best_row: Option<Array1<f64>> = None;
    for (i, &a) in scales.iter().enumerate() {
        let row = cwt_row(signal, a);
        let sum = row.sum();
        if i == 0 || sum > best_sum {
            best_sum = best_sum.max(sum);
            best_row = Some(row);
        }
    }
    let row = best_row?;

    let peaks = beat_peaks(row.view(), fps, config.max_bpm, config.prominence);
    log::debug!("wavelet: {} scales, {} peaks on the dominant row", scales.len(), peaks.len());
    trimmed_interval_bpm(&peaks, fps)
}
