//! FFT helpers shared by the quality selector and the spectral estimators.

use ndarray::ArrayView1;
use num_complex::Complex64;
use rustfft::FftPlanner;

/// Full-length complex spectrum of a real signal (no window, no padding).
pub fn fft(signal: ArrayView1<f64>) -> Vec<Complex64> {
    let n = signal.len();
    let mut buffer: Vec<Complex64> = signal.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    if n == 0 {
        return buffer;
    }
    let mut planner = FftPlanner::new();
    let plan = planner.plan_fft_forward(n);
    plan.process(&mut buffer);
    buffer
}

/// Magnitudes of [`fft`].
pub fn magnitude_spectrum(signal: ArrayView1<f64>) -> Vec<f64> {
    fft(signal).into_iter().map(|c| c.norm()).collect()
}

/// Bin centre frequencies in the standard DFT layout: `0, 1, ..., ⌈n/2⌉-1`
/// then the negative half, all scaled by `fps / n`.
pub fn fft_frequencies(n: usize, fps: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let step = fps / n as f64;
    let positive = n.div_ceil(2);
    (0..n)
        .map(|k| {
            if k < positive {
                k as f64 * step
            } else {
                -((n - k) as f64) * step
            }
        })
        .collect()
}
