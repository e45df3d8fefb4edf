//! Basic statistics over 1-D signals.

use ndarray::{Array1, ArrayView1};
use std::f64::consts::PI;

/// Arithmetic mean; 0 for an empty signal.
pub fn mean(x: ArrayView1<f64>) -> f64 {
    x.mean().unwrap_or(0.0)
}

/// Population standard deviation (ddof = 0); 0 for an empty signal.
pub fn std_dev(x: ArrayView1<f64>) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let m = mean(x);
    let var = x.iter().map(|v| (v - m).powi(2)).sum::<f64>() / x.len() as f64;
    var.sqrt()
}

/// Zero-mean, unit-variance copy. A constant signal maps to zeros.
pub fn zscore(x: ArrayView1<f64>) -> Array1<f64> {
    let m = mean(x);
    let s = std_dev(x);
    if s == 0.0 || !s.is_finite() {
        return Array1::zeros(x.len());
    }
    x.mapv(|v| (v - m) / s)
}

/// Ratio `num / den` where a vanishing denominator yields 0.
#[inline]
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() {
        0.0
    } else {
        num / den
    }
}

/// Periodic Hamming window, the DFT-even form `0.54 - 0.46 cos(2πi/n)`.
pub fn hamming_window(size: usize) -> Array1<f64> {
    if size == 0 {
        return Array1::zeros(0);
    }
    Array1::from_shape_fn(size, |i| {
        0.54 - 0.46 * ((2.0 * PI * i as f64) / size as f64).cos()
    })
}
