//! Spectral peak heart-rate estimate.

use ndarray::ArrayView1;

use crate::dsp::{fft_frequencies, magnitude_spectrum};

/// Default heart-rate band in Hz (42-240 BPM).
pub const HEART_RATE_BAND: (f64, f64) = (0.7, 4.0);

const NEGLIGIBLE_MAGNITUDE: f64 = 1e-12;

/// Frequency of the strongest spectral bin in 0.7-4 Hz, in BPM.
///
/// Returns 0 when no positive-frequency bin falls in the band or the band
/// holds no energy at all.
pub fn fft_peak_bpm(signal: ArrayView1<f64>, fps: f64) -> f64 {
    fft_peak_bpm_in_band(signal, fps, HEART_RATE_BAND.0, HEART_RATE_BAND.1)
}

/// [`fft_peak_bpm`] over an arbitrary `[low_hz, high_hz]` band.
///
/// No window and no zero padding: resolution is `fps / n`. Only the first
/// `⌊n/2⌋` bins are searched and the first maximal bin wins.
pub fn fft_peak_bpm_in_band(signal: ArrayView1<f64>, fps: f64, low_hz: f64, high_hz: f64) -> f64 {
    let n = signal.len();
    if n == 0 {
        return 0.0;
    }
    let magnitudes = magnitude_spectrum(signal);
    let freqs = fft_frequencies(n, fps);
    // Below this the band is numerically empty (constant or zero input).
    let floor = NEGLIGIBLE_MAGNITUDE * n as f64 * signal.iter().fold(0.0_f64, |m, v| m.max(v.abs()));

    let mut best: Option<(f64, f64)> = None;
    for k in 0..n / 2 {
        let f = freqs[k];
        if f < low_hz || f > high_hz {
            continue;
        }
        let m = magnitudes[k];
        if best.map_or(true, |(_, top)| m > top) {
            best = Some((f, m));
        }
    }

    match best {
        Some((f, m)) if m > floor => f * 60.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array1;
    use std::f64::consts::PI;

    fn sine(freq: f64, fps: f64, n: usize) -> Array1<f64> {
        Array1::from_shape_fn(n, |i| (2.0 * PI * freq * i as f64 / fps).sin())
    }

    #[test]
    fn test_pure_tone() {
        assert_relative_eq!(fft_peak_bpm(sine(1.2, 30.0, 300).view(), 30.0), 72.0, epsilon = 1e-9);
        assert_relative_eq!(fft_peak_bpm(sine(2.5, 30.0, 300).view(), 30.0), 150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_band_tone_is_ignored() {
        let x = sine(0.3, 30.0, 300) * 10.0 + sine(1.5, 30.0, 300);
        assert_relative_eq!(fft_peak_bpm(x.view(), 30.0), 90.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(fft_peak_bpm(Array1::<f64>::zeros(0).view(), 30.0), 0.0);
        assert_eq!(fft_peak_bpm(Array1::<f64>::zeros(300).view(), 30.0), 0.0);
        assert_eq!(fft_peak_bpm(Array1::from_elem(300, 4.0).view(), 30.0), 0.0);
        // 4 samples at 30 fps: the only positive bin is 7.5 Hz
        assert_eq!(fft_peak_bpm(sine(1.0, 30.0, 4).view(), 30.0), 0.0);
    }
}
