//! Remote Photoplethysmography (rPPG) pulse extraction
//!
//! Turns a facial colour trace into a blood-volume-pulse proxy waveform.
//!
//! Implements:
//! - **CHROM**: Chrominance-based method (De Haan & Jeanne, 2013), in the
//!   segment-stitched form and an adaptive sliding-window form
//! - **POS**: Plane-Orthogonal-to-Skin (Wang et al., 2017), overlap-add and
//!   adaptive forms
//! - **ICA**: single-component FastICA over the three normalized channels
//! - **SSR**: Spatial Subspace Rotation (2SR, Wang et al., 2015)
//!
//! Every extractor implements [`PulseExtractor`]; [`selector`] picks the
//! best of several candidates by in-band SNR.

mod adaptive;
pub mod chrom;
pub mod ica;
pub mod pos;
pub mod selector;
pub mod ssr;

pub use adaptive::AdaptiveParams;
pub use chrom::{AdaptiveChromExtractor, ChromExtractor};
pub use ica::IcaExtractor;
pub use pos::{AdaptivePosExtractor, PosExtractor};
pub use selector::{band_snr, select, QualitySelector, Selection};
pub use ssr::SsrExtractor;

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FilterOutcome, Result, RppgError};
use crate::trace::RgbTrace;

/// Substitute for a zero channel mean during normalization.
pub(crate) const ZERO_MEAN_EPS: f64 = 1e-6;

/// Extraction algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Chrom,
    AdaptiveChrom,
    Pos,
    AdaptivePos,
    Ica,
    Ssr,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Chrom => "CHROM",
            Algorithm::AdaptiveChrom => "CHROM (adaptive)",
            Algorithm::Pos => "POS",
            Algorithm::AdaptivePos => "POS (adaptive)",
            Algorithm::Ica => "ICA",
            Algorithm::Ssr => "SSR",
        };
        f.write_str(name)
    }
}

/// Pulse waveform produced by an extractor.
///
/// Only its frequency content is meaningful; amplitude is arbitrary.
///
/// `samples` is the extractor's raw output. Windowed extractors whose output
/// is not on the trace's frame axis also carry an aligned waveform, one
/// sample per frame, which is what rate estimation should read.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseWaveform {
    samples: Array1<f64>,
    aligned: Option<Array1<f64>>,
    fps: f64,
    filter: FilterOutcome,
}

impl PulseWaveform {
    pub fn new(samples: Array1<f64>, fps: f64, filter: FilterOutcome) -> Self {
        Self {
            samples,
            aligned: None,
            fps,
            filter,
        }
    }

    pub fn with_aligned(mut self, aligned: Array1<f64>) -> Self {
        self.aligned = Some(aligned);
        self
    }

    pub fn aligned(&self) -> Option<&Array1<f64>> {
        self.aligned.as_ref()
    }

    /// The waveform on the trace's frame axis: the aligned samples when
    /// present, the raw output otherwise.
    pub fn timeline(&self) -> ArrayView1<'_, f64> {
        self.aligned.as_ref().unwrap_or(&self.samples).view()
    }

    pub fn samples(&self) -> &Array1<f64> {
        &self.samples
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.samples.view()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Whether any filtering stage fell back to unfiltered data.
    pub fn filter(&self) -> FilterOutcome {
        self.filter
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Array1<f64> {
        self.samples
    }
}

/// A pulse extraction algorithm.
pub trait PulseExtractor: Send + Sync {
    fn kind(&self) -> Algorithm;

    /// Derive a pulse waveform from the trace.
    ///
    /// Validation runs in a fixed order: `EmptyData`, `WrongFps`,
    /// `InvalidWindowParameter`, `NotEnoughData`.
    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform>;
}

/// Resolve an explicit window length or fall back to a default.
pub(crate) fn resolve_window(
    explicit: Option<usize>,
    default: usize,
    name: &'static str,
) -> Result<usize> {
    let window = explicit.unwrap_or(default);
    if window == 0 {
        return Err(RppgError::InvalidWindowParameter {
            name,
            value: window as f64,
        });
    }
    Ok(window)
}

/// Per-channel means over `samples`, zero means replaced by [`ZERO_MEAN_EPS`].
pub(crate) fn channel_means<'a, I>(samples: I) -> [f64; 3]
where
    I: IntoIterator<Item = &'a [f64; 3]>,
{
    let mut sum = [0.0; 3];
    let mut count = 0usize;
    for s in samples {
        for c in 0..3 {
            sum[c] += s[c];
        }
        count += 1;
    }
    sum.map(|total| {
        let m = if count == 0 { 0.0 } else { total / count as f64 };
        if m == 0.0 {
            ZERO_MEAN_EPS
        } else {
            m
        }
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::trace::RgbTrace;
    use std::f64::consts::PI;

    /// Skin-like trace with a pulse of `freq` Hz riding mostly on green.
    pub fn pulse_trace(freq: f64, fps: f64, frames: usize) -> RgbTrace {
        let samples = (0..frames)
            .map(|i| {
                let t = i as f64 / fps;
                let p = (2.0 * PI * freq * t).sin();
                let drift = 0.02 * (2.0 * PI * 0.1 * t).sin();
                [
                    150.0 + 0.6 * p + drift,
                    100.0 + 1.2 * p + drift,
                    80.0 + 0.4 * p + drift,
                ]
            })
            .collect();
        RgbTrace::new(samples, fps)
    }

    /// Dominant frequency of `x` within 0.7-4 Hz, by DFT magnitude.
    pub fn dominant_hz(x: ndarray::ArrayView1<f64>, fps: f64) -> f64 {
        crate::bpm::fft_peak_bpm(x, fps) / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_display() {
        assert_eq!(Algorithm::Chrom.to_string(), "CHROM");
        assert_eq!(Algorithm::AdaptivePos.to_string(), "POS (adaptive)");
    }

    #[test]
    fn test_resolve_window() {
        assert_eq!(resolve_window(None, 15, "l").unwrap(), 15);
        assert_eq!(resolve_window(Some(20), 15, "l").unwrap(), 20);
        assert!(matches!(
            resolve_window(Some(0), 15, "l"),
            Err(RppgError::InvalidWindowParameter { name: "l", .. })
        ));
    }

    #[test]
    fn test_channel_means_guard_zero() {
        let samples = [[0.0, 2.0, 4.0], [0.0, 4.0, 8.0]];
        let m = channel_means(samples.iter());
        assert_eq!(m, [ZERO_MEAN_EPS, 3.0, 6.0]);
    }
}
