//! Sliding-window machinery shared by the adaptive CHROM and POS extractors.
//!
//! Both normalize the whole trace by its channel means, cut it into short
//! overlapping windows, combine two projections per window with a clamped
//! alpha and concatenate the window outputs. The concatenated signal is then
//! cleaned up once: detrend, zero-phase band-pass, Gaussian smoothing.
//!
//! Consecutive windows overlap, so the concatenation repeats stretches of
//! the clip and jumps in phase at every seam. Alongside it an aligned
//! waveform is built on the clip's own frame axis: the two projections over
//! the whole trace, combined with each frame's alpha averaged over the windows
//! that cover it, and cleaned up the same way.

use ndarray::{Array1, ArrayView1};

use super::{channel_means, PulseWaveform};
use crate::dsp::{bandpass, detrend, gaussian_smooth, std_dev, BandpassConfig, FilterMode};
use crate::error::{FilterOutcome, Filtered, Result, RppgError};
use crate::trace::RgbTrace;

/// Windows whose projections have a std at or below this are skipped.
const MIN_WINDOW_STD: f64 = 1e-6;

/// Parameters of the adaptive extractors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveParams {
    /// Window duration in seconds
    pub window_seconds: f64,
    /// Fraction of a window shared with the next one, in [0, 1)
    pub overlap: f64,
    /// Band used per window and in post-processing
    pub band: BandpassConfig,
    /// Gaussian smoothing sigma, in seconds
    pub smoothing_seconds: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            window_seconds: 2.0,
            overlap: 0.75,
            band: BandpassConfig::new(0.7, 4.0, 4),
            smoothing_seconds: 0.1,
            alpha_min: 0.1,
            alpha_max: 10.0,
        }
    }
}

impl AdaptiveParams {
    /// Window length and step in frames.
    pub(crate) fn geometry(&self, fps: f64) -> Result<(usize, usize)> {
        let window = (self.window_seconds * fps).floor();
        if !window.is_finite() || window < 2.0 {
            return Err(RppgError::InvalidWindowParameter {
                name: "window_seconds",
                value: self.window_seconds,
            });
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(RppgError::InvalidWindowParameter {
                name: "overlap",
                value: self.overlap,
            });
        }
        let window = window as usize;
        let step = (((1.0 - self.overlap) * window as f64).floor() as usize).max(1);
        Ok((window, step))
    }

    /// `σ(a) / σ(b)` clamped into `[alpha_min, alpha_max]`, or `None`
    /// when either projection is flat.
    pub(crate) fn alpha(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
        let (sa, sb) = (std_dev(a), std_dev(b));
        if sa <= MIN_WINDOW_STD || sb <= MIN_WINDOW_STD {
            return None;
        }
        Some((sa / sb).max(self.alpha_min).min(self.alpha_max))
    }
}

/// One window's combined pulse and the alpha that produced it.
pub(crate) struct WindowPulse {
    pub pulse: Filtered<Array1<f64>>,
    pub alpha: f64,
}

/// The per-window and whole-trace halves of an adaptive extractor.
pub(crate) trait WindowCombiner {
    /// Combine the window `lo..hi`, or `None` to skip it.
    fn combine(&self, channels: &[Array1<f64>; 3], fps: f64, lo: usize, hi: usize) -> Option<WindowPulse>;

    /// The two projections over the whole trace, `pulse = a - alpha * b`.
    fn projections(&self, channels: &[Array1<f64>; 3]) -> Filtered<[Array1<f64>; 2]>;
}

/// Concatenated window outputs plus the kept windows and their alphas.
pub(crate) struct Concatenated {
    pub signal: Vec<f64>,
    pub outcome: FilterOutcome,
    pub alphas: Vec<(usize, usize, f64)>,
}

/// Trace normalized by its whole-clip channel means, one array per channel.
pub(crate) fn normalized_channels(trace: &RgbTrace) -> [Array1<f64>; 3] {
    let means = channel_means(trace.samples().iter());
    [0, 1, 2].map(|c| {
        trace
            .samples()
            .iter()
            .map(|s| s[c] / means[c])
            .collect()
    })
}

/// Run `combine` over every window start and concatenate the windows it
/// keeps.
pub(crate) fn concat_windows<F>(len: usize, window: usize, step: usize, mut combine: F) -> Concatenated
where
    F: FnMut(usize, usize) -> Option<WindowPulse>,
{
    let mut out = Concatenated {
        signal: Vec::new(),
        outcome: FilterOutcome::Clean,
        alphas: Vec::new(),
    };
    let mut total = 0usize;

    let mut start = 0;
    while start + window <= len {
        total += 1;
        if let Some(WindowPulse { pulse, alpha }) = combine(start, start + window) {
            out.outcome = out.outcome.merge(pulse.outcome());
            out.signal.extend(pulse.into_inner());
            out.alphas.push((start, start + window, alpha));
        }
        start += step;
    }

    log::debug!(
        "adaptive windows kept {}/{total} (window={window}, step={step})",
        out.alphas.len()
    );
    out
}

/// Per-frame alpha: the mean over the kept windows covering the frame, or
/// the mean over all kept windows where none does.
pub(crate) fn alpha_track(len: usize, alphas: &[(usize, usize, f64)]) -> Array1<f64> {
    let mut sum = Array1::<f64>::zeros(len);
    let mut count = vec![0usize; len];
    for &(lo, hi, alpha) in alphas {
        for i in lo..hi.min(len) {
            sum[i] += alpha;
            count[i] += 1;
        }
    }
    let fallback = if alphas.is_empty() {
        0.0
    } else {
        alphas.iter().map(|w| w.2).sum::<f64>() / alphas.len() as f64
    };
    for (v, &n) in sum.iter_mut().zip(&count) {
        *v = if n == 0 { fallback } else { *v / n as f64 };
    }
    sum
}

/// Global clean-up: detrend, zero-phase band-pass, Gaussian smoothing.
pub(crate) fn postprocess(signal: Array1<f64>, fps: f64, params: &AdaptiveParams) -> Filtered<Array1<f64>> {
    let detrended = detrend(signal.view());
    let filtered = bandpass(detrended.view(), &params.band, fps, FilterMode::ZeroPhase);
    let outcome = filtered.outcome();
    let smoothed = gaussian_smooth(filtered.into_inner().view(), params.smoothing_seconds * fps);
    Filtered::from_outcome(smoothed, outcome)
}

/// Validation and windowing common to both adaptive extractors, then the
/// post-processing of the concatenated and the aligned waveform.
pub(crate) fn extract_adaptive<C>(trace: &RgbTrace, params: &AdaptiveParams, combiner: &C) -> Result<PulseWaveform>
where
    C: WindowCombiner + ?Sized,
{
    trace.validate(1)?;
    let fps = trace.fps();
    let (window, step) = params.geometry(fps)?;
    trace.validate(window)?;

    let channels = normalized_channels(trace);
    let windows = concat_windows(trace.len(), window, step, |lo, hi| combiner.combine(&channels, fps, lo, hi));

    if windows.signal.is_empty() {
        return Err(RppgError::NotEnoughData {
            required: window,
            actual: 0,
        });
    }

    let projections = combiner.projections(&channels);
    let mut outcome = windows.outcome.merge(projections.outcome());
    let [a, b] = projections.into_inner();
    let aligned = &a - &(&alpha_track(trace.len(), &windows.alphas) * &b);

    let concatenated = postprocess(Array1::from(windows.signal), fps, params);
    let aligned = postprocess(aligned, fps, params);
    outcome = outcome.merge(concatenated.outcome()).merge(aligned.outcome());

    Ok(PulseWaveform::new(concatenated.into_inner(), fps, outcome).with_aligned(aligned.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_geometry_defaults() {
        let params = AdaptiveParams::default();
        assert_eq!(params.geometry(30.0).unwrap(), (60, 15));
        assert_eq!(params.geometry(15.0).unwrap(), (30, 7));
    }

    #[test]
    fn test_geometry_rejects_bad_overlap() {
        let params = AdaptiveParams {
            overlap: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            params.geometry(30.0),
            Err(RppgError::InvalidWindowParameter { name: "overlap", .. })
        ));
    }

    #[test]
    fn test_alpha_clamped() {
        let params = AdaptiveParams::default();
        let big = array![0.0, 100.0, 0.0, 100.0];
        let small = array![0.0, 1.0, 0.0, 1.0];
        assert_eq!(params.alpha(big.view(), small.view()), Some(10.0));
        assert_eq!(params.alpha(small.view(), big.view()), Some(0.1));
        let flat = array![1.0, 1.0, 1.0, 1.0];
        assert_eq!(params.alpha(big.view(), flat.view()), None);
    }

    #[test]
    fn test_concat_windows_positions() {
        let mut seen = Vec::new();
        let out = concat_windows(10, 4, 2, |lo, hi| {
            seen.push((lo, hi));
            Some(WindowPulse {
                pulse: Filtered::Clean(Array1::from_elem(hi - lo, lo as f64)),
                alpha: 1.0,
            })
        });
        assert_eq!(seen, vec![(0, 4), (2, 6), (4, 8), (6, 10)]);
        assert_eq!(out.signal.len(), 16);
        assert_eq!(out.alphas.len(), 4);
        assert_eq!(out.outcome, FilterOutcome::Clean);
    }

    #[test]
    fn test_concat_windows_tracks_degraded() {
        let out = concat_windows(8, 4, 4, |lo, _| {
            (lo != 0).then(|| WindowPulse {
                pulse: Filtered::Degraded(Array1::zeros(4)),
                alpha: 2.0,
            })
        });
        assert_eq!(out.signal.len(), 4);
        assert_eq!(out.alphas, vec![(4, 8, 2.0)]);
        assert_eq!(out.outcome, FilterOutcome::Degraded);
    }

    #[test]
    fn test_alpha_track_averages_covering_windows() {
        let track = alpha_track(7, &[(0, 4, 1.0), (2, 6, 3.0)]);
        assert_eq!(track, array![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 2.0]);
        assert_eq!(alpha_track(2, &[]), array![0.0, 0.0]);
    }
}
