//! CHROM: chrominance-based pulse extraction (De Haan & Jeanne, 2013).
//!
//! Skin-normalized colour is projected onto two chrominance axes
//!
//! ```text
//! X = 3R - 2G
//! Y = 1.5R + G - 1.5B
//! ```
//!
//! and combined as `S = X - αY`, `α = σ(X)/σ(Y)`, which cancels the
//! specular component common to both axes.

use ndarray::Array1;
use std::ops::Range;

use super::adaptive::{extract_adaptive, AdaptiveParams, WindowCombiner, WindowPulse};
use super::{channel_means, resolve_window, Algorithm, PulseExtractor, PulseWaveform};
use crate::dsp::{bandpass, detrend, hamming_window, safe_ratio, std_dev, BandpassConfig, FilterMode};
use crate::error::{FilterOutcome, Filtered, Result};
use crate::trace::RgbTrace;

/// Band used inside the stitched segments.
const SEGMENT_BAND: BandpassConfig = BandpassConfig::new(0.5, 4.0, 6);

fn chrominance(r: f64, g: f64, b: f64) -> (f64, f64) {
    (3.0 * r - 2.0 * g, 1.5 * r + g - 1.5 * b)
}

/// Segment-stitched CHROM.
///
/// The trace is cut into half-overlapping segments of `interval` frames.
/// Each segment is processed on its own and the results are blended back
/// with a Hamming window. Segments hanging over either end of the trace
/// are zero-padded there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChromExtractor {
    /// Segment length in frames; `None` derives `⌊fps·32/20⌋`.
    pub interval: Option<usize>,
}

impl ChromExtractor {
    pub fn new(interval: Option<usize>) -> Self {
        Self { interval }
    }

    /// Segment bounds `[lo, hi]` (inclusive, may fall outside the trace).
    fn segments(frames: usize, interval: usize) -> Vec<(isize, isize)> {
        let count = 2 * frames / interval + 1;
        let half = interval as f64 / 2.0;
        (0..count)
            .map(|i| {
                let lo = ((i as f64 - 1.0) * half + 1.0).trunc() as isize;
                let hi = ((i as f64 + 1.0) * half).trunc() as isize;
                (lo, hi)
            })
            .collect()
    }

    /// Frames covered only by the first or last segment. These keep their
    /// unweighted value when the segments are stitched.
    fn unweighted_ranges(segments: &[(isize, isize)]) -> (Range<isize>, Range<isize>) {
        let last = segments.len() - 1;
        let head = segments[0].0.max(0)..segments[1].0;
        let tail = segments[last - 1].1 + 1..segments[last].1;
        (head, tail)
    }

    fn segment_signal(trace: &RgbTrace, lo: isize, hi: isize) -> Filtered<Array1<f64>> {
        let frames = trace.len() as isize;
        let real_lo = lo.max(0) as usize;
        let real_hi = (hi + 1).min(frames).max(lo.max(0)) as usize;
        let means = channel_means(trace.samples()[real_lo..real_hi].iter());

        let len = (hi - lo + 1) as usize;
        let mut x = Array1::zeros(len);
        let mut y = Array1::zeros(len);
        for (k, idx) in (lo..=hi).enumerate() {
            if idx < 0 || idx >= frames {
                continue;
            }
            let s = trace.samples()[idx as usize];
            let (xs, ys) = chrominance(s[0] / means[0], s[1] / means[1], s[2] / means[2]);
            x[k] = xs;
            y[k] = ys;
        }

        let fps = trace.fps();
        let xf = bandpass(detrend(x.view()).view(), &SEGMENT_BAND, fps, FilterMode::Causal);
        let yf = bandpass(detrend(y.view()).view(), &SEGMENT_BAND, fps, FilterMode::Causal);
        let degraded = xf.is_degraded() || yf.is_degraded();
        let (xf, yf) = (xf.into_inner(), yf.into_inner());

        let alpha = safe_ratio(std_dev(xf.view()), std_dev(yf.view()));
        let s = &xf - &(alpha * &yf);
        if degraded {
            Filtered::Degraded(s)
        } else {
            Filtered::Clean(s)
        }
    }
}

impl PulseExtractor for ChromExtractor {
    fn kind(&self) -> Algorithm {
        Algorithm::Chrom
    }

    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform> {
        trace.validate(1)?;
        let fps = trace.fps();
        let interval = resolve_window(self.interval, (fps * 32.0 / 20.0) as usize, "interval")?;
        trace.validate(interval)?;

        let frames = trace.len();
        let segments = Self::segments(frames, interval);
        let window = hamming_window(interval);

        let (head, tail) = Self::unweighted_ranges(&segments);
        let unweighted = |i: isize| head.contains(&i) || tail.contains(&i);

        let mut out = Array1::<f64>::zeros(frames);
        let mut outcome = FilterOutcome::Clean;
        for &(lo, hi) in &segments {
            let piece = Self::segment_signal(trace, lo, hi);
            outcome = outcome.merge(piece.outcome());
            let piece = piece.into_inner();
            for (k, idx) in (lo..=hi).enumerate() {
                if idx < 0 || idx >= frames as isize {
                    continue;
                }
                let weight = if unweighted(idx) {
                    1.0
                } else {
                    window.get(k).copied().unwrap_or(0.0)
                };
                out[idx as usize] += piece[k] * weight;
            }
        }

        log::debug!(
            "CHROM: {} segments of {} frames, filter {:?}",
            segments.len(),
            interval,
            outcome
        );
        Ok(PulseWaveform::new(out, fps, outcome))
    }
}

/// Sliding-window CHROM with clamped alpha and concatenated output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdaptiveChromExtractor {
    pub params: AdaptiveParams,
}

impl AdaptiveChromExtractor {
    pub fn new(params: AdaptiveParams) -> Self {
        Self { params }
    }
}

/// Detrended X and Y over `lo..hi`.
fn chrominance_axes([r, g, b]: &[Array1<f64>; 3], lo: usize, hi: usize) -> [Array1<f64>; 2] {
    let mut x = Array1::zeros(hi - lo);
    let mut y = Array1::zeros(hi - lo);
    for (k, i) in (lo..hi).enumerate() {
        let (xs, ys) = chrominance(r[i], g[i], b[i]);
        x[k] = xs;
        y[k] = ys;
    }
    [detrend(x.view()), detrend(y.view())]
}

impl WindowCombiner for AdaptiveChromExtractor {
    fn combine(&self, channels: &[Array1<f64>; 3], fps: f64, lo: usize, hi: usize) -> Option<WindowPulse> {
        let [x, y] = chrominance_axes(channels, lo, hi);
        let xf = bandpass(x.view(), &self.params.band, fps, FilterMode::Causal);
        let yf = bandpass(y.view(), &self.params.band, fps, FilterMode::Causal);
        let outcome = xf.outcome().merge(yf.outcome());
        let (xf, yf) = (xf.into_inner(), yf.into_inner());

        let alpha = self.params.alpha(xf.view(), yf.view())?;
        Some(WindowPulse {
            pulse: Filtered::from_outcome(&xf - &(alpha * &yf), outcome),
            alpha,
        })
    }

    // Left unfiltered: the zero-phase post-processing band-limits the
    // aligned waveform without a start-up transient.
    fn projections(&self, channels: &[Array1<f64>; 3]) -> Filtered<[Array1<f64>; 2]> {
        Filtered::Clean(chrominance_axes(channels, 0, channels[0].len()))
    }
}

impl PulseExtractor for AdaptiveChromExtractor {
    fn kind(&self) -> Algorithm {
        Algorithm::AdaptiveChrom
    }

    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform> {
        extract_adaptive(trace, &self.params, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RppgError;
    use crate::rppg::test_support::{dominant_hz, pulse_trace};

    #[test]
    fn test_segment_bounds() {
        let segs = ChromExtractor::segments(48, 24);
        assert_eq!(segs.len(), 5);
        assert_eq!(segs[0], (-11, 12));
        assert_eq!(segs[1], (1, 24));
        assert_eq!(segs[4], (37, 60));
        assert!(segs.iter().all(|(lo, hi)| hi - lo + 1 == 24 || *lo < 0));
    }

    #[test]
    fn test_unweighted_ranges() {
        let segs = ChromExtractor::segments(48, 24);
        let (head, tail) = ChromExtractor::unweighted_ranges(&segs);
        assert_eq!(head, 0..1);
        // Stops before the last segment's upper bound
        assert_eq!(tail, 49..60);
        assert!(!tail.contains(&60));
    }

    #[test]
    fn test_default_interval() {
        let trace = pulse_trace(1.2, 20.0, 31);
        // 20 fps gives a 32-frame interval
        assert_eq!(
            ChromExtractor::default().extract(&trace),
            Err(RppgError::NotEnoughData {
                required: 32,
                actual: 31
            })
        );
        let trace = pulse_trace(1.2, 20.0, 32);
        assert_eq!(ChromExtractor::default().extract(&trace).unwrap().len(), 32);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let trace = pulse_trace(1.2, 30.0, 100);
        assert!(matches!(
            ChromExtractor::new(Some(0)).extract(&trace),
            Err(RppgError::InvalidWindowParameter { name: "interval", .. })
        ));
    }

    #[test]
    fn test_validation_order() {
        let empty = RgbTrace::new(vec![], 30.0);
        assert_eq!(ChromExtractor::default().extract(&empty), Err(RppgError::EmptyData));
        let slow = pulse_trace(1.2, 8.0, 100);
        assert_eq!(
            ChromExtractor::new(Some(0)).extract(&slow),
            Err(RppgError::WrongFps { fps: 8.0 })
        );
    }

    #[test]
    fn test_legacy_recovers_pulse() {
        let trace = pulse_trace(1.5, 30.0, 600);
        let wave = ChromExtractor::default().extract(&trace).unwrap();
        assert_eq!(wave.len(), 600);
        assert_eq!(wave.filter(), FilterOutcome::Clean);
        assert!((dominant_hz(wave.view(), 30.0) - 1.5).abs() < 0.1);
    }

    #[test]
    fn test_adaptive_recovers_pulse() {
        for freq in [0.8, 1.0, 1.7, 2.5] {
            let trace = pulse_trace(freq, 30.0, 600);
            let wave = AdaptiveChromExtractor::default().extract(&trace).unwrap();
            // 37 concatenated windows of 60 frames, aligned back onto 600 frames
            assert_eq!(wave.len(), 37 * 60);
            assert_eq!(wave.timeline().len(), 600);
            let bpm = dominant_hz(wave.timeline(), 30.0) * 60.0;
            assert!((bpm - freq * 60.0).abs() <= 5.0, "{freq} Hz gave {bpm} BPM");
        }
    }

    #[test]
    fn test_adaptive_exact_window() {
        let trace = pulse_trace(1.2, 30.0, 60);
        assert_eq!(AdaptiveChromExtractor::default().extract(&trace).unwrap().len(), 60);

        let short = pulse_trace(1.2, 30.0, 59);
        assert_eq!(
            AdaptiveChromExtractor::default().extract(&short),
            Err(RppgError::NotEnoughData {
                required: 60,
                actual: 59
            })
        );
    }

    #[test]
    fn test_adaptive_flat_trace_has_no_windows() {
        let trace = RgbTrace::new(vec![[120.0, 90.0, 70.0]; 300], 30.0);
        assert!(matches!(
            AdaptiveChromExtractor::default().extract(&trace),
            Err(RppgError::NotEnoughData { .. })
        ));
    }
}
