//! POS: Plane-Orthogonal-to-Skin pulse extraction (Wang et al., 2017).
//!
//! Temporally normalized colour is projected onto the plane orthogonal to
//! the skin tone,
//!
//! ```text
//! S1 =       G - B
//! S2 = -2R + G + B
//! ```
//!
//! and tuned as `h = S1 + α·S2` with `α = σ(S1)/σ(S2)`.

use ndarray::{s, Array1};

use super::adaptive::{extract_adaptive, AdaptiveParams, WindowCombiner, WindowPulse};
use super::{channel_means, resolve_window, Algorithm, PulseExtractor, PulseWaveform};
use crate::dsp::{bandpass, safe_ratio, std_dev, zscore, BandpassConfig, FilterMode};
use crate::error::{FilterOutcome, Filtered, Result};
use crate::trace::RgbTrace;

/// Band used inside each sliding window.
const WINDOW_BAND: BandpassConfig = BandpassConfig::new(0.5, 4.0, 6);

/// Projection onto the skin-orthogonal plane.
const PROJECTION: [[f64; 3]; 2] = [[0.0, 1.0, -1.0], [-2.0, 1.0, 1.0]];

/// Overlap-add POS.
///
/// A window of `l` frames slides one frame at a time; every window yields a
/// z-scored pulse segment that is added into the output at its own frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PosExtractor {
    /// Window length in frames; `None` uses `⌊fps⌋`.
    pub window: Option<usize>,
}

impl PosExtractor {
    pub fn new(window: Option<usize>) -> Self {
        Self { window }
    }

    fn window_pulse(samples: &[[f64; 3]], fps: f64) -> Filtered<Array1<f64>> {
        let means = channel_means(samples.iter());
        let project = |row: &[f64; 3]| -> Array1<f64> {
            samples
                .iter()
                .map(|s| (0..3).map(|c| row[c] * s[c] / means[c]).sum::<f64>())
                .collect()
        };
        let s1 = bandpass(project(&PROJECTION[0]).view(), &WINDOW_BAND, fps, FilterMode::Causal);
        let s2 = bandpass(project(&PROJECTION[1]).view(), &WINDOW_BAND, fps, FilterMode::Causal);
        let degraded = s1.is_degraded() || s2.is_degraded();
        let (s1, s2) = (s1.into_inner(), s2.into_inner());

        let alpha = safe_ratio(std_dev(s1.view()), std_dev(s2.view()));
        let h = zscore((&s1 + &(alpha * &s2)).view());
        if degraded {
            Filtered::Degraded(h)
        } else {
            Filtered::Clean(h)
        }
    }
}

impl PulseExtractor for PosExtractor {
    fn kind(&self) -> Algorithm {
        Algorithm::Pos
    }

    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform> {
        trace.validate(1)?;
        let fps = trace.fps();
        let l = resolve_window(self.window, fps as usize, "window")?;
        trace.validate(l)?;

        let frames = trace.len();
        let mut out = Array1::<f64>::zeros(frames);
        let mut outcome = FilterOutcome::Clean;
        for start in 0..=frames - l {
            let piece = Self::window_pulse(&trace.samples()[start..start + l], fps);
            outcome = outcome.merge(piece.outcome());
            for (k, v) in piece.into_inner().iter().enumerate() {
                out[start + k] += v;
            }
        }

        log::debug!("POS: {} windows of {} frames, filter {:?}", frames - l + 1, l, outcome);
        Ok(PulseWaveform::new(out, fps, outcome))
    }
}

/// Sliding-window POS with clamped alpha and concatenated output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdaptivePosExtractor {
    pub params: AdaptiveParams,
}

impl AdaptivePosExtractor {
    pub fn new(params: AdaptiveParams) -> Self {
        Self { params }
    }
}

/// Mean-centred `S1 = R - G` and `S2 = R + G - 2B` over `lo..hi`.
fn centred_projections([r, g, b]: &[Array1<f64>; 3], lo: usize, hi: usize) -> [Array1<f64>; 2] {
    let [r, g, b] = [r, g, b].map(|c| {
        let w = c.slice(s![lo..hi]);
        let m = w.mean().unwrap_or(0.0);
        w.mapv(|v| v - m)
    });
    [&r - &g, &r + &g - 2.0 * &b]
}

impl WindowCombiner for AdaptivePosExtractor {
    fn combine(&self, channels: &[Array1<f64>; 3], _fps: f64, lo: usize, hi: usize) -> Option<WindowPulse> {
        let [s1, s2] = centred_projections(channels, lo, hi);
        let alpha = self.params.alpha(s1.view(), s2.view())?;
        Some(WindowPulse {
            pulse: Filtered::Clean(&s1 - &(alpha * &s2)),
            alpha,
        })
    }

    fn projections(&self, channels: &[Array1<f64>; 3]) -> Filtered<[Array1<f64>; 2]> {
        Filtered::Clean(centred_projections(channels, 0, channels[0].len()))
    }
}

impl PulseExtractor for AdaptivePosExtractor {
    fn kind(&self) -> Algorithm {
        Algorithm::AdaptivePos
    }

    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform> {
        extract_adaptive(trace, &self.params, self)
    }
}
