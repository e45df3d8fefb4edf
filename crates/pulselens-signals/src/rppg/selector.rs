//! Signal-quality selection between competing extractor outputs.
//!
//! Quality is the ratio of mean spectral power inside the heart-rate band
//! to mean power outside it. The band mask is applied on the signed DFT
//! frequency axis, so negative-frequency bins always count as noise.

use ndarray::ArrayView1;
use serde::Serialize;

use super::{Algorithm, PulseWaveform};
use crate::dsp::{fft, fft_frequencies};
use crate::error::{Result, RppgError};

/// Candidate score as reported alongside a selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub algorithm: Algorithm,
    /// `None` when the extractor failed.
    pub snr: Option<f64>,
}

/// Winning waveform plus the scores every candidate received.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub algorithm: Algorithm,
    pub waveform: PulseWaveform,
    pub scores: Vec<CandidateScore>,
}

/// SNR-based selector over a frequency band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySelector {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl Default for QualitySelector {
    fn default() -> Self {
        Self {
            low_hz: 0.7,
            high_hz: 4.0,
        }
    }
}

impl QualitySelector {
    pub fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    /// In-band over out-of-band mean power.
    ///
    /// Returns 0 for an empty signal or an empty band, and `+∞` when the
    /// out-of-band power is exactly zero.
    pub fn snr(&self, signal: ArrayView1<f64>, fps: f64) -> f64 {
        if signal.is_empty() {
            return 0.0;
        }
        let spectrum = fft(signal);
        let freqs = fft_frequencies(signal.len(), fps);

        let (mut in_sum, mut in_count) = (0.0, 0usize);
        let (mut out_sum, mut out_count) = (0.0, 0usize);
        for (c, &f) in spectrum.iter().zip(&freqs) {
            let power = c.norm_sqr();
            if f >= self.low_hz && f <= self.high_hz {
                in_sum += power;
                in_count += 1;
            } else {
                out_sum += power;
                out_count += 1;
            }
        }

        if in_count == 0 {
            return 0.0;
        }
        let signal_power = in_sum / in_count as f64;
        let noise_power = if out_count == 0 {
            0.0
        } else {
            out_sum / out_count as f64
        };
        if noise_power == 0.0 {
            return f64::INFINITY;
        }
        let snr = signal_power / noise_power;
        if snr.is_nan() {
            0.0
        } else {
            snr
        }
    }

    /// Pick the candidate with the highest SNR.
    ///
    /// Failed candidates are skipped. Ties go to the later candidate, so
    /// list the preferred algorithm last.
    pub fn select(&self, candidates: Vec<(Algorithm, Result<PulseWaveform>)>) -> Result<Selection> {
        let mut scores = Vec::with_capacity(candidates.len());
        let mut best: Option<(Algorithm, PulseWaveform, f64)> = None;

        for (algorithm, outcome) in candidates {
            match outcome {
                Ok(waveform) => {
                    let snr = self.snr(waveform.timeline(), waveform.fps());
                    log::debug!("{algorithm}: SNR {snr:.4}");
                    scores.push(CandidateScore {
                        algorithm,
                        snr: Some(snr),
                    });
                    let better = best.as_ref().map_or(true, |(_, _, top)| snr >= *top);
                    if better {
                        best = Some((algorithm, waveform, snr));
                    }
                }
                Err(e) => {
                    log::warn!("{algorithm} failed: {e}");
                    scores.push(CandidateScore {
                        algorithm,
                        snr: None,
                    });
                }
            }
        }

        let (algorithm, waveform, snr) = best.ok_or(RppgError::AllExtractorsFailed)?;
        log::info!("selected {algorithm} (SNR {snr:.4})");
        Ok(Selection {
            algorithm,
            waveform,
            scores,
        })
    }
}

/// [`QualitySelector::snr`] over the default 0.7-4 Hz band.
pub fn band_snr(waveform: &PulseWaveform) -> f64 {
    QualitySelector::default().snr(waveform.timeline(), waveform.fps())
}

/// [`QualitySelector::select`] over the default 0.7-4 Hz band.
pub fn select(candidates: Vec<(Algorithm, Result<PulseWaveform>)>) -> Result<Selection> {
    QualitySelector::default().select(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterOutcome;
    use ndarray::Array1;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn wave(samples: Array1<f64>) -> PulseWaveform {
        PulseWaveform::new(samples, 30.0, FilterOutcome::Clean)
    }

    fn sine(freq: f64, n: usize) -> Array1<f64> {
        Array1::from_shape_fn(n, |i| (2.0 * PI * freq * i as f64 / 30.0).sin())
    }

    fn noise(n: usize, seed: u64) -> Array1<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_snr_edge_cases() {
        assert_eq!(band_snr(&wave(Array1::zeros(0))), 0.0);
        // Two samples at 30 fps: bins at 0 and -15 Hz, none in band
        assert_eq!(band_snr(&wave(Array1::from_vec(vec![1.0, 2.0]))), 0.0);
    }

    #[test]
    fn test_snr_sine_beats_noise() {
        let clean = band_snr(&wave(sine(1.0, 300)));
        let noisy = band_snr(&wave(noise(300, 7)));
        assert!(clean > noisy);
        assert!(clean > 1.0);
    }

    #[test]
    fn test_select_strong_pulse() {
        let candidates = vec![
            (Algorithm::AdaptiveChrom, Ok(wave(sine(1.0, 300) * 5.0 + noise(300, 1)))),
            (Algorithm::AdaptivePos, Ok(wave(noise(300, 2)))),
        ];
        let selection = select(candidates).unwrap();
        assert_eq!(selection.algorithm, Algorithm::AdaptiveChrom);
        assert_eq!(selection.scores.len(), 2);
    }

    #[test]
    fn test_tie_goes_to_later() {
        let s = sine(1.2, 300);
        let candidates = vec![
            (Algorithm::AdaptiveChrom, Ok(wave(s.clone()))),
            (Algorithm::AdaptivePos, Ok(wave(s))),
        ];
        assert_eq!(select(candidates).unwrap().algorithm, Algorithm::AdaptivePos);
    }

    #[test]
    fn test_single_success_and_failures() {
        let candidates = vec![
            (Algorithm::AdaptiveChrom, Err(RppgError::EmptyData)),
            (Algorithm::AdaptivePos, Ok(wave(noise(300, 3)))),
        ];
        let selection = select(candidates).unwrap();
        assert_eq!(selection.algorithm, Algorithm::AdaptivePos);
        assert_eq!(selection.scores[0].snr, None);

        let none: Vec<(Algorithm, Result<PulseWaveform>)> = vec![
            (Algorithm::AdaptiveChrom, Err(RppgError::EmptyData)),
            (Algorithm::AdaptivePos, Err(RppgError::EmptyData)),
        ];
        assert_eq!(select(none), Err(RppgError::AllExtractorsFailed));
    }
}
