//! ICA: blind source separation of the three colour channels.
//!
//! Channels are z-scored and band-passed, then a single independent
//! component is recovered with one-unit FastICA (Hyvärinen, 1999) using the
//! `logcosh` contrast. The starting vector comes from a seeded RNG so the
//! sign and ordering of the recovered source are reproducible.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Algorithm, PulseExtractor, PulseWaveform};
use crate::dsp::{bandpass, zscore, BandpassConfig, FilterMode};
use crate::error::{FilterOutcome, Result};
use crate::trace::{Channel, RgbTrace};

const CHANNEL_BAND: BandpassConfig = BandpassConfig::new(0.7, 4.0, 6);

/// Eigenvalues below this fraction of the largest are treated as null
/// directions during whitening.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcaExtractor {
    pub seed: u64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for IcaExtractor {
    fn default() -> Self {
        Self {
            seed: 0,
            max_iter: 200,
            tolerance: 1e-4,
        }
    }
}

impl IcaExtractor {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Whitened data (`k × n`) for the non-degenerate principal directions.
    fn whiten(data: &DMatrix<f64>) -> Option<DMatrix<f64>> {
        let n = data.ncols() as f64;
        let cov = (data * data.transpose()) / n;
        let eig = SymmetricEigen::new(cov);

        let largest = eig.eigenvalues.iter().cloned().fold(0.0_f64, f64::max);
        if largest <= 0.0 || !largest.is_finite() {
            return None;
        }

        let kept: Vec<usize> = (0..eig.eigenvalues.len())
            .filter(|&i| eig.eigenvalues[i] > largest * RANK_TOLERANCE)
            .collect();
        let k = kept.len();
        let whitening = DMatrix::from_fn(k, data.nrows(), |row, col| {
            let idx = kept[row];
            eig.eigenvectors[(col, idx)] / eig.eigenvalues[idx].sqrt()
        });
        Some(whitening * data)
    }

    /// One-unit fixed-point iteration on whitened data.
    fn fastica_one_unit(&self, z: &DMatrix<f64>) -> DVector<f64> {
        let (k, n) = (z.nrows(), z.ncols() as f64);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = DVector::<f64>::from_fn(k, |_, _| rng.gen_range(-1.0..1.0));
        if w.norm() == 0.0 {
            w[0] = 1.0;
        }
        w.normalize_mut();

        for iter in 0..self.max_iter {
            let projected = w.transpose() * z;
            let g = projected.map(f64::tanh);
            let g_prime_mean = g.iter().map(|t| 1.0 - t * t).sum::<f64>() / n;

            let mut next = (z * g.transpose()) / n - &w * g_prime_mean;
            let norm = next.norm();
            if norm == 0.0 || !norm.is_finite() {
                log::debug!("ICA: degenerate update at iteration {iter}");
                break;
            }
            next /= norm;

            let converged = (next.dot(&w).abs() - 1.0).abs() < self.tolerance;
            w = next;
            if converged {
                log::debug!("ICA: converged after {} iterations", iter + 1);
                break;
            }
        }
        w
    }
}

impl PulseExtractor for IcaExtractor {
    fn kind(&self) -> Algorithm {
        Algorithm::Ica
    }

    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform> {
        trace.validate(2)?;
        let fps = trace.fps();
        let frames = trace.len();

        let mut outcome = FilterOutcome::Clean;
        let mut data = DMatrix::<f64>::zeros(3, frames);
        for (row, channel) in [Channel::R, Channel::G, Channel::B].into_iter().enumerate() {
            let normalized = zscore(trace.channel(channel).view());
            let filtered = bandpass(normalized.view(), &CHANNEL_BAND, fps, FilterMode::Causal);
            outcome = outcome.merge(filtered.outcome());
            let filtered = filtered.into_inner();
            let mean = filtered.mean().unwrap_or(0.0);
            for (col, v) in filtered.iter().enumerate() {
                data[(row, col)] = v - mean;
            }
        }

        let source = match Self::whiten(&data) {
            Some(z) => {
                let w = self.fastica_one_unit(&z);
                let s = w.transpose() * z;
                s.iter().copied().collect::<Array1<f64>>()
            }
            None => {
                log::debug!("ICA: covariance is degenerate, returning a flat source");
                Array1::zeros(frames)
            }
        };

        Ok(PulseWaveform::new(source, fps, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RppgError;
    use crate::rppg::test_support::{dominant_hz, pulse_trace};
    use std::f64::consts::PI;

    #[test]
    fn test_requires_two_frames() {
        let trace = RgbTrace::new(vec![[1.0, 2.0, 3.0]], 30.0);
        assert_eq!(
            IcaExtractor::default().extract(&trace),
            Err(RppgError::NotEnoughData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_deterministic() {
        let trace = pulse_trace(1.3, 30.0, 300);
        let a = IcaExtractor::new(0).extract(&trace).unwrap();
        let b = IcaExtractor::new(0).extract(&trace).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_flat_trace_gives_zeros() {
        let trace = RgbTrace::new(vec![[90.0, 80.0, 70.0]; 120], 30.0);
        let wave = IcaExtractor::default().extract(&trace).unwrap();
        assert_eq!(wave.len(), 120);
        assert!(wave.samples().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_separates_pulse_from_square_wave() {
        let fps = 30.0;
        let samples = (0..900)
            .map(|i| {
                let t = i as f64 / fps;
                let pulse = (2.0 * PI * 1.2 * t).sin();
                let flicker = if (2.0 * PI * 0.8 * t).sin() >= 0.0 { 1.0 } else { -1.0 };
                [
                    100.0 + 0.5 * pulse + 1.0 * flicker,
                    100.0 + 1.0 * pulse + 0.3 * flicker,
                    100.0 + 0.2 * pulse + 0.8 * flicker,
                ]
            })
            .collect();
        let trace = RgbTrace::new(samples, fps);
        let wave = IcaExtractor::default().extract(&trace).unwrap();
        assert!(wave.samples().iter().all(|v| v.is_finite()));
        let f = dominant_hz(wave.view(), fps);
        assert!((f - 1.2).abs() < 0.1 || (f - 0.8).abs() < 0.1);
    }
}
