//! SSR: Spatial Subspace Rotation (2SR, Wang, Stuijk & De Haan, 2015).
//!
//! Each frame's skin pixels define a 3×3 correlation matrix. The pulse
//! shows up as a rotation of its principal eigenvector over time, measured
//! against the orthogonal subspace of a reference frame `τ` and
//! back-projected:
//!
//! ```text
//! SR'_t = Σ_{j=2,3} sqrt(λ_t1 / λ_τj) · (u_t1 · u_τj) · u_τjᵀ
//! p     = SR'_1 - σ(SR'_1)/σ(SR'_2) · SR'_2
//! ```
//!
//! `p - mean(p)` is overlap-added over the window `[τ, τ + l)`.
//!
//! Only per-frame pixel sets carry a usable subspace; a mean-colour
//! [`RgbTrace`] is rejected.

use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use ndarray::{Array1, Array2};

use super::{resolve_window, Algorithm, PulseExtractor, PulseWaveform};
use crate::dsp::{safe_ratio, std_dev};
use crate::error::{FilterOutcome, Result, RppgError};
use crate::trace::RgbTrace;

/// Regularizer added to every eigenvalue in the scale ratios.
const EIGEN_EPS: f64 = 0.1;

const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SsrExtractor {
    /// Temporal stride `l` in frames; `None` uses 20.
    pub window: Option<usize>,
}

/// Eigen-decomposition of one frame, sorted by descending eigenvalue.
struct FrameBasis {
    values: [f64; 3],
    vectors: [Vector3<f64>; 3],
}

impl FrameBasis {
    fn from_correlation(c: Matrix3<f64>) -> Self {
        let eig = SymmetricEigen::new(c);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eig.eigenvalues[b].total_cmp(&eig.eigenvalues[a]));
        Self {
            values: order.map(|i| eig.eigenvalues[i]),
            vectors: order.map(|i| eig.eigenvectors.column(i).into_owned()),
        }
    }
}

impl SsrExtractor {
    pub fn new(window: Option<usize>) -> Self {
        Self { window }
    }

    /// Run 2SR on per-frame skin pixel sets, each an `N × 3` RGB matrix.
    pub fn extract_pixels(&self, frames: &[Array2<f64>], fps: f64) -> Result<PulseWaveform> {
        if frames.is_empty() {
            return Err(RppgError::EmptyData);
        }
        crate::error::validate_fps(fps)?;
        let l = resolve_window(self.window, DEFAULT_WINDOW, "window")?;
        if frames.len() < l {
            return Err(RppgError::NotEnoughData {
                required: l,
                actual: frames.len(),
            });
        }

        let mut correlations = Vec::with_capacity(frames.len());
        for (k, pixels) in frames.iter().enumerate() {
            if pixels.ncols() != 3 {
                return Err(RppgError::ChannelMismatch {
                    frame: k,
                    found: pixels.ncols(),
                });
            }
            let mut c = Matrix3::<f64>::zeros();
            if pixels.nrows() > 0 {
                for row in pixels.rows() {
                    let v = Vector3::new(row[0], row[1], row[2]);
                    c += v * v.transpose();
                }
                c /= pixels.nrows() as f64;
            }
            correlations.push(c);
        }

        Ok(PulseWaveform::new(
            Self::rotate(&correlations, l),
            fps,
            FilterOutcome::Clean,
        ))
    }

    fn rotate(correlations: &[Matrix3<f64>], l: usize) -> Array1<f64> {
        let frames = correlations.len();
        let mut bases: Vec<FrameBasis> = Vec::with_capacity(frames);
        let mut pulse = Array1::<f64>::zeros(frames);

        for (k, c) in correlations.iter().enumerate() {
            let mut basis = FrameBasis::from_correlation(*c);
            // Eigenvector signs are arbitrary; keep the principal axis continuous.
            if let Some(prev) = bases.last() {
                if basis.vectors[0].dot(&prev.vectors[0]) < 0.0 {
                    basis.vectors[0] = -basis.vectors[0];
                }
            }
            bases.push(basis);

            if k + 1 < l {
                continue;
            }
            let tau = k + 1 - l;
            let reference = &bases[tau];

            let mut sr0 = Array1::<f64>::zeros(l);
            let mut sr1 = Array1::<f64>::zeros(l);
            for (i, current) in bases[tau..=k].iter().enumerate() {
                let mut rotation = Vector3::<f64>::zeros();
                for j in 1..3 {
                    let scale = ((EIGEN_EPS + current.values[0]) / (EIGEN_EPS + reference.values[j]))
                        .abs()
                        .sqrt();
                    let projection = current.vectors[0].dot(&reference.vectors[j]);
                    rotation += reference.vectors[j] * (scale * projection);
                }
                sr0[i] = rotation[0];
                sr1[i] = rotation[1];
            }

            let ratio = safe_ratio(std_dev(sr0.view()), std_dev(sr1.view()));
            let p = &sr0 - &(ratio * &sr1);
            let mean = p.mean().unwrap_or(0.0);
            for (i, v) in p.iter().enumerate() {
                pulse[tau + i] += v - mean;
            }
        }
        pulse
    }
}

impl PulseExtractor for SsrExtractor {
    fn kind(&self) -> Algorithm {
        Algorithm::Ssr
    }

    /// A mean-colour trace has a rank-one correlation per frame, which
    /// leaves no subspace to rotate. Use [`SsrExtractor::extract_pixels`].
    fn extract(&self, trace: &RgbTrace) -> Result<PulseWaveform> {
        trace.validate(1)?;
        let l = resolve_window(self.window, DEFAULT_WINDOW, "window")?;
        trace.validate(l)?;
        Err(RppgError::SinglePixelFrames { algorithm: "SSR" })
    }
}
