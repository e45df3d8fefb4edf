//! Error taxonomy for pulse extraction and heart-rate estimation.
//!
//! Validation failures abort the extractor call that raised them. Numerical
//! degeneracies never show up here: they are absorbed next to where they
//! happen (zero variance, zero channel means) or reported as
//! [`Filtered::Degraded`] (filter design).

use thiserror::Error;

/// Minimum frame rate for a stable 0.5-4 Hz band-pass design.
pub const MIN_FPS: f64 = 9.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RppgError {
    #[error("trace contains no samples")]
    EmptyData,

    #[error("frame rate {fps} is below the minimum of 9")]
    WrongFps { fps: f64 },

    #[error("invalid window parameter `{name}`: {value}")]
    InvalidWindowParameter { name: &'static str, value: f64 },

    #[error("not enough data: need at least {required} frames, got {actual}")]
    NotEnoughData { required: usize, actual: usize },

    #[error("invalid pass band [{low}, {high}] after Nyquist normalization")]
    InvalidBand { low: f64, high: f64 },

    #[error("filter design failed: {0}")]
    FilterDesign(String),

    #[error("no extractor produced a waveform")]
    AllExtractorsFailed,

    #[error("pixel frame {frame} has {found} channels, expected 3")]
    ChannelMismatch { frame: usize, found: usize },

    #[error("{algorithm} needs a skin pixel set per frame, got one mean colour per frame")]
    SinglePixelFrames { algorithm: &'static str },
}

pub type Result<T> = std::result::Result<T, RppgError>;

/// Outcome of a best-effort filtering step.
///
/// Filtering is an enhancement, not a correctness requirement: when the
/// design is ill-conditioned the caller still gets a usable signal, tagged
/// so tests and diagnostics can see the fallback was taken.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered<T> {
    Clean(T),
    /// Filter design failed; the payload is the detrended, unfiltered input.
    Degraded(T),
}

impl<T> Filtered<T> {
    pub fn from_outcome(value: T, outcome: FilterOutcome) -> Self {
        match outcome {
            FilterOutcome::Clean => Filtered::Clean(value),
            FilterOutcome::Degraded => Filtered::Degraded(value),
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Filtered::Clean(v) | Filtered::Degraded(v) => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Filtered::Degraded(_))
    }

    pub fn outcome(&self) -> FilterOutcome {
        match self {
            Filtered::Clean(_) => FilterOutcome::Clean,
            Filtered::Degraded(_) => FilterOutcome::Degraded,
        }
    }
}

/// Whether any filtering stage behind a waveform fell back to unfiltered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOutcome {
    #[default]
    Clean,
    Degraded,
}

impl FilterOutcome {
    /// Combine two outcomes; degraded wins.
    pub fn merge(self, other: FilterOutcome) -> FilterOutcome {
        if self == FilterOutcome::Degraded || other == FilterOutcome::Degraded {
            FilterOutcome::Degraded
        } else {
            FilterOutcome::Clean
        }
    }
}

pub(crate) fn validate_fps(fps: f64) -> Result<()> {
    if !fps.is_finite() || fps < MIN_FPS {
        return Err(RppgError::WrongFps { fps });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_accessors() {
        let clean = Filtered::Clean(1);
        let degraded = Filtered::Degraded(2);
        assert!(!clean.is_degraded());
        assert!(degraded.is_degraded());
        assert_eq!(clean.outcome(), FilterOutcome::Clean);
        assert_eq!(degraded.into_inner(), 2);
    }

    #[test]
    fn test_outcome_merge() {
        assert_eq!(FilterOutcome::Clean.merge(FilterOutcome::Clean), FilterOutcome::Clean);
        assert_eq!(FilterOutcome::Clean.merge(FilterOutcome::Degraded), FilterOutcome::Degraded);
        assert_eq!(FilterOutcome::Degraded.merge(FilterOutcome::Clean), FilterOutcome::Degraded);
    }

    #[test]
    fn test_fps_validation() {
        assert!(validate_fps(30.0).is_ok());
        assert!(validate_fps(9.0).is_ok());
        assert_eq!(validate_fps(8.9), Err(RppgError::WrongFps { fps: 8.9 }));
        assert!(validate_fps(f64::NAN).is_err());
    }
}
