//! DSP (Digital Signal Processing) module
//!
//! Filtering primitives shared by the extractors and the BPM estimators:
//! - `butter_bandpass` / `bandpass` - Butterworth SOS design, causal and zero-phase
//! - `detrend` / `gaussian_smooth` - trend removal and low-pass smoothing
//! - `fft` / `fft_frequencies` - spectral helpers
//! - `find_peaks` - local-maximum detection with height/distance/prominence
//! - `mean` / `std_dev` / `zscore` - basic statistics

mod filters;
mod peaks;
mod smoothing;
mod spectrum;
mod stats;

pub use filters::{
    bandpass, butter_bandpass, BandpassConfig, FilterMode, Sos, MAX_NORMALIZED_EDGE,
    MIN_NORMALIZED_EDGE,
};
pub use peaks::{find_peaks, prominence, PeakCriteria};
pub use smoothing::{detrend, gaussian_smooth};
pub use spectrum::{fft, fft_frequencies, magnitude_spectrum};
pub use stats::{hamming_window, mean, safe_ratio, std_dev, zscore};
