//! Heart-rate estimators
//!
//! Every estimator takes a pulse waveform (any `ArrayView1<f64>`) and its
//! sampling rate:
//! - [`fft_peak_bpm`] - strongest in-band spectral bin
//! - [`peak_interval_bpm`] - mean spacing of prominent peaks
//! - [`windowed_bpm_series`] - FFT-peak over sliding windows
//! - [`wavelet_bpm`] - dominant Mexican-hat scale, then trimmed interbeat
//! - [`interbeat_bpm`] - trimmed interbeat on the waveform itself
//!
//! Undecidable inputs yield `0.0` from the spectral and peak estimators and
//! `None` from the wavelet and interbeat ones; none of them return errors.

mod interbeat;
mod peak_interval;
mod spectral;
mod wavelet;
mod windowed;

pub use interbeat::{interbeat_bpm, interbeat_bpm_with, BEAT_PROMINENCE, INTERBEAT_MAX_BPM};
pub use peak_interval::{peak_interval_bpm, PeakIntervalEstimate};
pub use spectral::{fft_peak_bpm, fft_peak_bpm_in_band, HEART_RATE_BAND};
pub use wavelet::{cwt_row, mexican_hat, wavelet_bpm, WaveletConfig};
pub use windowed::{legacy_bpm_series, windowed_bpm_series, BpmSample, SeriesConfig};
