//! # pulselens-signals
//!
//! Remote heart-rate estimation from facial colour traces.
//!
//! This crate provides:
//! - **rPPG extractors**: CHROM, POS, ICA and SSR pulse extraction from RGB traces
//! - **Quality selection**: in-band SNR scoring between competing extractors
//! - **BPM estimators**: FFT peak, peak interval, windowed series, wavelet, interbeat
//! - **Pipeline**: adaptive analysis with a legacy fallback
//! - **Secondary metrics**: blink rate, eye aspect ratio, head motion
//!
//! ## Example
//!
//! ```ignore
//! use pulselens_signals::{read_rgb_tsv, AnalysisPipeline, ChannelOrder};
//!
//! let trace = read_rgb_tsv("rgb.tsv", ChannelOrder::Bgr, 30.0)?;
//! let report = AnalysisPipeline::default().analyze(&trace, None)?;
//! println!("{} BPM via {}", report.bpm, report.algorithm);
//! ```

pub mod blink;
pub mod bpm;
pub mod config;
pub mod dsp;
pub mod error;
pub mod motion;
pub mod pipeline;
pub mod rppg;
pub mod trace;

pub use config::{AnalysisConfig, ConfigError};
pub use error::{FilterOutcome, Filtered, Result, RppgError, MIN_FPS};
pub use pipeline::{AnalysisPipeline, AnalysisReport, PipelinePath};
pub use rppg::{Algorithm, PulseExtractor, PulseWaveform};
pub use trace::{
    parse_blink_tsv, parse_rgb_tsv, read_blink_tsv, read_rgb_tsv, BlinkTrace, ChannelOrder,
    RgbTrace, TraceError,
};
