use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::bpm::{SeriesConfig, WaveletConfig};
use crate::dsp::BandpassConfig;
use crate::error::MIN_FPS;
use crate::rppg::{AdaptiveParams, IcaExtractor, QualitySelector};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pipeline: PipelineConfig,
    pub adaptive: AdaptiveConfig,
    pub estimators: EstimatorConfig,
    pub ica: IcaConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frame rate assumed when the input does not carry one
    pub fps: f64,
    /// Leading frames dropped before analysis (camera auto-exposure settling)
    pub warmup_frames: usize,
    /// POS window used when both adaptive extractors fail, in frames
    pub fallback_pos_window: usize,
    /// POS window for the legacy pipeline, in frames
    pub legacy_pos_window: usize,
    /// CHROM interval for the legacy path, in frames
    pub legacy_chrom_interval: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub window_seconds: f64,
    pub overlap: f64,
    pub low_hz: f64,
    pub high_hz: f64,
    pub filter_order: usize,
    pub smoothing_seconds: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Heart-rate band for spectral estimates and SNR selection (Hz)
    pub min_hz: f64,
    pub max_hz: f64,
    pub series_window_seconds: f64,
    pub series_step_seconds: f64,
    pub series_min_bpm: f64,
    pub series_max_bpm: f64,
    pub wavelet_min_bpm: f64,
    pub wavelet_max_bpm: f64,
    pub wavelet_prominence: f64,
    pub interbeat_max_bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcaConfig {
    pub seed: u64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: 15.0,
            warmup_frames: 21,
            fallback_pos_window: 20,
            legacy_pos_window: 20,
            legacy_chrom_interval: 32,
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        let params = AdaptiveParams::default();
        Self {
            window_seconds: params.window_seconds,
            overlap: params.overlap,
            low_hz: params.band.low_hz,
            high_hz: params.band.high_hz,
            filter_order: params.band.order,
            smoothing_seconds: params.smoothing_seconds,
            alpha_min: params.alpha_min,
            alpha_max: params.alpha_max,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        let series = SeriesConfig::default();
        let wavelet = WaveletConfig::default();
        Self {
            min_hz: 0.7,
            max_hz: 4.0,
            series_window_seconds: series.window_seconds,
            series_step_seconds: series.step_seconds,
            series_min_bpm: series.min_bpm,
            series_max_bpm: series.max_bpm,
            wavelet_min_bpm: wavelet.min_bpm,
            wavelet_max_bpm: wavelet.max_bpm,
            wavelet_prominence: wavelet.prominence,
            interbeat_max_bpm: crate::bpm::INTERBEAT_MAX_BPM,
        }
    }
}

impl Default for IcaConfig {
    fn default() -> Self {
        let ica = IcaExtractor::default();
        Self {
            seed: ica.seed,
            max_iter: ica.max_iter,
            tolerance: ica.tolerance,
        }
    }
}

impl AdaptiveConfig {
    pub fn params(&self) -> AdaptiveParams {
        AdaptiveParams {
            window_seconds: self.window_seconds,
            overlap: self.overlap,
            band: BandpassConfig::new(self.low_hz, self.high_hz, self.filter_order),
            smoothing_seconds: self.smoothing_seconds,
            alpha_min: self.alpha_min,
            alpha_max: self.alpha_max,
        }
    }
}

impl EstimatorConfig {
    pub fn series(&self) -> SeriesConfig {
        SeriesConfig {
            window_seconds: self.series_window_seconds,
            step_seconds: self.series_step_seconds,
            min_bpm: self.series_min_bpm,
            max_bpm: self.series_max_bpm,
            low_hz: self.min_hz,
            high_hz: self.max_hz,
        }
    }

    pub fn wavelet(&self) -> WaveletConfig {
        WaveletConfig {
            min_bpm: self.wavelet_min_bpm,
            max_bpm: self.wavelet_max_bpm,
            prominence: self.wavelet_prominence,
            ..WaveletConfig::default()
        }
    }

    pub fn selector(&self) -> QualitySelector {
        QualitySelector::new(self.min_hz, self.max_hz)
    }
}

impl IcaConfig {
    pub fn extractor(&self) -> IcaExtractor {
        IcaExtractor {
            seed: self.seed,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: AnalysisConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. User config file (if exists)
    /// 3. Default config file
    /// 4. Built-in defaults (lowest priority)
    pub fn load_layered(default_path: Option<&Path>, user_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = AnalysisConfig::default();

        if let Some(path) = default_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        // A user file replaces the default file wholesale; missing keys fall
        // back to built-in defaults, not to the default file.
        if let Some(path) = user_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply `PULSELENS_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, val: &str) -> Result<T, ConfigError> {
            val.trim()
                .parse()
                .map_err(|_| ConfigError::Validation(format!("Invalid {key}")))
        }

        if let Some(val) = lookup("PULSELENS_FPS") {
            self.pipeline.fps = parse("PULSELENS_FPS", &val)?;
        }
        if let Some(val) = lookup("PULSELENS_WARMUP_FRAMES") {
            self.pipeline.warmup_frames = parse("PULSELENS_WARMUP_FRAMES", &val)?;
        }
        if let Some(val) = lookup("PULSELENS_LEGACY_POS_WINDOW") {
            self.pipeline.legacy_pos_window = parse("PULSELENS_LEGACY_POS_WINDOW", &val)?;
        }
        if let Some(val) = lookup("PULSELENS_ICA_SEED") {
            self.ica.seed = parse("PULSELENS_ICA_SEED", &val)?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Pipeline validation
        if !(self.pipeline.fps >= MIN_FPS) {
            return Err(ConfigError::Validation(format!(
                "pipeline.fps must be >= {MIN_FPS}"
            )));
        }
        if self.pipeline.fallback_pos_window == 0
            || self.pipeline.legacy_pos_window == 0
            || self.pipeline.legacy_chrom_interval == 0
        {
            return Err(ConfigError::Validation(
                "pipeline POS and CHROM windows must be > 0".to_string(),
            ));
        }

        // Adaptive validation
        let adaptive = &self.adaptive;
        if !(adaptive.window_seconds > 0.0) {
            return Err(ConfigError::Validation(
                "adaptive.window_seconds must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&adaptive.overlap) {
            return Err(ConfigError::Validation(
                "adaptive.overlap must be in [0, 1)".to_string(),
            ));
        }
        if !(adaptive.low_hz < adaptive.high_hz) || adaptive.low_hz <= 0.0 {
            return Err(ConfigError::Validation(
                "adaptive.low_hz must be positive and < high_hz".to_string(),
            ));
        }
        if adaptive.filter_order == 0 {
            return Err(ConfigError::Validation(
                "adaptive.filter_order must be > 0".to_string(),
            ));
        }
        if adaptive.smoothing_seconds < 0.0 {
            return Err(ConfigError::Validation(
                "adaptive.smoothing_seconds must be >= 0".to_string(),
            ));
        }
        if !(adaptive.alpha_min <= adaptive.alpha_max) {
            return Err(ConfigError::Validation(
                "adaptive.alpha_min must be <= alpha_max".to_string(),
            ));
        }

        // Estimator validation
        let est = &self.estimators;
        if !(est.min_hz < est.max_hz) {
            return Err(ConfigError::Validation(
                "estimators.min_hz must be < max_hz".to_string(),
            ));
        }
        if !(est.series_window_seconds > 0.0) || !(est.series_step_seconds > 0.0) {
            return Err(ConfigError::Validation(
                "estimators series window and step must be positive".to_string(),
            ));
        }
        if !(est.series_min_bpm < est.series_max_bpm) {
            return Err(ConfigError::Validation(
                "estimators.series_min_bpm must be < series_max_bpm".to_string(),
            ));
        }
        if !(est.wavelet_min_bpm > 0.0) || !(est.wavelet_max_bpm > 0.0) || !(est.interbeat_max_bpm > 0.0) {
            return Err(ConfigError::Validation(
                "estimators BPM bounds must be positive".to_string(),
            ));
        }

        // ICA validation
        if self.ica.max_iter == 0 || !(self.ica.tolerance > 0.0) {
            return Err(ConfigError::Validation(
                "ica.max_iter and ica.tolerance must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = self
            .to_toml_string()
            .map_err(|e| ConfigError::Validation(format!("TOML serialization error: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
