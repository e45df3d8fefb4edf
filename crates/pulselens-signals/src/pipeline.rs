//! Analysis Pipeline
//!
//! Runs one clip end to end:
//! - warm-up trimming
//! - adaptive CHROM and POS in parallel, SNR selection, POS fallback
//! - heart-rate estimates and the windowed BPM series
//! - the legacy CHROM + POS + ICA pipeline when the adaptive path fails

use serde::{Deserialize, Serialize};

use crate::blink::{blink_rate_series, mean_blink_rate, BlinkSample};
use crate::bpm::{
    fft_peak_bpm_in_band, interbeat_bpm_with, legacy_bpm_series, peak_interval_bpm, wavelet_bpm,
    windowed_bpm_series, BpmSample, BEAT_PROMINENCE,
};
use crate::config::AnalysisConfig;
use crate::error::{FilterOutcome, Result};
use crate::rppg::selector::CandidateScore;
use crate::rppg::{
    AdaptiveChromExtractor, AdaptivePosExtractor, Algorithm, ChromExtractor, PosExtractor,
    PulseExtractor, PulseWaveform, Selection,
};
use crate::trace::{BlinkTrace, RgbTrace};

/// Which pipeline produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePath {
    Adaptive,
    Legacy,
}

/// Result of analyzing one clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub algorithm: Algorithm,
    pub path: PipelinePath,
    pub fps: f64,
    /// Frames left after warm-up trimming
    pub frames_analyzed: usize,
    /// FFT-peak BPM of the final waveform, 0 when undecidable
    pub bpm: f64,
    /// Peak-interval BPM, 0 when undecidable
    pub peak_bpm: f64,
    pub wavelet_bpm: Option<f64>,
    pub interbeat_bpm: Option<f64>,
    pub series: Vec<BpmSample>,
    /// SNR of every candidate that was tried
    pub scores: Vec<CandidateScore>,
    pub filter: FilterOutcome,
    pub blink_series: Option<Vec<BlinkSample>>,
    pub mean_blink_rate: Option<f64>,
    #[serde(skip)]
    pub waveform: PulseWaveform,
}

/// Clip analyzer. Holds only its configuration, so one instance can serve
/// many clips from many threads.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a clip, falling back to the legacy pipeline if the adaptive
    /// path fails. The blink trace, if any, is trimmed by the same warm-up.
    pub fn analyze(&self, trace: &RgbTrace, blink: Option<&BlinkTrace>) -> Result<AnalysisReport> {
        let warmup = self.config.pipeline.warmup_frames;
        let trimmed = trace.trim_leading(warmup);
        log::debug!(
            "analyzing {} of {} frames at {} fps",
            trimmed.len(),
            trace.len(),
            trace.fps()
        );

        let mut report = match self.analyze_adaptive(&trimmed) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("adaptive pipeline failed ({e}), switching to legacy pipeline");
                self.analyze_legacy(&trimmed)?
            }
        };

        if let Some(blink) = blink {
            let series = blink_rate_series(&blink.trim_leading(warmup), trimmed.fps());
            report.mean_blink_rate = Some(mean_blink_rate(&series));
            report.blink_series = Some(series);
        }

        log::info!(
            "{} via {:?} path: {:.1} BPM (peak interval {:.1} BPM)",
            report.algorithm,
            report.path,
            report.bpm,
            report.peak_bpm
        );
        Ok(report)
    }

    /// Adaptive CHROM and POS, SNR selection, POS fallback. No warm-up
    /// trimming is applied here.
    pub fn analyze_adaptive(&self, trace: &RgbTrace) -> Result<AnalysisReport> {
        let params = self.config.adaptive.params();
        let chrom = AdaptiveChromExtractor::new(params);
        let pos = AdaptivePosExtractor::new(params);

        let (chrom_result, pos_result) = rayon::join(|| chrom.extract(trace), || pos.extract(trace));
        // POS last: it wins SNR ties
        let candidates = vec![
            (chrom.kind(), chrom_result),
            (pos.kind(), pos_result),
        ];

        let selector = self.config.estimators.selector();
        let Selection {
            algorithm,
            waveform,
            scores,
        } = match selector.select(candidates) {
            Ok(selection) => selection,
            Err(e) => {
                let window = self.config.pipeline.fallback_pos_window;
                log::warn!("{e}, falling back to POS with a {window}-frame window");
                let waveform = PosExtractor::new(Some(window)).extract(trace)?;
                let snr = selector.snr(waveform.timeline(), waveform.fps());
                Selection {
                    algorithm: Algorithm::Pos,
                    waveform,
                    scores: vec![CandidateScore {
                        algorithm: Algorithm::Pos,
                        snr: Some(snr),
                    }],
                }
            }
        };

        let series = windowed_bpm_series(waveform.timeline(), waveform.fps(), &self.config.estimators.series());
        Ok(self.report(PipelinePath::Adaptive, algorithm, trace.len(), waveform, series, scores))
    }

    /// Legacy pipeline: CHROM, POS and ICA are all computed, the estimate
    /// comes from POS. Only a POS failure is fatal.
    pub fn analyze_legacy(&self, trace: &RgbTrace) -> Result<AnalysisReport> {
        let pipeline = &self.config.pipeline;
        let selector = self.config.estimators.selector();
        let chrom = ChromExtractor::new(Some(pipeline.legacy_chrom_interval));
        let ica = self.config.ica.extractor();
        let pos = PosExtractor::new(Some(pipeline.legacy_pos_window));

        let mut scores = Vec::with_capacity(3);
        for extractor in [&chrom as &dyn PulseExtractor, &ica] {
            let snr = match extractor.extract(trace) {
                Ok(waveform) => Some(selector.snr(waveform.timeline(), waveform.fps())),
                Err(e) => {
                    log::warn!("legacy {} failed: {e}", extractor.kind());
                    None
                }
            };
            scores.push(CandidateScore {
                algorithm: extractor.kind(),
                snr,
            });
        }

        let waveform = pos.extract(trace)?;
        scores.push(CandidateScore {
            algorithm: pos.kind(),
            snr: Some(selector.snr(waveform.timeline(), waveform.fps())),
        });

        let series = legacy_bpm_series(waveform.timeline(), waveform.fps(), &self.config.estimators.series());
        Ok(self.report(PipelinePath::Legacy, Algorithm::Pos, trace.len(), waveform, series, scores))
    }

    fn report(
        &self,
        path: PipelinePath,
        algorithm: Algorithm,
        frames: usize,
        waveform: PulseWaveform,
        series: Vec<BpmSample>,
        scores: Vec<CandidateScore>,
    ) -> AnalysisReport {
        let est = &self.config.estimators;
        let fps = waveform.fps();
        let signal = waveform.timeline();

        let bpm = fft_peak_bpm_in_band(signal, fps, est.min_hz, est.max_hz);
        let peak_bpm = peak_interval_bpm(signal, fps).bpm;
        let wavelet = wavelet_bpm(signal, fps, &est.wavelet());
        let interbeat = interbeat_bpm_with(signal, fps, est.interbeat_max_bpm, BEAT_PROMINENCE);
        if waveform.filter() == FilterOutcome::Degraded {
            log::warn!("{algorithm}: filtering degraded, estimates use unfiltered data");
        }

        AnalysisReport {
            algorithm,
            path,
            fps,
            frames_analyzed: frames,
            bpm,
            peak_bpm,
            wavelet_bpm: wavelet,
            interbeat_bpm: interbeat,
            series,
            scores,
            filter: waveform.filter(),
            blink_series: None,
            mean_blink_rate: None,
            waveform,
        }
    }
}
