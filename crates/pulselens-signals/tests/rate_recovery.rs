use proptest::prelude::*;
use pulselens_signals::bpm::fft_peak_bpm;
use pulselens_signals::rppg::{AdaptiveChromExtractor, AdaptiveParams, AdaptivePosExtractor};
use pulselens_signals::{AnalysisPipeline, PipelinePath, PulseExtractor, RgbTrace};
use std::f64::consts::PI;

const FPS: f64 = 30.0;
const WARMUP: usize = 21;

/// Skin-like trace carrying a sinusoidal pulse, strongest on green.
fn skin_trace(freq: f64, frames: usize) -> RgbTrace {
    let samples = (0..frames)
        .map(|i| {
            let p = (2.0 * PI * freq * i as f64 / FPS).sin();
            [150.0 + 0.6 * p, 100.0 + 1.2 * p, 80.0 + 0.4 * p]
        })
        .collect();
    RgbTrace::new(samples, FPS)
}

#[test]
fn adaptive_extractors_track_rate_across_band() {
    proptest!(ProptestConfig::with_cases(24), |(freq in 0.7f64..4.0)| {
        let trace = skin_trace(freq, 600);
        let extractors: [Box<dyn PulseExtractor>; 2] = [
            Box::new(AdaptiveChromExtractor::new(AdaptiveParams::default())),
            Box::new(AdaptivePosExtractor::new(AdaptiveParams::default())),
        ];
        for extractor in extractors {
            let wave = extractor.extract(&trace).unwrap();
            prop_assert_eq!(wave.timeline().len(), 600);
            let bpm = fft_peak_bpm(wave.timeline(), FPS);
            prop_assert!(
                (bpm - freq * 60.0).abs() <= 5.0,
                "{} at {} Hz gave {} BPM", extractor.kind(), freq, bpm
            );
        }
    });
}

#[test]
fn pipeline_tracks_rate_across_band() {
    proptest!(ProptestConfig::with_cases(24), |(freq in 0.7f64..4.0)| {
        let trace = skin_trace(freq, WARMUP + 600);
        let report = AnalysisPipeline::default().analyze(&trace, None).unwrap();
        prop_assert_eq!(report.path, PipelinePath::Adaptive);
        prop_assert_eq!(report.frames_analyzed, 600);
        prop_assert!(
            (report.bpm - freq * 60.0).abs() <= 5.0,
            "{} Hz gave {} BPM via {}", freq, report.bpm, report.algorithm
        );
    });
}
