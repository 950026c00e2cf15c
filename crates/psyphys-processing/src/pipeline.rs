//! Per-unit extraction pipelines
//!
//! Each pipeline is built once from configuration and then run on any number
//! of signals; `run` takes `&self` and returns an owned analysis, so one
//! pipeline can serve several worker threads.

use crate::config::{EcgConfig, EdaConfig};
use crate::ecg::{EcgDetection, EcgEnhancer, EcgPeakDetector};
use crate::eda::{DecomposedEda, EdaDecomposer, EdaPeakDetector, EdaResampler};
use crate::processor::{run_stage, StageMetrics, StageTimer};
use crate::results::{UnitMetrics, UnitResult};
use psyphys_core::{
    ParticipantCondition, PeakSet, PsyError, PsyResult, Signal, SignalKind, SignalStats,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// R-peak analysis of one ECG recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcgAnalysis {
    pub tag: ParticipantCondition,
    /// Raw recording length (s)
    pub duration_seconds: f64,
    pub detection: EcgDetection,
    pub stage_metrics: Vec<StageMetrics>,
    pub total_time_us: u64,
}

impl EcgAnalysis {
    pub fn to_unit_result(&self) -> UnitResult {
        UnitResult {
            tag: self.tag.clone(),
            duration_seconds: self.duration_seconds,
            metrics: UnitMetrics::Ecg {
                r_peaks: self.detection.peaks.len(),
                bpm: self.detection.bpm,
                mean_rr_rate: self.detection.peaks.mean_interval_rate(),
            },
        }
    }
}

/// Tonic/phasic analysis of one EDA recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdaAnalysis {
    pub tag: ParticipantCondition,
    /// Raw recording length (s)
    pub duration_seconds: f64,
    /// Smoothed samples dropped for lacking a full window
    pub trimmed_samples: usize,
    pub components: DecomposedEda,
    pub scrs: PeakSet,
    pub stage_metrics: Vec<StageMetrics>,
    pub total_time_us: u64,
}

impl EdaAnalysis {
    pub fn to_unit_result(&self) -> UnitResult {
        UnitResult {
            tag: self.tag.clone(),
            duration_seconds: self.duration_seconds,
            metrics: UnitMetrics::Eda {
                scr_peaks: self.scrs.len(),
                mean_scr_amplitude: self.scrs.mean_amplitude(),
                mean_tonic: self.components.tonic.stats().mean,
            },
        }
    }
}

/// Enhance, then detect
#[derive(Debug)]
pub struct EcgPipeline {
    enhancer: EcgEnhancer,
    detector: EcgPeakDetector,
    sampling_rate: f64,
}

impl EcgPipeline {
    pub fn from_config(config: &EcgConfig) -> PsyResult<Self> {
        config.validate()?;

        Ok(Self {
            enhancer: EcgEnhancer::new(config.bandpass.design(config.sampling_rate)?),
            detector: config.peak_detector()?,
            sampling_rate: config.sampling_rate,
        })
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn run(&self, signal: &Signal) -> PsyResult<EcgAnalysis> {
        check_input(signal, SignalKind::Ecg, self.sampling_rate)?;

        let start = Instant::now();
        let mut stage_metrics = Vec::new();

        let enhanced = run_stage(&self.enhancer, signal, &mut stage_metrics)?;

        let timer = StageTimer::start("ECG Peak Detector", enhanced.len());
        let detection = self.detector.detect(&enhanced, self.sampling_rate)?;
        stage_metrics.push(timer.finish(detection.peaks.len()));

        let total_time_us = start.elapsed().as_micros() as u64;
        tracing::info!(
            tag = %signal.tag(),
            peaks = detection.peaks.len(),
            bpm = detection.bpm,
            total_time_us,
            "ECG unit processed"
        );

        Ok(EcgAnalysis {
            tag: signal.tag().clone(),
            duration_seconds: signal.duration(),
            detection,
            stage_metrics,
            total_time_us,
        })
    }
}

/// Resample, trim, decompose, then detect
pub struct EdaPipeline {
    resampler: EdaResampler,
    decomposer: EdaDecomposer,
    detector: EdaPeakDetector,
    sampling_rate: f64,
}

impl EdaPipeline {
    pub fn from_config(config: &EdaConfig) -> PsyResult<Self> {
        config.validate()?;

        Ok(Self {
            resampler: config.resampler()?,
            decomposer: config.decomposer()?,
            detector: config.peak_detector()?,
            sampling_rate: config.sampling_rate,
        })
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn run(&self, signal: &Signal) -> PsyResult<EdaAnalysis> {
        check_input(signal, SignalKind::Eda, self.sampling_rate)?;

        let start = Instant::now();
        let mut stage_metrics = Vec::new();

        let timer = StageTimer::start("EDA Resampler", signal.len());
        let smoothed = self.resampler.resample(signal)?;
        let trimmed_samples = smoothed.leading_missing();
        let smoothed = smoothed.trim_leading_missing();
        stage_metrics.push(timer.finish(smoothed.len()));

        let analysis_rate = smoothed.sampling_rate();

        let timer = StageTimer::start("EDA Decomposer", smoothed.len());
        let components = self.decomposer.decompose(&smoothed, analysis_rate)?;
        stage_metrics.push(timer.finish(components.phasic.len()));

        let timer = StageTimer::start("EDA Peak Detector", components.phasic.len());
        let scrs = self.detector.detect(&components.phasic, analysis_rate)?;
        stage_metrics.push(timer.finish(scrs.len()));

        let total_time_us = start.elapsed().as_micros() as u64;
        tracing::info!(
            tag = %signal.tag(),
            scrs = scrs.len(),
            mean_tonic = SignalStats::calculate(components.tonic.samples()).mean,
            total_time_us,
            "EDA unit processed"
        );

        Ok(EdaAnalysis {
            tag: signal.tag().clone(),
            duration_seconds: signal.duration(),
            trimmed_samples,
            components,
            scrs,
            stage_metrics,
            total_time_us,
        })
    }
}

/// The signal must be of the pipeline's kind and recorded at its rate
fn check_input(signal: &Signal, kind: SignalKind, sampling_rate: f64) -> PsyResult<()> {
    if signal.kind() != kind {
        return Err(PsyError::InvalidParameter {
            reason: format!("{} pipeline received a {} signal", kind, signal.kind()),
        });
    }
    if (signal.sampling_rate() - sampling_rate).abs() > 1e-9 * sampling_rate {
        return Err(PsyError::InvalidParameter {
            reason: format!(
                "{} pipeline configured for {} Hz, signal recorded at {} Hz",
                kind,
                sampling_rate,
                signal.sampling_rate()
            ),
        });
    }
    Ok(())
}
