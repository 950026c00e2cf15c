//! ECG R-peak extraction
//!
//! The raw trace is band-pass filtered causally, differentiated and squared
//! so that the steep QRS slopes dominate. R-peaks are then searched with an
//! adaptive threshold (`mean + k * std` of the enhanced trace) and a
//! refractory spacing.

use crate::filters::{check_rate, lfilter, FilterSpec};
use crate::peak_search::{find_peaks, seconds_to_samples};
use crate::processor::SignalProcessor;
use psyphys_core::{
    PeakSet, PhysicalUnit, PsyError, PsyResult, Signal, SignalMetadata, SignalStats,
};
use serde::{Deserialize, Serialize};

/// QRS enhancement: causal band-pass, first difference, square
#[derive(Debug)]
pub struct EcgEnhancer {
    spec: FilterSpec,
}

impl EcgEnhancer {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Enhance `signal` with a band-pass design made for its sampling rate
    ///
    /// The output is one sample shorter than the input and never negative.
    /// The filter is applied forward only, so QRS energy lags the raw trace
    /// by the filter's group delay.
    pub fn enhance(signal: &Signal, spec: &FilterSpec) -> PsyResult<Signal> {
        if signal.is_empty() {
            return Err(PsyError::EmptySignal { stage: "ecg enhance" });
        }
        check_rate(spec, signal)?;

        let filtered = lfilter(spec, signal.samples())?;
        let enhanced: Vec<f64> = filtered.windows(2)
            .map(|w| {
                let d = w[1] - w[0];
                d * d
            })
            .collect();

        // Squared slope, no longer in the recording's unit
        let metadata = signal.metadata().clone().with_unit(PhysicalUnit::Arbitrary);
        Signal::new(enhanced, metadata)
    }
}

impl SignalProcessor for EcgEnhancer {
    fn process(&self, input: &Signal) -> PsyResult<Signal> {
        Self::enhance(input, &self.spec)
    }

    fn name(&self) -> &str {
        "ECG Enhancer"
    }
}

/// R-peaks found in an enhanced trace and the resulting heart rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgDetection {
    pub peaks: PeakSet,
    /// Peak count divided by the trace duration in minutes
    pub bpm: f64,
}

/// Adaptive-threshold R-peak detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EcgPeakDetector {
    refractory_seconds: f64,
    threshold_multiplier: f64,
}

impl EcgPeakDetector {
    pub const DEFAULT_REFRACTORY_SECONDS: f64 = 0.6;
    pub const DEFAULT_THRESHOLD_MULTIPLIER: f64 = 3.0;

    pub fn new(refractory_seconds: f64, threshold_multiplier: f64) -> PsyResult<Self> {
        if !refractory_seconds.is_finite() || refractory_seconds <= 0.0 {
            return Err(PsyError::InvalidParameter {
                reason: format!("refractory period must be positive, got {}", refractory_seconds),
            });
        }
        if !threshold_multiplier.is_finite() || threshold_multiplier < 0.0 {
            return Err(PsyError::InvalidParameter {
                reason: format!(
                    "threshold multiplier must be non-negative, got {}",
                    threshold_multiplier
                ),
            });
        }

        Ok(Self {
            refractory_seconds,
            threshold_multiplier,
        })
    }

    pub fn refractory_seconds(&self) -> f64 {
        self.refractory_seconds
    }

    pub fn threshold_multiplier(&self) -> f64 {
        self.threshold_multiplier
    }

    /// Detect R-peaks in `enhanced`, sampled at `sampling_rate`
    ///
    /// An empty trace, or one where nothing clears the threshold, yields an
    /// empty peak set and 0 bpm.
    pub fn detect(&self, enhanced: &Signal, sampling_rate: f64) -> PsyResult<EcgDetection> {
        SignalMetadata::validate_sampling_rate(sampling_rate)?;

        let samples = enhanced.samples();
        let distance = seconds_to_samples(self.refractory_seconds, sampling_rate);

        if samples.is_empty() {
            tracing::warn!(tag = %enhanced.tag(), "empty ECG trace, no peaks");
            return Ok(EcgDetection {
                peaks: PeakSet::empty(0.0, distance, 0, sampling_rate),
                bpm: 0.0,
            });
        }

        let stats = SignalStats::calculate(samples);
        let threshold = stats.mean + self.threshold_multiplier * stats.std_dev;
        let peaks = find_peaks(samples, threshold, distance, sampling_rate)?;

        let duration_minutes = samples.len() as f64 / sampling_rate / 60.0;
        let bpm = peaks.len() as f64 / duration_minutes;

        tracing::debug!(
            tag = %enhanced.tag(),
            peaks = peaks.len(),
            threshold,
            distance,
            bpm,
            "ECG peaks detected"
        );

        Ok(EcgDetection { peaks, bpm })
    }
}

impl Default for EcgPeakDetector {
    fn default() -> Self {
        Self {
            refractory_seconds: Self::DEFAULT_REFRACTORY_SECONDS,
            threshold_multiplier: Self::DEFAULT_THRESHOLD_MULTIPLIER,
        }
    }
}
