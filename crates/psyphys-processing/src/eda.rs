//! Electrodermal activity: resampling, tonic/phasic decomposition, SCR peaks
//!
//! Raw skin conductance is decimated and smoothed to a low analysis rate,
//! split into a slow tonic level (zero-phase low-pass) and the phasic
//! residual, and skin conductance responses are picked from the phasic part
//! with a fixed height threshold.

use crate::filters::{trailing_moving_average, FilterSpec, ZeroPhaseFilter};
use crate::peak_search::{find_peaks, seconds_to_samples};
use crate::processor::SignalProcessor;
use psyphys_core::{
    invalid_param, ParticipantCondition, PeakSet, PsyError, PsyResult, Signal, SignalMetadata,
};
use serde::{Deserialize, Serialize};

/// Resampler output; `None` marks samples without a full smoothing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSignal {
    samples: Vec<Option<f64>>,
    metadata: SignalMetadata,
}

impl SmoothedSignal {
    pub fn new(samples: Vec<Option<f64>>, metadata: SignalMetadata) -> Self {
        Self { samples, metadata }
    }

    pub fn samples(&self) -> &[Option<f64>] {
        &self.samples
    }

    pub fn metadata(&self) -> &SignalMetadata {
        &self.metadata
    }

    pub fn tag(&self) -> &ParticipantCondition {
        &self.metadata.tag
    }

    pub fn sampling_rate(&self) -> f64 {
        self.metadata.sampling_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of `None` samples before the first value
    pub fn leading_missing(&self) -> usize {
        self.samples.iter().take_while(|s| s.is_none()).count()
    }

    /// Drop the leading samples that have no full window
    pub fn trim_leading_missing(&self) -> SmoothedSignal {
        SmoothedSignal {
            samples: self.samples[self.leading_missing()..].to_vec(),
            metadata: self.metadata.clone(),
        }
    }

    /// Convert to a plain [`Signal`], failing on any missing sample
    pub fn to_signal(&self) -> PsyResult<Signal> {
        let samples = self.samples.iter()
            .enumerate()
            .map(|(i, s)| s.ok_or_else(|| invalid_param!("sample {} has no value", i)))
            .collect::<PsyResult<Vec<f64>>>()?;
        Signal::new(samples, self.metadata.clone())
    }
}

impl From<&Signal> for SmoothedSignal {
    fn from(signal: &Signal) -> Self {
        SmoothedSignal {
            samples: signal.samples().iter().copied().map(Some).collect(),
            metadata: signal.metadata().clone(),
        }
    }
}

/// Decimation by sample selection followed by a trailing moving average
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdaResampler {
    downsample_factor: usize,
    window_size: usize,
}

impl EdaResampler {
    pub const DEFAULT_DOWNSAMPLE_FACTOR: usize = 100;
    pub const DEFAULT_WINDOW_SIZE: usize = 10;

    pub fn new(downsample_factor: usize, window_size: usize) -> PsyResult<Self> {
        if downsample_factor < 1 {
            return Err(PsyError::invalid("downsample factor must be at least 1"));
        }
        if window_size < 1 {
            return Err(PsyError::invalid("smoothing window must be at least 1 sample"));
        }

        Ok(Self {
            downsample_factor,
            window_size,
        })
    }

    pub fn downsample_factor(&self) -> usize {
        self.downsample_factor
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Keep every `downsample_factor`-th sample (no anti-aliasing), then smooth
    ///
    /// The first `window_size - 1` outputs are `None`. The output rate is the
    /// input rate divided by the factor.
    pub fn resample(&self, signal: &Signal) -> PsyResult<SmoothedSignal> {
        let decimated: Vec<f64> = signal.samples()
            .iter()
            .step_by(self.downsample_factor)
            .copied()
            .collect();

        let rate = signal.sampling_rate() / self.downsample_factor as f64;
        let metadata = signal.metadata().resampled(rate)?;
        let samples = trailing_moving_average(&decimated, self.window_size);

        if samples.len() < self.window_size {
            tracing::warn!(
                tag = %signal.tag(),
                samples = samples.len(),
                window = self.window_size,
                "EDA recording shorter than one smoothing window"
            );
        }

        tracing::debug!(
            tag = %signal.tag(),
            input = signal.len(),
            output = samples.len(),
            rate,
            "EDA resampled"
        );

        Ok(SmoothedSignal::new(samples, metadata))
    }
}

impl Default for EdaResampler {
    fn default() -> Self {
        Self {
            downsample_factor: Self::DEFAULT_DOWNSAMPLE_FACTOR,
            window_size: Self::DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Tonic level and phasic residual, aligned with the decomposed input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposedEda {
    pub tonic: Signal,
    pub phasic: Signal,
}

/// Tonic/phasic split by zero-phase Butterworth low-pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdaDecomposer {
    cutoff_hz: f64,
    order: usize,
}

impl EdaDecomposer {
    pub const DEFAULT_CUTOFF_HZ: f64 = 0.05;
    pub const DEFAULT_ORDER: usize = 4;

    pub fn new(cutoff_hz: f64, order: usize) -> PsyResult<Self> {
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 {
            return Err(invalid_param!("tonic cutoff must be positive, got {}", cutoff_hz));
        }
        if order == 0 {
            return Err(PsyError::invalid("tonic filter order must be at least 1"));
        }

        Ok(Self { cutoff_hz, order })
    }

    pub fn cutoff_hz(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Split `smoothed` into tonic and phasic components
    ///
    /// Every sample must be present and finite; trim the resampler's leading
    /// gap first. `phasic[i] == smoothed[i] - tonic[i]`.
    pub fn decompose(&self, smoothed: &SmoothedSignal, sampling_rate: f64) -> PsyResult<DecomposedEda> {
        if smoothed.is_empty() {
            return Err(PsyError::EmptySignal { stage: "eda decompose" });
        }

        if let Some(index) = smoothed.samples().iter().position(|s| s.is_none()) {
            return Err(invalid_param!(
                "smoothed EDA sample {} is missing; trim leading gaps before decomposing",
                index
            ));
        }
        if let Some(index) = smoothed.samples().iter().position(|s| s.is_some_and(|v| !v.is_finite())) {
            return Err(invalid_param!("smoothed EDA sample {} is not finite", index));
        }

        let spec = FilterSpec::lowpass(self.cutoff_hz, self.order, sampling_rate)?;
        let input = smoothed.to_signal()?;
        let tonic = ZeroPhaseFilter::new(spec).process(&input)?;

        if tonic.len() != input.len() {
            return Err(PsyError::MisalignedLength {
                expected: input.len(),
                actual: tonic.len(),
            });
        }

        let phasic: Vec<f64> = input.samples()
            .iter()
            .zip(tonic.samples())
            .map(|(x, t)| x - t)
            .collect();
        let phasic = input.derive(phasic);

        tracing::debug!(
            tag = %smoothed.tag(),
            samples = input.len(),
            cutoff_hz = self.cutoff_hz,
            "EDA decomposed"
        );

        Ok(DecomposedEda { tonic, phasic })
    }
}

impl Default for EdaDecomposer {
    fn default() -> Self {
        Self {
            cutoff_hz: Self::DEFAULT_CUTOFF_HZ,
            order: Self::DEFAULT_ORDER,
        }
    }
}

/// Fixed-threshold skin conductance response detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdaPeakDetector {
    height_threshold: f64,
    min_distance_seconds: f64,
}

impl EdaPeakDetector {
    pub const DEFAULT_HEIGHT_THRESHOLD: f64 = 0.02;
    pub const DEFAULT_MIN_DISTANCE_SECONDS: f64 = 1.0;

    pub fn new(height_threshold: f64, min_distance_seconds: f64) -> PsyResult<Self> {
        if !height_threshold.is_finite() || height_threshold < 0.0 {
            return Err(invalid_param!("SCR height threshold must be non-negative, got {}", height_threshold));
        }
        if !min_distance_seconds.is_finite() || min_distance_seconds <= 0.0 {
            return Err(invalid_param!(
                "minimum SCR distance must be positive, got {}",
                min_distance_seconds
            ));
        }

        Ok(Self {
            height_threshold,
            min_distance_seconds,
        })
    }

    pub fn height_threshold(&self) -> f64 {
        self.height_threshold
    }

    pub fn min_distance_seconds(&self) -> f64 {
        self.min_distance_seconds
    }

    /// SCR events in `phasic`; amplitudes are the phasic values at the peaks
    pub fn detect(&self, phasic: &Signal, sampling_rate: f64) -> PsyResult<PeakSet> {
        SignalMetadata::validate_sampling_rate(sampling_rate)?;

        let distance = seconds_to_samples(self.min_distance_seconds, sampling_rate);
        let peaks = find_peaks(phasic.samples(), self.height_threshold, distance, sampling_rate)?;

        tracing::debug!(
            tag = %phasic.tag(),
            scrs = peaks.len(),
            threshold = self.height_threshold,
            distance,
            "SCR peaks detected"
        );

        Ok(peaks)
    }
}

impl Default for EdaPeakDetector {
    fn default() -> Self {
        Self {
            height_threshold: Self::DEFAULT_HEIGHT_THRESHOLD,
            min_distance_seconds: Self::DEFAULT_MIN_DISTANCE_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use psyphys_core::{DetectionStatus, SignalKind};

    fn eda(samples: Vec<f64>, rate: f64) -> Signal {
        Signal::from_samples(samples, SignalKind::Eda, rate, ParticipantCondition::new("p02", "stress"))
            .unwrap()
    }

    fn bump(n: usize, center: usize, amplitude: f64, width: f64) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (-((i as f64 - center as f64) / width).powi(2) / 2.0).exp())
            .collect()
    }

    #[test]
    fn test_resample_decimates_and_smooths() {
        let signal = eda((0..1000).map(|i| i as f64).collect(), 1000.0);
        let smoothed = EdaResampler::new(100, 3).unwrap().resample(&signal).unwrap();

        assert_eq!(smoothed.len(), 10);
        assert_relative_eq!(smoothed.sampling_rate(), 10.0);
        assert_eq!(smoothed.samples()[0], None);
        assert_eq!(smoothed.samples()[1], None);
        assert_abs_diff_eq!(smoothed.samples()[2].unwrap(), 100.0);
        assert_abs_diff_eq!(smoothed.samples()[9].unwrap(), 800.0);
        assert_eq!(smoothed.tag(), signal.tag());
    }

    #[test]
    fn test_resample_leaves_window_minus_one_gaps() {
        let signal = eda(vec![5.0; 30_000], 1000.0);
        let smoothed = EdaResampler::default().resample(&signal).unwrap();

        assert_eq!(smoothed.len(), 300);
        assert_eq!(smoothed.leading_missing(), 9);

        let trimmed = smoothed.trim_leading_missing();
        assert_eq!(trimmed.len(), 291);
        assert_eq!(trimmed.leading_missing(), 0);
        assert!(trimmed.to_signal().is_ok());
    }

    #[test]
    fn test_resampler_parameter_validation() {
        assert!(EdaResampler::new(0, 10).is_err());
        assert!(EdaResampler::new(100, 0).is_err());
        assert!(EdaResampler::new(1, 1).is_ok());
    }

    #[test]
    fn test_components_sum_to_input() {
        let samples: Vec<f64> = (0..600)
            .map(|i| 4.0 + 0.002 * i as f64 + 0.3 * (i as f64 / 17.0).sin())
            .collect();
        let signal = eda(samples, 10.0);
        let parts = EdaDecomposer::default()
            .decompose(&SmoothedSignal::from(&signal), 10.0)
            .unwrap();

        assert_eq!(parts.tonic.len(), signal.len());
        assert_eq!(parts.phasic.len(), signal.len());
        for ((x, t), p) in signal.samples().iter().zip(parts.tonic.samples()).zip(parts.phasic.samples()) {
            assert_relative_eq!(t + p, *x, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_zero_phase_keeps_symmetric_pulse_centered() {
        let samples: Vec<f64> = bump(2001, 1000, 1.0, 100.0).iter().map(|v| v + 2.0).collect();
        let signal = eda(samples, 10.0);
        let parts = EdaDecomposer::default()
            .decompose(&SmoothedSignal::from(&signal), 10.0)
            .unwrap();

        let tonic = parts.tonic.samples();
        let argmax = (0..tonic.len())
            .fold(0, |best, i| if tonic[i] > tonic[best] { i } else { best });
        assert!((999..=1001).contains(&argmax));
    }

    #[test]
    fn test_decompose_rejects_gaps_empty_and_nan() {
        let decomposer = EdaDecomposer::default();
        let metadata = SignalMetadata::new(SignalKind::Eda, 10.0, ParticipantCondition::default()).unwrap();

        let mut samples = vec![Some(1.0); 100];
        samples[0] = None;
        let gapped = SmoothedSignal::new(samples, metadata.clone());
        assert_eq!(decomposer.decompose(&gapped, 10.0).unwrap_err().kind(), "InvalidParameter");
        assert!(decomposer.decompose(&gapped.trim_leading_missing(), 10.0).is_ok());

        let empty = SmoothedSignal::new(Vec::new(), metadata.clone());
        assert_eq!(
            decomposer.decompose(&empty, 10.0).unwrap_err(),
            PsyError::EmptySignal { stage: "eda decompose" }
        );

        let mut samples = vec![Some(1.0); 100];
        samples[40] = Some(f64::NAN);
        let nan = SmoothedSignal::new(samples, metadata);
        assert_eq!(decomposer.decompose(&nan, 10.0).unwrap_err().kind(), "InvalidParameter");
    }

    #[test]
    fn test_decomposer_parameter_validation() {
        assert!(EdaDecomposer::new(0.0, 4).is_err());
        assert!(EdaDecomposer::new(0.05, 0).is_err());

        // 6 Hz is above Nyquist for a 10 Hz signal
        let signal = eda(vec![1.0; 100], 10.0);
        let decomposer = EdaDecomposer::new(6.0, 2).unwrap();
        assert!(decomposer.decompose(&SmoothedSignal::from(&signal), 10.0).is_err());
    }

    #[test]
    fn test_three_known_scrs_recovered() {
        let mut phasic = vec![0.0; 400];
        for (center, amplitude) in [(50, 0.1), (150, 0.2), (260, 0.05)] {
            for (value, b) in phasic.iter_mut().zip(bump(400, center, amplitude, 3.0)) {
                *value += b;
            }
        }
        let phasic = eda(phasic, 10.0);

        let peaks = EdaPeakDetector::default().detect(&phasic, 10.0).unwrap();

        assert_eq!(peaks.indices(), vec![50, 150, 260]);
        assert_abs_diff_eq!(peaks.amplitudes()[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(peaks.amplitudes()[1], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(peaks.amplitudes()[2], 0.05, epsilon = 1e-12);
        assert_eq!(peaks.min_distance(), 10);
    }

    #[test]
    fn test_only_larger_of_close_scrs_survives() {
        let mut phasic = vec![0.0; 100];
        phasic[40] = 0.05;
        phasic[45] = 0.08;
        let peaks = EdaPeakDetector::default().detect(&eda(phasic, 10.0), 10.0).unwrap();

        assert_eq!(peaks.indices(), vec![45]);
    }

    #[test]
    fn test_below_threshold_is_no_peaks_found() {
        let phasic = eda(bump(200, 100, 0.01, 3.0), 10.0);
        let peaks = EdaPeakDetector::default().detect(&phasic, 10.0).unwrap();

        assert_eq!(peaks.status(), DetectionStatus::NoPeaksFound);
    }

    #[test]
    fn test_detector_parameter_validation() {
        assert!(EdaPeakDetector::new(-0.01, 1.0).is_err());
        assert!(EdaPeakDetector::new(0.02, 0.0).is_err());
        assert!(EdaPeakDetector::new(0.0, 0.5).is_ok());
    }
}
