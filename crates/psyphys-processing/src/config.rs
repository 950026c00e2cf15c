//! Configuration management for the extraction pipelines

use crate::ecg::EcgPeakDetector;
use crate::eda::{EdaDecomposer, EdaPeakDetector, EdaResampler};
use crate::filters::{FilterConfig, FilterType};
use psyphys_core::{PsyError, PsyResult, SignalMetadata};
use serde::{Deserialize, Serialize};

/// Global processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Configuration name/profile
    pub name: String,
    /// R-peak extraction parameters
    pub ecg: EcgConfig,
    /// Skin conductance response parameters
    pub eda: EdaConfig,
    /// Batch execution parameters
    #[serde(default)]
    pub batch: BatchConfig,
}

/// ECG pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgConfig {
    /// Sampling rate of the raw recordings (Hz)
    pub sampling_rate: f64,
    /// Band-pass applied before differentiation
    pub bandpass: FilterConfig,
    /// Adaptive threshold = mean + multiplier * std
    pub threshold_multiplier: f64,
    /// Minimum spacing between R-peaks (s)
    pub refractory_seconds: f64,
}

/// EDA pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaConfig {
    /// Sampling rate of the raw recordings (Hz)
    pub sampling_rate: f64,
    /// Keep every n-th sample
    pub downsample_factor: usize,
    /// Trailing moving-average window, in decimated samples
    pub window_size: usize,
    /// Tonic low-pass cutoff (Hz)
    pub tonic_cutoff_hz: f64,
    /// Tonic low-pass order
    pub tonic_order: usize,
    /// Minimum phasic height of an SCR (µS)
    pub height_threshold: f64,
    /// Minimum spacing between SCRs (s)
    pub min_distance_seconds: f64,
}

/// Batch execution parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Units processed at the same time
    ///
    /// A unit that times out frees its slot at once while its worker thread
    /// runs on to completion, so after timeouts more than this many workers
    /// can be busy for a while.
    pub max_concurrent_units: usize,
    /// Per-unit time limit (s); no limit when absent. Expiry discards the
    /// unit's result but does not stop its worker.
    pub unit_timeout_seconds: Option<f64>,
}

impl ProcessingConfig {
    /// Reference parameters: 0.5-30 Hz first-order ECG band-pass, EDA at
    /// 10 Hz after decimation with a 0.05 Hz tonic cutoff
    pub fn reference() -> Self {
        ProcessingConfig {
            name: "Reference".to_string(),
            ecg: EcgConfig::default(),
            eda: EdaConfig::default(),
            batch: BatchConfig::default(),
        }
    }

    /// Narrow 5-15 Hz QRS band, as in Pan-Tompkins style detectors
    pub fn pan_tompkins() -> Self {
        let mut config = Self::reference();
        config.name = "Pan-Tompkins".to_string();
        config.ecg.bandpass = FilterConfig::bandpass(5.0, 15.0, 2);
        config
    }

    /// Validate configuration
    pub fn validate(&self) -> PsyResult<()> {
        if self.name.trim().is_empty() {
            return Err(PsyError::invalid("configuration name must not be empty"));
        }

        self.ecg.validate()?;
        self.eda.validate()?;
        self.batch.validate()?;

        Ok(())
    }

    /// Save configuration to JSON
    pub fn to_json(&self) -> PsyResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PsyError::InvalidParameter {
            reason: format!("Failed to serialize config: {}", e),
        })
    }

    /// Load configuration from JSON
    pub fn from_json(json: &str) -> PsyResult<Self> {
        let config: ProcessingConfig = serde_json::from_str(json).map_err(|e| PsyError::InvalidParameter {
            reason: format!("Failed to deserialize config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl EcgConfig {
    pub fn validate(&self) -> PsyResult<()> {
        SignalMetadata::validate_sampling_rate(self.sampling_rate)?;

        if self.bandpass.filter_type != FilterType::Bandpass {
            return Err(PsyError::invalid("ECG enhancement needs a bandpass filter"));
        }
        // Surfaces cutoff/order problems before any recording is read
        self.bandpass.design(self.sampling_rate)?;

        self.peak_detector().map(|_| ())
    }

    pub fn peak_detector(&self) -> PsyResult<EcgPeakDetector> {
        EcgPeakDetector::new(self.refractory_seconds, self.threshold_multiplier)
    }
}

impl EdaConfig {
    /// Sampling rate after decimation
    pub fn analysis_rate(&self) -> f64 {
        self.sampling_rate / self.downsample_factor.max(1) as f64
    }

    pub fn validate(&self) -> PsyResult<()> {
        SignalMetadata::validate_sampling_rate(self.sampling_rate)?;
        self.resampler()?;
        self.decomposer()?;
        self.peak_detector()?;

        FilterConfig::lowpass(self.tonic_cutoff_hz, self.tonic_order).design(self.analysis_rate())?;
        Ok(())
    }

    pub fn resampler(&self) -> PsyResult<EdaResampler> {
        EdaResampler::new(self.downsample_factor, self.window_size)
    }

    pub fn decomposer(&self) -> PsyResult<EdaDecomposer> {
        EdaDecomposer::new(self.tonic_cutoff_hz, self.tonic_order)
    }

    pub fn peak_detector(&self) -> PsyResult<EdaPeakDetector> {
        EdaPeakDetector::new(self.height_threshold, self.min_distance_seconds)
    }
}

impl BatchConfig {
    pub fn validate(&self) -> PsyResult<()> {
        if self.max_concurrent_units == 0 {
            return Err(PsyError::invalid("max_concurrent_units must be at least 1"));
        }
        if let Some(timeout) = self.unit_timeout_seconds {
            if !timeout.is_finite() || timeout <= 0.0 {
                return Err(PsyError::InvalidParameter {
                    reason: format!("unit timeout must be positive, got {}", timeout),
                });
            }
        }
        Ok(())
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::reference()
    }
}

impl Default for EcgConfig {
    fn default() -> Self {
        EcgConfig {
            sampling_rate: 1000.0,
            bandpass: FilterConfig::bandpass(0.5, 30.0, 1),
            threshold_multiplier: EcgPeakDetector::DEFAULT_THRESHOLD_MULTIPLIER,
            refractory_seconds: EcgPeakDetector::DEFAULT_REFRACTORY_SECONDS,
        }
    }
}

impl Default for EdaConfig {
    fn default() -> Self {
        EdaConfig {
            sampling_rate: 1000.0,
            downsample_factor: EdaResampler::DEFAULT_DOWNSAMPLE_FACTOR,
            window_size: EdaResampler::DEFAULT_WINDOW_SIZE,
            tonic_cutoff_hz: EdaDecomposer::DEFAULT_CUTOFF_HZ,
            tonic_order: EdaDecomposer::DEFAULT_ORDER,
            height_threshold: EdaPeakDetector::DEFAULT_HEIGHT_THRESHOLD,
            min_distance_seconds: EdaPeakDetector::DEFAULT_MIN_DISTANCE_SECONDS,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_concurrent_units: 4,
            unit_timeout_seconds: Some(300.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_config() {
        let config = ProcessingConfig::reference();
        assert!(config.validate().is_ok());
        assert_eq!(config.ecg.bandpass.cutoffs, vec![0.5, 30.0]);
        assert_eq!(config.eda.analysis_rate(), 10.0);
    }

    #[test]
    fn test_pan_tompkins_config() {
        let config = ProcessingConfig::pan_tompkins();
        assert!(config.validate().is_ok());
        assert_eq!(config.ecg.bandpass.cutoffs, vec![5.0, 15.0]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ProcessingConfig::reference();

        config.ecg.refractory_seconds = 0.0;
        assert!(config.validate().is_err());

        config = ProcessingConfig::reference();
        config.ecg.bandpass = FilterConfig::bandpass(30.0, 600.0, 1);
        assert!(config.validate().is_err());

        config = ProcessingConfig::reference();
        config.ecg.bandpass = FilterConfig::lowpass(30.0, 1);
        assert!(config.validate().is_err());

        config = ProcessingConfig::reference();
        config.eda.downsample_factor = 0;
        assert!(config.validate().is_err());

        // 10 Hz analysis rate cannot hold a 6 Hz tonic cutoff
        config = ProcessingConfig::reference();
        config.eda.tonic_cutoff_hz = 6.0;
        assert!(config.validate().is_err());

        config = ProcessingConfig::reference();
        config.batch.max_concurrent_units = 0;
        assert!(config.validate().is_err());

        config = ProcessingConfig::reference();
        config.batch.unit_timeout_seconds = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_serialization() {
        let config = ProcessingConfig::pan_tompkins();

        let json = config.to_json().unwrap();
        assert!(json.contains("\"bandpass\""));

        let deserialized = ProcessingConfig::from_json(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_from_json_validates_and_defaults_batch() {
        let mut value = serde_json::to_value(ProcessingConfig::reference()).unwrap();
        value.as_object_mut().unwrap().remove("batch");
        let config = ProcessingConfig::from_json(&value.to_string()).unwrap();
        assert_eq!(config.batch, BatchConfig::default());

        value["eda"]["height_threshold"] = serde_json::json!(-0.5);
        assert!(ProcessingConfig::from_json(&value.to_string()).is_err());
    }
}
