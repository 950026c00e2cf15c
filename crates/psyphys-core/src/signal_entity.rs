//! Signal: core container for one recorded biosignal channel

use crate::error::PsyResult;
use crate::signal_types::{ParticipantCondition, SignalKind, SignalMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable single-channel recording
///
/// The sampling rate is fixed at construction; derived signals (filtered,
/// resampled) are new `Signal` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    id: Uuid,
    samples: Vec<f64>,
    metadata: SignalMetadata,
}

impl Signal {
    /// Create new signal from samples and metadata
    pub fn new(samples: Vec<f64>, metadata: SignalMetadata) -> PsyResult<Self> {
        SignalMetadata::validate_sampling_rate(metadata.sampling_rate)?;

        Ok(Signal {
            id: Uuid::new_v4(),
            samples,
            metadata,
        })
    }

    /// Shorthand for a signal with the conventional unit for `kind`
    pub fn from_samples(
        samples: Vec<f64>,
        kind: SignalKind,
        sampling_rate: f64,
        tag: ParticipantCondition,
    ) -> PsyResult<Self> {
        let metadata = SignalMetadata::new(kind, sampling_rate, tag)?;
        Signal::new(samples, metadata)
    }

    /// New signal sharing this signal's provenance, with other samples
    pub fn derive(&self, samples: Vec<f64>) -> Signal {
        Signal {
            id: Uuid::new_v4(),
            samples,
            metadata: self.metadata.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn metadata(&self) -> &SignalMetadata {
        &self.metadata
    }

    pub fn tag(&self) -> &ParticipantCondition {
        &self.metadata.tag
    }

    pub fn kind(&self) -> SignalKind {
        self.metadata.kind
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if signal is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f64 {
        self.metadata.sampling_rate
    }

    /// Signal duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.metadata.sampling_rate
    }

    /// Mean and spread over all samples
    pub fn stats(&self) -> SignalStats {
        SignalStats::calculate(&self.samples)
    }
}

/// Mean and population standard deviation of a sample sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

impl SignalStats {
    /// Both fields are 0 for an empty sequence
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self { mean: 0.0, std_dev: 0.0 };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>() / n;

        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tag() -> ParticipantCondition {
        ParticipantCondition::new("sub-1", "baseline")
    }

    #[test]
    fn test_signal_creation() {
        let signal = Signal::from_samples(vec![0.0; 1000], SignalKind::Ecg, 1000.0, tag()).unwrap();

        assert_eq!(signal.len(), 1000);
        assert_relative_eq!(signal.duration(), 1.0);
        assert_eq!(signal.tag().participant, "sub-1");
    }

    #[test]
    fn test_invalid_sampling_rate() {
        assert!(Signal::from_samples(vec![1.0], SignalKind::Eda, 0.0, tag()).is_err());
    }

    #[test]
    fn test_derive_keeps_metadata() {
        let signal = Signal::from_samples(vec![1.0, 2.0], SignalKind::Eda, 10.0, tag()).unwrap();
        let derived = signal.derive(vec![3.0]);

        assert_eq!(derived.metadata(), signal.metadata());
        assert_ne!(derived.id(), signal.id());
        assert_eq!(derived.samples(), &[3.0]);
    }

    #[test]
    fn test_stats() {
        let signal = Signal::from_samples(vec![1.0, 2.0, 3.0, 4.0], SignalKind::Eda, 10.0, tag()).unwrap();
        let stats = signal.stats();
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.std_dev, 1.25f64.sqrt());

        let empty = SignalStats::calculate(&[]);
        assert_eq!(empty, SignalStats { mean: 0.0, std_dev: 0.0 });
    }
}
