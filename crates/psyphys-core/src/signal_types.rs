//! Biosignal kinds, units and provenance metadata

use serde::{Deserialize, Serialize};
use crate::error::{PsyError, PsyResult};

/// Physiological signal classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Electrocardiogram
    Ecg,
    /// Electrodermal activity (skin conductance)
    Eda,
}

impl SignalKind {
    /// Physical unit a recording of this kind is conventionally scaled to
    pub fn default_unit(&self) -> PhysicalUnit {
        match self {
            SignalKind::Ecg => PhysicalUnit::Millivolt,
            SignalKind::Eda => PhysicalUnit::Microsiemens,
        }
    }

    /// Lowercase label used in file names and result tables
    pub fn label(&self) -> &'static str {
        match self {
            SignalKind::Ecg => "ecg",
            SignalKind::Eda => "eda",
        }
    }
}

/// Physical unit of the samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalUnit {
    Millivolt,
    Microsiemens,
    /// Unscaled device units or derived quantities (e.g. squared slope)
    Arbitrary,
}

/// Participant × condition key tagging one processing unit
///
/// Only used for result bookkeeping; no algorithm looks at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantCondition {
    pub participant: String,
    pub condition: String,
}

impl ParticipantCondition {
    pub fn new(participant: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            condition: condition.into(),
        }
    }

    /// Build the `<task>_<session>` condition label used for task/session designs
    pub fn with_session(participant: impl Into<String>, task: &str, session: &str) -> Self {
        Self::new(participant, format!("{}_{}", task, session))
    }
}

impl Default for ParticipantCondition {
    fn default() -> Self {
        Self::new("unknown", "unknown")
    }
}

/// Signal metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    /// Kind of physiological signal
    pub kind: SignalKind,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Physical unit of the samples
    pub unit: PhysicalUnit,
    /// Provenance tag
    pub tag: ParticipantCondition,
}

impl SignalMetadata {
    /// Create new metadata with the conventional unit for `kind`
    pub fn new(kind: SignalKind, sampling_rate: f64, tag: ParticipantCondition) -> PsyResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;

        Ok(SignalMetadata {
            kind,
            sampling_rate,
            unit: kind.default_unit(),
            tag,
        })
    }

    /// Override the physical unit
    pub fn with_unit(mut self, unit: PhysicalUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Sampling rates must be positive and finite
    pub fn validate_sampling_rate(rate: f64) -> PsyResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            Err(PsyError::InvalidParameter {
                reason: format!("sampling rate must be positive and finite, got {}", rate),
            })
        } else {
            Ok(())
        }
    }

    /// Metadata for a signal derived from this one at another sampling rate
    pub fn resampled(&self, sampling_rate: f64) -> PsyResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;
        let mut metadata = self.clone();
        metadata.sampling_rate = sampling_rate;
        Ok(metadata)
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Ecg => write!(f, "ECG"),
            SignalKind::Eda => write!(f, "EDA"),
        }
    }
}

impl std::fmt::Display for PhysicalUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicalUnit::Millivolt => write!(f, "mV"),
            PhysicalUnit::Microsiemens => write!(f, "µS"),
            PhysicalUnit::Arbitrary => write!(f, "a.u."),
        }
    }
}

impl std::fmt::Display for ParticipantCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.participant, self.condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_rejects_bad_rates() {
        let tag = ParticipantCondition::new("sub-1", "baseline");
        assert!(SignalMetadata::new(SignalKind::Ecg, 0.0, tag.clone()).is_err());
        assert!(SignalMetadata::new(SignalKind::Ecg, -10.0, tag.clone()).is_err());
        assert!(SignalMetadata::new(SignalKind::Ecg, f64::NAN, tag.clone()).is_err());

        let metadata = SignalMetadata::new(SignalKind::Eda, 1000.0, tag).unwrap();
        assert_eq!(metadata.unit, PhysicalUnit::Microsiemens);
    }

    #[test]
    fn test_session_condition_label() {
        let tag = ParticipantCondition::with_session("sub-01", "walk", "high");
        assert_eq!(tag.condition, "walk_high");
        assert_eq!(tag.to_string(), "sub-01/walk_high");
    }

    #[test]
    fn test_resampled_metadata_keeps_tag() {
        let tag = ParticipantCondition::new("sub-2", "spiderhand");
        let metadata = SignalMetadata::new(SignalKind::Eda, 1000.0, tag.clone()).unwrap();
        let low = metadata.resampled(10.0).unwrap();
        assert_eq!(low.sampling_rate, 10.0);
        assert_eq!(low.tag, tag);
        assert!(metadata.resampled(0.0).is_err());
    }
}
