//! Detected peaks (R-peaks, SCRs) and their invariants

use crate::error::{PsyError, PsyResult};
use serde::{Deserialize, Serialize};

/// One accepted peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Sample index into the source signal
    pub index: usize,
    /// Source sample value at `index`
    pub amplitude: f64,
}

/// Whether a detector found anything
///
/// `NoPeaksFound` is a valid outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionStatus {
    PeaksFound,
    NoPeaksFound,
}

/// Ordered set of accepted peaks
///
/// Indices are strictly increasing, lie in `[0, signal_len)`, are spaced at
/// least `min_distance` samples apart, and every amplitude is at or above
/// `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakSet {
    peaks: Vec<Peak>,
    threshold: f64,
    min_distance: usize,
    signal_len: usize,
    sampling_rate: f64,
}

impl PeakSet {
    /// Build a peak set, checking every invariant
    pub fn new(
        peaks: Vec<Peak>,
        threshold: f64,
        min_distance: usize,
        signal_len: usize,
        sampling_rate: f64,
    ) -> PsyResult<Self> {
        for (i, peak) in peaks.iter().enumerate() {
            if peak.index >= signal_len {
                return Err(PsyError::InvalidParameter {
                    reason: format!("peak index {} outside signal of length {}", peak.index, signal_len),
                });
            }
            if peak.amplitude < threshold {
                return Err(PsyError::InvalidParameter {
                    reason: format!(
                        "peak at {} has amplitude {} below threshold {}",
                        peak.index, peak.amplitude, threshold
                    ),
                });
            }
            if i > 0 {
                let previous = peaks[i - 1].index;
                if peak.index <= previous || peak.index - previous < min_distance {
                    return Err(PsyError::InvalidParameter {
                        reason: format!(
                            "peaks at {} and {} violate ordering or minimum distance {}",
                            previous, peak.index, min_distance
                        ),
                    });
                }
            }
        }

        Ok(PeakSet {
            peaks,
            threshold,
            min_distance,
            signal_len,
            sampling_rate,
        })
    }

    /// Empty result for a signal with nothing above threshold
    pub fn empty(threshold: f64, min_distance: usize, signal_len: usize, sampling_rate: f64) -> Self {
        PeakSet {
            peaks: Vec::new(),
            threshold,
            min_distance,
            signal_len,
            sampling_rate,
        }
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn indices(&self) -> Vec<usize> {
        self.peaks.iter().map(|p| p.index).collect()
    }

    pub fn amplitudes(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.amplitude).collect()
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn min_distance(&self) -> usize {
        self.min_distance
    }

    pub fn signal_len(&self) -> usize {
        self.signal_len
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn status(&self) -> DetectionStatus {
        if self.peaks.is_empty() {
            DetectionStatus::NoPeaksFound
        } else {
            DetectionStatus::PeaksFound
        }
    }

    /// Peak times in seconds from the start of the source signal
    pub fn times(&self) -> Vec<f64> {
        self.peaks.iter()
            .map(|p| p.index as f64 / self.sampling_rate)
            .collect()
    }

    /// Intervals between consecutive peaks in seconds (RR intervals for ECG)
    pub fn intervals(&self) -> Vec<f64> {
        self.peaks.windows(2)
            .map(|w| (w[1].index - w[0].index) as f64 / self.sampling_rate)
            .collect()
    }

    /// Mean instantaneous rate in events per minute, from the mean interval
    ///
    /// `None` with fewer than two peaks.
    pub fn mean_interval_rate(&self) -> Option<f64> {
        let intervals = self.intervals();
        if intervals.is_empty() {
            return None;
        }
        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        Some(60.0 / mean)
    }

    /// Mean peak amplitude, `None` when empty
    pub fn mean_amplitude(&self) -> Option<f64> {
        if self.peaks.is_empty() {
            None
        } else {
            Some(self.peaks.iter().map(|p| p.amplitude).sum::<f64>() / self.peaks.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn peak(index: usize, amplitude: f64) -> Peak {
        Peak { index, amplitude }
    }

    #[test]
    fn test_valid_peak_set() {
        let set = PeakSet::new(vec![peak(10, 1.0), peak(30, 2.0)], 0.5, 10, 100, 10.0).unwrap();
        assert_eq!(set.indices(), vec![10, 30]);
        assert_eq!(set.status(), DetectionStatus::PeaksFound);
        assert_relative_eq!(set.intervals()[0], 2.0);
        assert_relative_eq!(set.mean_interval_rate().unwrap(), 30.0);
        assert_relative_eq!(set.mean_amplitude().unwrap(), 1.5);
    }

    #[test]
    fn test_invariant_violations() {
        // too close
        assert!(PeakSet::new(vec![peak(10, 1.0), peak(15, 1.0)], 0.5, 10, 100, 10.0).is_err());
        // out of order
        assert!(PeakSet::new(vec![peak(30, 1.0), peak(10, 1.0)], 0.5, 1, 100, 10.0).is_err());
        // out of range
        assert!(PeakSet::new(vec![peak(100, 1.0)], 0.5, 1, 100, 10.0).is_err());
        // below threshold
        assert!(PeakSet::new(vec![peak(5, 0.1)], 0.5, 1, 100, 10.0).is_err());
    }

    #[test]
    fn test_empty_set() {
        let set = PeakSet::empty(0.02, 10, 0, 10.0);
        assert_eq!(set.status(), DetectionStatus::NoPeaksFound);
        assert!(set.mean_interval_rate().is_none());
        assert!(set.mean_amplitude().is_none());
    }
}
