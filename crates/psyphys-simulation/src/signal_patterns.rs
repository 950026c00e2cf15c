//! Waveform building blocks and noise for synthetic recordings

use psyphys_core::{PsyError, PsyResult};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Elementary waveform placed on the time axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Waveform {
    /// Gaussian bump (ECG waves)
    Gaussian {
        center: f64,
        width: f64,
        amplitude: f64,
    },
    /// Bi-exponential skin conductance response, scaled so its maximum is `amplitude`
    Bateman {
        onset: f64,
        amplitude: f64,
        rise_time: f64,
        decay_time: f64,
    },
}

impl Waveform {
    /// Value at `time` seconds
    pub fn value_at(&self, time: f64) -> f64 {
        match *self {
            Waveform::Gaussian { center, width, amplitude } => {
                amplitude * (-((time - center) / width).powi(2) / 2.0).exp()
            }

            Waveform::Bateman { onset, amplitude, rise_time, decay_time } => {
                let dt = time - onset;
                if dt < 0.0 {
                    return 0.0;
                }
                let shape = |t: f64| (-t / decay_time).exp() - (-t / rise_time).exp();
                amplitude * shape(dt) / shape(bateman_peak_time(rise_time, decay_time))
            }
        }
    }

    /// Time span outside which the waveform is negligible
    pub fn support(&self) -> (f64, f64) {
        match *self {
            Waveform::Gaussian { center, width, .. } => (center - 8.0 * width, center + 8.0 * width),
            Waveform::Bateman { onset, decay_time, .. } => (onset, onset + 20.0 * decay_time),
        }
    }

    /// Add the waveform into `samples` recorded at `sampling_rate`
    pub fn add_to(&self, samples: &mut [f64], sampling_rate: f64) {
        let (start, end) = self.support();
        let first = (start.max(0.0) * sampling_rate).floor() as usize;
        let last = ((end.max(0.0) * sampling_rate).ceil() as usize).min(samples.len());

        for (i, sample) in samples.iter_mut().enumerate().take(last).skip(first) {
            *sample += self.value_at(i as f64 / sampling_rate);
        }
    }
}

/// Time of the Bateman maximum after onset
fn bateman_peak_time(rise_time: f64, decay_time: f64) -> f64 {
    if (decay_time - rise_time).abs() < f64::EPSILON {
        return rise_time;
    }
    (decay_time / rise_time).ln() * rise_time * decay_time / (decay_time - rise_time)
}

/// Additive measurement noise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub gaussian_std: f64,
    /// Baseline wander amplitude
    pub baseline_wander: f64,
    /// Baseline wander frequency (Hz)
    pub wander_frequency: f64,
}

impl NoiseConfig {
    pub fn none() -> Self {
        Self {
            gaussian_std: 0.0,
            baseline_wander: 0.0,
            wander_frequency: 0.0,
        }
    }

    /// Add wander and white noise to `samples`
    pub fn apply<R: Rng>(&self, samples: &mut [f64], sampling_rate: f64, rng: &mut R) -> PsyResult<()> {
        let normal = Normal::new(0.0, self.gaussian_std).map_err(|e| PsyError::InvalidParameter {
            reason: format!("invalid noise level {}: {}", self.gaussian_std, e),
        })?;

        for (i, sample) in samples.iter_mut().enumerate() {
            let time = i as f64 / sampling_rate;
            *sample += self.baseline_wander * (2.0 * PI * self.wander_frequency * time).sin();
            if self.gaussian_std > 0.0 {
                *sample += normal.sample(rng);
            }
        }
        Ok(())
    }
}
