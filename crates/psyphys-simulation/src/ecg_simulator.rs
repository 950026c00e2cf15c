//! ECG simulator: regular beats built from Gaussian R and T waves

use crate::signal_patterns::{NoiseConfig, Waveform};
use psyphys_core::{ParticipantCondition, PsyError, PsyResult, Signal, SignalKind, SignalMetadata};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Configuration for ECG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgSimConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Beats per minute; beats are evenly spaced, the first half a period in
    pub heart_rate_bpm: f64,
    /// R-wave amplitude (mV)
    pub r_amplitude: f64,
    /// R-wave Gaussian width (s)
    pub r_width: f64,
    /// T-wave amplitude (mV), 0 to disable
    pub t_amplitude: f64,
    /// Noise configuration
    pub noise: NoiseConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for EcgSimConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 1000.0,
            heart_rate_bpm: 60.0,
            r_amplitude: 1.0,
            r_width: 0.01,
            t_amplitude: 0.3,
            noise: NoiseConfig {
                gaussian_std: 0.01,
                baseline_wander: 0.1,
                wander_frequency: 0.2,
            },
            seed: None,
        }
    }
}

/// ECG signal simulator
pub struct EcgSimulator {
    config: EcgSimConfig,
    rng: rand::rngs::StdRng,
}

impl EcgSimulator {
    /// T wave follows the R wave by this much (s)
    const T_WAVE_DELAY: f64 = 0.25;
    const T_WAVE_WIDTH: f64 = 0.04;

    /// Create new ECG simulator with configuration
    pub fn new(config: EcgSimConfig) -> PsyResult<Self> {
        SignalMetadata::validate_sampling_rate(config.sampling_rate)?;
        if !config.heart_rate_bpm.is_finite() || config.heart_rate_bpm <= 0.0 {
            return Err(PsyError::InvalidParameter {
                reason: format!("heart rate must be positive, got {}", config.heart_rate_bpm),
            });
        }

        let rng = rand::rngs::StdRng::seed_from_u64(config.seed.unwrap_or_else(crate::clock_seed));

        Ok(EcgSimulator { config, rng })
    }

    pub fn config(&self) -> &EcgSimConfig {
        &self.config
    }

    /// R-peak times (s) within `duration`
    pub fn beat_times(&self, duration: f64) -> Vec<f64> {
        let period = 60.0 / self.config.heart_rate_bpm;
        (0..)
            .map(|k| period / 2.0 + k as f64 * period)
            .take_while(|&t| t < duration)
            .collect()
    }

    /// Generate `duration` seconds of ECG
    pub fn generate(&mut self, duration: f64, tag: ParticipantCondition) -> PsyResult<Signal> {
        let fs = self.config.sampling_rate;
        let mut samples = vec![0.0; (duration * fs) as usize];

        for beat in self.beat_times(duration) {
            Waveform::Gaussian {
                center: beat,
                width: self.config.r_width,
                amplitude: self.config.r_amplitude,
            }
            .add_to(&mut samples, fs);

            if self.config.t_amplitude != 0.0 {
                Waveform::Gaussian {
                    center: beat + Self::T_WAVE_DELAY,
                    width: Self::T_WAVE_WIDTH,
                    amplitude: self.config.t_amplitude,
                }
                .add_to(&mut samples, fs);
            }
        }

        self.config.noise.apply(&mut samples, fs, &mut self.rng)?;

        tracing::debug!(duration, bpm = self.config.heart_rate_bpm, %tag, "simulated ECG");
        Signal::from_samples(samples, SignalKind::Ecg, fs, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> EcgSimConfig {
        EcgSimConfig { seed: Some(42), ..EcgSimConfig::default() }
    }

    #[test]
    fn test_ecg_simulator_basic() {
        let mut simulator = EcgSimulator::new(seeded()).unwrap();
        let signal = simulator.generate(2.0, ParticipantCondition::default()).unwrap();

        assert_eq!(signal.len(), 2000);
        assert_eq!(signal.kind(), SignalKind::Ecg);
        assert_eq!(simulator.beat_times(2.0), vec![0.5, 1.5]);

        // R-wave dominates at the beat
        let at_beat = signal.samples()[500];
        let between = signal.samples()[1000];
        assert!(at_beat > 0.8);
        assert!(between.abs() < 0.3);
    }

    #[test]
    fn test_same_seed_same_signal() {
        let a = EcgSimulator::new(seeded()).unwrap().generate(1.0, ParticipantCondition::default()).unwrap();
        let b = EcgSimulator::new(seeded()).unwrap().generate(1.0, ParticipantCondition::default()).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn test_invalid_config() {
        let config = EcgSimConfig { heart_rate_bpm: 0.0, ..seeded() };
        assert!(EcgSimulator::new(config).is_err());

        let config = EcgSimConfig { sampling_rate: -1.0, ..seeded() };
        assert!(EcgSimulator::new(config).is_err());
    }
}
