//! EDA simulator: drifting tonic level plus skin conductance responses

use crate::signal_patterns::{NoiseConfig, Waveform};
use psyphys_core::{ParticipantCondition, PsyError, PsyResult, Signal, SignalKind, SignalMetadata};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for EDA simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaSimConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Skin conductance level at t = 0 (µS)
    pub tonic_level: f64,
    /// Linear tonic drift (µS/s)
    pub tonic_slope: f64,
    /// Amplitude of a slow tonic oscillation (µS)
    pub tonic_wave_amplitude: f64,
    /// Period of the slow tonic oscillation (s)
    pub tonic_wave_period: f64,
    /// SCR onset times (s)
    pub scr_onsets: Vec<f64>,
    /// SCR peak amplitude (µS)
    pub scr_amplitude: f64,
    pub scr_rise_time: f64,
    pub scr_decay_time: f64,
    /// Noise configuration
    pub noise: NoiseConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for EdaSimConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 1000.0,
            tonic_level: 5.0,
            tonic_slope: 0.002,
            tonic_wave_amplitude: 0.2,
            tonic_wave_period: 300.0,
            scr_onsets: vec![20.0, 50.0, 90.0, 140.0, 200.0, 250.0],
            scr_amplitude: 0.3,
            scr_rise_time: 1.0,
            scr_decay_time: 3.0,
            noise: NoiseConfig {
                gaussian_std: 0.005,
                baseline_wander: 0.0,
                wander_frequency: 0.0,
            },
            seed: None,
        }
    }
}

/// EDA signal simulator
pub struct EdaSimulator {
    config: EdaSimConfig,
    rng: rand::rngs::StdRng,
}

impl EdaSimulator {
    /// Create new EDA simulator with configuration
    pub fn new(config: EdaSimConfig) -> PsyResult<Self> {
        SignalMetadata::validate_sampling_rate(config.sampling_rate)?;
        if config.scr_rise_time <= 0.0 || config.scr_decay_time <= config.scr_rise_time {
            return Err(PsyError::InvalidParameter {
                reason: format!(
                    "SCR decay time ({}) must exceed a positive rise time ({})",
                    config.scr_decay_time, config.scr_rise_time
                ),
            });
        }
        if config.tonic_wave_period <= 0.0 {
            return Err(PsyError::invalid("tonic wave period must be positive"));
        }

        let rng = rand::rngs::StdRng::seed_from_u64(config.seed.unwrap_or_else(crate::clock_seed));

        Ok(EdaSimulator { config, rng })
    }

    pub fn config(&self) -> &EdaSimConfig {
        &self.config
    }

    /// Noise-free tonic level at `time`
    pub fn tonic_at(&self, time: f64) -> f64 {
        self.config.tonic_level
            + self.config.tonic_slope * time
            + self.config.tonic_wave_amplitude * (2.0 * PI * time / self.config.tonic_wave_period).sin()
    }

    /// Generate `duration` seconds of EDA
    pub fn generate(&mut self, duration: f64, tag: ParticipantCondition) -> PsyResult<Signal> {
        let fs = self.config.sampling_rate;
        let mut samples: Vec<f64> = (0..(duration * fs) as usize)
            .map(|i| self.tonic_at(i as f64 / fs))
            .collect();

        for &onset in self.config.scr_onsets.iter().filter(|&&t| t < duration) {
            Waveform::Bateman {
                onset,
                amplitude: self.config.scr_amplitude,
                rise_time: self.config.scr_rise_time,
                decay_time: self.config.scr_decay_time,
            }
            .add_to(&mut samples, fs);
        }

        self.config.noise.apply(&mut samples, fs, &mut self.rng)?;

        tracing::debug!(duration, scrs = self.config.scr_onsets.len(), %tag, "simulated EDA");
        Signal::from_samples(samples, SignalKind::Eda, fs, tag)
    }
}
