//! psyphys-simulation: synthetic ECG and EDA recordings
//!
//! Deterministic (seeded) generators used by tests, benchmarks and the
//! batch driver's demo run.

pub mod signal_patterns;
pub mod ecg_simulator;
pub mod eda_simulator;

pub use signal_patterns::*;
pub use ecg_simulator::*;
pub use eda_simulator::*;

/// Seed used when a configuration does not fix one
pub(crate) fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
