//! psyphys-processing: event-marker extraction for ECG and EDA recordings
//!
//! Butterworth filtering, QRS enhancement, adaptive and fixed-threshold peak
//! detection, tonic/phasic decomposition and per-unit result tables.

pub mod filters;
pub mod processor;
pub mod peak_search;
pub mod ecg;
pub mod eda;
pub mod config;
pub mod pipeline;
pub mod results;

pub use pipeline::*;
pub use processor::{run_stage, SignalProcessor, StageMetrics, StageTimer};
pub use filters::{
    filtfilt, lfilter, CausalFilter, FilterConfig, FilterDesigner, FilterSpec, FilterType,
    ZeroPhaseFilter,
};
pub use peak_search::find_peaks;
pub use ecg::{EcgDetection, EcgEnhancer, EcgPeakDetector};
pub use eda::{DecomposedEda, EdaDecomposer, EdaPeakDetector, EdaResampler, SmoothedSignal};
pub use config::{BatchConfig, EcgConfig, EdaConfig, ProcessingConfig};
pub use results::{ResultAggregator, UnitFailure, UnitMetrics, UnitOutcome, UnitResult};
