//! Core signal processor trait and stage metrics

use psyphys_core::{PsyResult, Signal};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A stateless signal-to-signal stage
///
/// Implementations hold only immutable configuration, so one instance can be
/// shared across threads processing different units.
pub trait SignalProcessor: Send + Sync {
    /// Process a signal and return the derived signal
    fn process(&self, input: &Signal) -> PsyResult<Signal>;

    /// Get processor name/identifier
    fn name(&self) -> &str;
}

/// Timing record for one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Stage name
    pub stage: String,
    /// Wall-clock processing time in microseconds
    pub processing_time_us: u64,
    /// Samples handed to the stage
    pub input_len: usize,
    /// Samples produced by the stage
    pub output_len: usize,
}

/// Helper for timing a stage
pub struct StageTimer {
    stage: String,
    input_len: usize,
    start: Instant,
}

impl StageTimer {
    pub fn start(stage: &str, input_len: usize) -> Self {
        Self {
            stage: stage.to_string(),
            input_len,
            start: Instant::now(),
        }
    }

    pub fn finish(self, output_len: usize) -> StageMetrics {
        let metrics = StageMetrics {
            stage: self.stage,
            processing_time_us: self.start.elapsed().as_micros() as u64,
            input_len: self.input_len,
            output_len,
        };
        tracing::debug!(
            stage = %metrics.stage,
            us = metrics.processing_time_us,
            input = metrics.input_len,
            output = metrics.output_len,
            "stage finished"
        );
        metrics
    }
}

/// Run a [`SignalProcessor`] and record its timing
pub fn run_stage(
    processor: &dyn SignalProcessor,
    input: &Signal,
    metrics: &mut Vec<StageMetrics>,
) -> PsyResult<Signal> {
    let timer = StageTimer::start(processor.name(), input.len());
    let output = processor.process(input)?;
    metrics.push(timer.finish(output.len()));
    Ok(output)
}
