//! Parallel batch execution
//!
//! Every unit runs on the blocking pool under its own time limit. A unit that
//! fails or times out is recorded and logged; the rest of the batch carries on.

use crate::ingest;
use crate::manifest::UnitSpec;
use psyphys_core::{ParticipantCondition, PsyResult, SignalKind};
use psyphys_processing::{
    EcgPipeline, EdaPipeline, ProcessingConfig, ResultAggregator, UnitFailure, UnitOutcome, UnitResult,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Pipelines keyed by sampling rate, since every filter design depends on it
struct RateCache<P> {
    pipelines: Mutex<HashMap<u64, Arc<P>>>,
}

impl<P> RateCache<P> {
    fn new() -> Self {
        Self {
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_build(&self, rate: f64, build: impl FnOnce() -> PsyResult<P>) -> PsyResult<Arc<P>> {
        // Inserts are single calls, so a lock poisoned by a panicking unit still holds a whole map
        let mut pipelines = self.pipelines.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pipeline) = pipelines.get(&rate.to_bits()) {
            return Ok(Arc::clone(pipeline));
        }

        let pipeline = Arc::new(build()?);
        pipelines.insert(rate.to_bits(), Arc::clone(&pipeline));
        tracing::debug!(rate, "pipeline built for sampling rate");
        Ok(pipeline)
    }
}

/// ECG and EDA pipelines shared by all workers
///
/// The configured rates are built up front; a unit recorded at another rate
/// gets pipelines designed for that rate, built on first use and reused.
pub struct Pipelines {
    config: ProcessingConfig,
    ecg: RateCache<EcgPipeline>,
    eda: RateCache<EdaPipeline>,
}

impl Pipelines {
    pub fn from_config(config: &ProcessingConfig) -> PsyResult<Self> {
        let pipelines = Self {
            config: config.clone(),
            ecg: RateCache::new(),
            eda: RateCache::new(),
        };
        pipelines.ecg_at(config.ecg.sampling_rate)?;
        pipelines.eda_at(config.eda.sampling_rate)?;
        Ok(pipelines)
    }

    fn ecg_at(&self, rate: f64) -> PsyResult<Arc<EcgPipeline>> {
        self.ecg.get_or_build(rate, || {
            let mut config = self.config.ecg.clone();
            config.sampling_rate = rate;
            EcgPipeline::from_config(&config)
        })
    }

    fn eda_at(&self, rate: f64) -> PsyResult<Arc<EdaPipeline>> {
        self.eda.get_or_build(rate, || {
            let mut config = self.config.eda.clone();
            config.sampling_rate = rate;
            EdaPipeline::from_config(&config)
        })
    }

    fn configured_rate(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Ecg => self.config.ecg.sampling_rate,
            SignalKind::Eda => self.config.eda.sampling_rate,
        }
    }

    /// Load and process one unit, at its own rate when the manifest gives one
    pub fn run_unit(&self, unit: &UnitSpec) -> PsyResult<UnitResult> {
        let rate = unit.sampling_rate.unwrap_or_else(|| self.configured_rate(unit.kind));
        let signal = ingest::load_signal(&unit.path, unit.kind, rate, unit.tag())?;

        match unit.kind {
            SignalKind::Ecg => Ok(self.ecg_at(rate)?.run(&signal)?.to_unit_result()),
            SignalKind::Eda => Ok(self.eda_at(rate)?.run(&signal)?.to_unit_result()),
        }
    }
}

/// Batch runner
pub struct BatchRunner {
    pipelines: Arc<Pipelines>,
    max_concurrent_units: usize,
    unit_timeout: Option<Duration>,
}

impl BatchRunner {
    pub fn new(config: &ProcessingConfig) -> PsyResult<Self> {
        config.validate()?;

        Ok(Self {
            pipelines: Arc::new(Pipelines::from_config(config)?),
            max_concurrent_units: config.batch.max_concurrent_units,
            unit_timeout: config.batch.unit_timeout_seconds.map(Duration::from_secs_f64),
        })
    }

    /// Process all units and merge their outcomes
    pub async fn run(&self, units: Vec<UnitSpec>) -> ResultAggregator {
        let permits = Arc::new(Semaphore::new(self.max_concurrent_units));
        let mut tasks = JoinSet::new();

        tracing::info!(units = units.len(), concurrency = self.max_concurrent_units, "batch started");

        for unit in units {
            let pipelines = Arc::clone(&self.pipelines);
            let permits = Arc::clone(&permits);
            let timeout = self.unit_timeout;

            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                process_unit(pipelines, unit, timeout).await
            });
        }

        let mut table = ResultAggregator::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => table.record(outcome),
                Err(e) => tracing::error!(error = %e, "batch task aborted"),
            }
        }
        table.sort();

        tracing::info!(
            succeeded = table.results().len(),
            failed = table.failures().len(),
            "batch finished"
        );
        table
    }
}

async fn process_unit(pipelines: Arc<Pipelines>, unit: UnitSpec, timeout: Option<Duration>) -> UnitOutcome {
    let tag = unit.tag();
    let kind = unit.kind;
    let path = unit.path.clone();

    supervise(tag, kind, path, timeout, move || pipelines.run_unit(&unit)).await
}

/// Run `work` on the blocking pool and turn every way it can end into an outcome
///
/// On timeout the worker thread is left to finish on its own; only its
/// result is discarded.
async fn supervise<F>(
    tag: ParticipantCondition,
    kind: SignalKind,
    path: PathBuf,
    timeout: Option<Duration>,
    work: F,
) -> UnitOutcome
where
    F: FnOnce() -> PsyResult<UnitResult> + Send + 'static,
{
    let work = tokio::task::spawn_blocking(work);

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(joined) => joined,
            Err(_) => {
                tracing::warn!(%tag, ?kind, path = %path.display(), ?limit, "unit timed out");
                return Err(UnitFailure {
                    tag,
                    kind,
                    error_kind: "Timeout".to_string(),
                    message: format!("no result within {:?}", limit),
                });
            }
        },
        None => work.await,
    };

    match joined {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => {
            tracing::warn!(%tag, ?kind, path = %path.display(), error = %e, "unit failed");
            Err(UnitFailure::new(tag, kind, &e))
        }
        Err(e) => {
            tracing::warn!(%tag, ?kind, error = %e, "unit worker panicked");
            Err(UnitFailure {
                tag,
                kind,
                error_kind: "Panic".to_string(),
                message: e.to_string(),
            })
        }
    }
}
