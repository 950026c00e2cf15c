//! Result files written at the end of a batch run

use anyhow::Context;
use chrono::{DateTime, Utc};
use psyphys_core::SignalKind;
use psyphys_processing::{ProcessingConfig, ResultAggregator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// JSON summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed_at: DateTime<Utc>,
    pub config: ProcessingConfig,
    pub table: ResultAggregator,
}

impl BatchReport {
    pub fn new(config: ProcessingConfig, table: ResultAggregator) -> Self {
        Self {
            processed_at: Utc::now(),
            config,
            table,
        }
    }

    /// Write `ecg_results.csv`, `eda_results.csv` (kinds with results only)
    /// and `results.json` into `out_dir`
    pub fn write(&self, out_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        let mut written = Vec::new();
        for kind in [SignalKind::Ecg, SignalKind::Eda] {
            if self.table.results_of(kind).next().is_none() {
                continue;
            }

            let path = out_dir.join(format!("{}_results.csv", kind.label()));
            let file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            self.table.write_csv(kind, file)?;
            written.push(path);
        }

        let path = out_dir.join("results.json");
        std::fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);

        for path in &written {
            tracing::info!(path = %path.display(), "saved results");
        }
        Ok(written)
    }
}
