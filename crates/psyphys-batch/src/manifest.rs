//! Batch manifest: which recordings to process and how they are tagged

use anyhow::{bail, Context};
use psyphys_core::{ParticipantCondition, SignalKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One recording to process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub participant: String,
    /// Condition label, e.g. `stroop_s1`
    pub condition: String,
    pub kind: SignalKind,
    /// Single-column CSV file; relative paths resolve against the manifest
    pub path: PathBuf,
    /// Recording rate when it differs from the configured one; filters are designed for it
    pub sampling_rate: Option<f64>,
}

impl UnitSpec {
    pub fn tag(&self) -> ParticipantCondition {
        ParticipantCondition::new(self.participant.clone(), self.condition.clone())
    }
}

/// List of units for one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub units: Vec<UnitSpec>,
}

impl Manifest {
    /// Load a manifest file and resolve unit paths against its directory
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

        if manifest.units.is_empty() {
            bail!("manifest {} lists no units", path.display());
        }

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for unit in &mut manifest.units {
            if unit.path.is_relative() {
                unit.path = base.join(&unit.path);
            }
        }

        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write manifest {}", path.display()))
    }
}
