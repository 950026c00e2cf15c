//! Synthetic study for trying the batch driver without real recordings

use crate::ingest;
use crate::manifest::{Manifest, UnitSpec};
use anyhow::Context;
use psyphys_core::{ParticipantCondition, SignalKind};
use psyphys_simulation::{EcgSimConfig, EcgSimulator, EdaSimConfig, EdaSimulator};
use std::path::Path;

const PARTICIPANTS: [&str; 3] = ["p01", "p02", "p03"];
const CONDITIONS: [(&str, &str); 2] = [("rest", "s1"), ("stroop", "s1")];

/// Write ECG and EDA files for every participant and condition into
/// `data_dir`, plus a `units.json` manifest listing them
pub fn write_demo_study(
    data_dir: &Path,
    ecg_seconds: f64,
    eda_seconds: f64,
    seed: u64,
) -> anyhow::Result<Manifest> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let mut manifest = Manifest::default();
    let mut seed = seed;

    for (p, participant) in PARTICIPANTS.iter().enumerate() {
        for (c, (task, session)) in CONDITIONS.iter().enumerate() {
            let tag = ParticipantCondition::with_session(*participant, task, session);
            // Arousal rises under the stroop task
            let aroused = c == 1;

            let ecg_config = EcgSimConfig {
                heart_rate_bpm: 62.0 + 4.0 * p as f64 + if aroused { 12.0 } else { 0.0 },
                seed: Some(seed),
                ..EcgSimConfig::default()
            };
            seed += 1;
            let ecg = EcgSimulator::new(ecg_config)?.generate(ecg_seconds, tag.clone())?;

            let spacing = if aroused { 25.0 } else { 60.0 };
            let eda_config = EdaSimConfig {
                scr_onsets: (1..)
                    .map(|k| k as f64 * spacing)
                    .take_while(|&t| t < eda_seconds - 10.0)
                    .collect(),
                tonic_level: 4.0 + p as f64,
                seed: Some(seed),
                ..EdaSimConfig::default()
            };
            seed += 1;
            let eda = EdaSimulator::new(eda_config)?.generate(eda_seconds, tag.clone())?;

            for (kind, signal) in [(SignalKind::Ecg, &ecg), (SignalKind::Eda, &eda)] {
                let file = format!("{}_{}_{}_{}.csv", participant, task, session, kind.label());
                let header = format!("{} ({})", kind, signal.metadata().unit);
                ingest::write_samples(&data_dir.join(&file), &header, signal.samples())?;

                manifest.units.push(UnitSpec {
                    participant: tag.participant.clone(),
                    condition: tag.condition.clone(),
                    kind,
                    path: file.into(),
                    sampling_rate: None,
                });
            }
        }
    }

    manifest.save(&data_dir.join("units.json"))?;
    tracing::info!(units = manifest.units.len(), dir = %data_dir.display(), "demo study written");
    Ok(manifest)
}
