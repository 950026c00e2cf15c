//! Per-unit results and their aggregation into tables
//!
//! Workers return a [`UnitResult`] or [`UnitFailure`] value; the driver
//! merges them into a [`ResultAggregator`]. Nothing here is shared between
//! workers.

use psyphys_core::{ParticipantCondition, PsyError, PsyResult, SignalKind};
use serde::{Deserialize, Serialize};
use std::io;

/// Tabulated metrics of one unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum UnitMetrics {
    Ecg {
        r_peaks: usize,
        /// Peak count per minute of recording
        bpm: f64,
        /// 60 / mean RR interval; absent with fewer than two peaks
        mean_rr_rate: Option<f64>,
    },
    Eda {
        scr_peaks: usize,
        mean_scr_amplitude: Option<f64>,
        mean_tonic: f64,
    },
}

/// Metrics of one (participant, condition, kind) unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitResult {
    pub tag: ParticipantCondition,
    /// Length of the analysed trace (s)
    pub duration_seconds: f64,
    pub metrics: UnitMetrics,
}

impl UnitResult {
    pub fn kind(&self) -> SignalKind {
        match self.metrics {
            UnitMetrics::Ecg { .. } => SignalKind::Ecg,
            UnitMetrics::Eda { .. } => SignalKind::Eda,
        }
    }
}

/// A unit that could not be processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub tag: ParticipantCondition,
    pub kind: SignalKind,
    /// Error category, e.g. `InvalidParameter` or `Timeout`
    pub error_kind: String,
    pub message: String,
}

impl UnitFailure {
    pub fn new(tag: ParticipantCondition, kind: SignalKind, error: &PsyError) -> Self {
        Self {
            tag,
            kind,
            error_kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one unit as returned by a worker
pub type UnitOutcome = Result<UnitResult, UnitFailure>;

#[derive(Serialize)]
struct EcgRow<'a> {
    #[serde(rename = "Participant")]
    participant: &'a str,
    #[serde(rename = "Condition")]
    condition: &'a str,
    #[serde(rename = "Duration_s")]
    duration: f64,
    #[serde(rename = "ECG_R_Peaks_N")]
    r_peaks: usize,
    #[serde(rename = "ECG_Rate_BPM")]
    bpm: f64,
    #[serde(rename = "ECG_Rate_Mean")]
    mean_rr_rate: Option<f64>,
}

#[derive(Serialize)]
struct EdaRow<'a> {
    #[serde(rename = "Participant")]
    participant: &'a str,
    #[serde(rename = "Condition")]
    condition: &'a str,
    #[serde(rename = "Duration_s")]
    duration: f64,
    #[serde(rename = "SCR_Peaks_N")]
    scr_peaks: usize,
    #[serde(rename = "SCR_Peaks_Amplitude_Mean")]
    mean_scr_amplitude: Option<f64>,
    #[serde(rename = "EDA_Tonic_Mean")]
    mean_tonic: f64,
}

const ECG_HEADER: [&str; 6] = [
    "Participant", "Condition", "Duration_s", "ECG_R_Peaks_N", "ECG_Rate_BPM", "ECG_Rate_Mean",
];
const EDA_HEADER: [&str; 6] = [
    "Participant", "Condition", "Duration_s", "SCR_Peaks_N", "SCR_Peaks_Amplitude_Mean", "EDA_Tonic_Mean",
];

/// Result table for a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultAggregator {
    results: Vec<UnitResult>,
    failures: Vec<UnitFailure>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one worker outcome
    pub fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            Ok(result) => self.results.push(result),
            Err(failure) => self.failures.push(failure),
        }
    }

    /// Combine two tables
    pub fn merge(mut self, other: ResultAggregator) -> Self {
        self.results.extend(other.results);
        self.failures.extend(other.failures);
        self
    }

    /// Order rows by participant, condition and kind
    ///
    /// Workers finish in any order; sorting makes written tables reproducible.
    pub fn sort(&mut self) {
        self.results.sort_by(|a, b| {
            a.tag.cmp(&b.tag).then_with(|| a.kind().label().cmp(b.kind().label()))
        });
        self.failures.sort_by(|a, b| {
            a.tag.cmp(&b.tag).then_with(|| a.kind.label().cmp(b.kind.label()))
        });
    }

    pub fn results(&self) -> &[UnitResult] {
        &self.results
    }

    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    pub fn results_of(&self, kind: SignalKind) -> impl Iterator<Item = &UnitResult> {
        self.results.iter().filter(move |r| r.kind() == kind)
    }

    pub fn len(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.failures.is_empty()
    }

    /// Write the `kind` rows as CSV with a header line
    pub fn write_csv<W: io::Write>(&self, kind: SignalKind, writer: W) -> PsyResult<()> {
        let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

        let header = match kind {
            SignalKind::Ecg => ECG_HEADER,
            SignalKind::Eda => EDA_HEADER,
        };
        wtr.write_record(header).map_err(csv_error)?;

        for result in self.results_of(kind) {
            let participant = result.tag.participant.as_str();
            let condition = result.tag.condition.as_str();
            let duration = result.duration_seconds;

            let written = match &result.metrics {
                UnitMetrics::Ecg { r_peaks, bpm, mean_rr_rate } => wtr.serialize(EcgRow {
                    participant,
                    condition,
                    duration,
                    r_peaks: *r_peaks,
                    bpm: *bpm,
                    mean_rr_rate: *mean_rr_rate,
                }),
                UnitMetrics::Eda { scr_peaks, mean_scr_amplitude, mean_tonic } => wtr.serialize(EdaRow {
                    participant,
                    condition,
                    duration,
                    scr_peaks: *scr_peaks,
                    mean_scr_amplitude: *mean_scr_amplitude,
                    mean_tonic: *mean_tonic,
                }),
            };
            written.map_err(csv_error)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// CSV table for `kind` as a string
    pub fn to_csv(&self, kind: SignalKind) -> PsyResult<String> {
        let mut buffer = Vec::new();
        self.write_csv(kind, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| PsyError::Io { reason: e.to_string() })
    }
}

impl FromIterator<UnitOutcome> for ResultAggregator {
    fn from_iter<I: IntoIterator<Item = UnitOutcome>>(iter: I) -> Self {
        let mut table = ResultAggregator::new();
        for outcome in iter {
            table.record(outcome);
        }
        table
    }
}

fn csv_error(e: csv::Error) -> PsyError {
    PsyError::Io { reason: e.to_string() }
}
