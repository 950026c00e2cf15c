//! Single-column recording files
//!
//! One sample per row after a header row. Only the first column is read;
//! blank lines are ignored.

use psyphys_core::{ParticipantCondition, PsyError, PsyResult, Signal, SignalKind};
use std::io;
use std::path::Path;

/// Read the samples of a recording file
pub fn read_samples(path: &Path) -> PsyResult<Vec<f64>> {
    let file = std::fs::File::open(path).map_err(|e| PsyError::Io {
        reason: format!("{}: {}", path.display(), e),
    })?;
    parse_samples(file)
}

/// Parse samples from any reader
pub fn parse_samples<R: io::Read>(reader: R) -> PsyResult<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| PsyError::Io { reason: e.to_string() })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or_default();

        let field = match record.get(0) {
            Some(field) if !field.is_empty() => field,
            _ => continue,
        };

        let value: f64 = field.parse().map_err(|e| PsyError::Parse {
            line,
            reason: format!("'{}' is not a number: {}", field, e),
        })?;
        if !value.is_finite() {
            return Err(PsyError::Parse {
                line,
                reason: format!("non-finite sample '{}'", field),
            });
        }
        samples.push(value);
    }

    Ok(samples)
}

/// Load a recording as a tagged [`Signal`]
pub fn load_signal(
    path: &Path,
    kind: SignalKind,
    sampling_rate: f64,
    tag: ParticipantCondition,
) -> PsyResult<Signal> {
    let samples = read_samples(path)?;
    tracing::debug!(path = %path.display(), samples = samples.len(), %tag, "recording loaded");
    Signal::from_samples(samples, kind, sampling_rate, tag)
}

/// Write samples in the same layout, with `header` as the first row
pub fn write_samples(path: &Path, header: &str, samples: &[f64]) -> PsyResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| PsyError::Io { reason: e.to_string() })?;
    wtr.write_record([header])
        .map_err(|e| PsyError::Io { reason: e.to_string() })?;
    for sample in samples {
        wtr.write_record([sample.to_string()])
            .map_err(|e| PsyError::Io { reason: e.to_string() })?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_skipped_and_blank_lines_ignored() {
        let text = "ECG (mV)\n0.1\n\n-0.25\n  3e-2 \n";
        let samples = parse_samples(text.as_bytes()).unwrap();
        assert_eq!(samples, vec![0.1, -0.25, 0.03]);
    }

    #[test]
    fn test_only_first_column_is_read() {
        let text = "value,time\n1.5,0.0\n2.5,0.001\n";
        assert_eq!(parse_samples(text.as_bytes()).unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn test_bad_value_reports_line() {
        let text = "EDA\n5.0\nn/a\n";
        match parse_samples(text.as_bytes()).unwrap_err() {
            PsyError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_samples(Path::new("/nonexistent/p01_rest_ecg.csv")).unwrap_err();
        assert_eq!(err.kind(), "Io");
    }

    #[test]
    fn test_written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p01_rest_eda.csv");
        write_samples(&path, "EDA", &[5.0, 5.125, 5.25]).unwrap();

        let signal = load_signal(&path, SignalKind::Eda, 1000.0, ParticipantCondition::new("p01", "rest")).unwrap();
        assert_eq!(signal.samples(), &[5.0, 5.125, 5.25]);
    }
}
