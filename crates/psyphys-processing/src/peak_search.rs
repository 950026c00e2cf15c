//! Threshold and distance constrained peak search
//!
//! Shared by the ECG and EDA detectors. Candidates are the local maxima at or
//! above the height threshold; when two candidates are closer than the
//! minimum distance the larger one wins.

use psyphys_core::{Peak, PeakSet, PsyResult};
use std::cmp::Ordering;

/// Local maxima, plateaus resolved to their middle sample
///
/// The first and last samples are never maxima. For an even-width plateau
/// the lower of the two middle samples is reported.
pub fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    maxima
}

/// Drop candidates closer than `distance` to a larger accepted peak
///
/// Candidates are visited from largest to smallest amplitude (equal
/// amplitudes: later index first). Returns the survivors in index order.
pub fn select_by_distance(candidates: &[usize], x: &[f64], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; candidates.len()];
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&i, &j| {
        x[candidates[j]]
            .partial_cmp(&x[candidates[i]])
            .unwrap_or(Ordering::Equal)
            .then(j.cmp(&i))
    });

    for &i in &order {
        if !keep[i] {
            continue;
        }

        let mut k = i;
        while k > 0 && candidates[i] - candidates[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }

        let mut k = i + 1;
        while k < candidates.len() && candidates[k] - candidates[i] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    candidates.iter()
        .zip(keep)
        .filter_map(|(&index, kept)| kept.then_some(index))
        .collect()
}

/// Full search: local maxima, height filter, distance suppression
pub fn find_peaks(
    x: &[f64],
    threshold: f64,
    distance: usize,
    sampling_rate: f64,
) -> PsyResult<PeakSet> {
    let distance = distance.max(1);

    let candidates: Vec<usize> = local_maxima(x)
        .into_iter()
        .filter(|&i| x[i] >= threshold)
        .collect();

    if candidates.is_empty() {
        return Ok(PeakSet::empty(threshold, distance, x.len(), sampling_rate));
    }

    let accepted = select_by_distance(&candidates, x, distance);
    tracing::trace!(
        candidates = candidates.len(),
        accepted = accepted.len(),
        threshold,
        distance,
        "peak search"
    );

    let peaks = accepted.into_iter()
        .map(|index| Peak { index, amplitude: x[index] })
        .collect();

    PeakSet::new(peaks, threshold, distance, x.len(), sampling_rate)
}

/// Seconds to samples, rounded, at least one sample
pub fn seconds_to_samples(seconds: f64, sampling_rate: f64) -> usize {
    ((seconds * sampling_rate).round() as usize).max(1)
}
