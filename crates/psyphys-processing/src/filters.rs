//! Digital filters for biosignal processing
//!
//! Butterworth design (analog prototype, pre-warping, bilinear transform) and
//! the two ways the pipelines apply a design: a causal single pass
//! ([`lfilter`]) and a zero-phase forward-backward pass ([`filtfilt`]).

use crate::processor::SignalProcessor;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex;
use psyphys_core::{PsyError, PsyResult, Signal, SignalMetadata};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Filter types supported by the designer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Butterworth lowpass filter
    Lowpass,
    /// Butterworth bandpass filter
    Bandpass,
}

/// Serializable filter description, designed against a sampling rate later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Filter type
    pub filter_type: FilterType,
    /// Filter order (a bandpass of order N has 2N poles)
    pub order: usize,
    /// Cutoff frequencies in Hz, ascending; one for lowpass, two for bandpass
    pub cutoffs: Vec<f64>,
}

impl FilterConfig {
    /// Create lowpass filter configuration
    pub fn lowpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::Lowpass,
            order,
            cutoffs: vec![cutoff_freq],
        }
    }

    /// Create bandpass filter configuration
    pub fn bandpass(low_cutoff: f64, high_cutoff: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::Bandpass,
            order,
            cutoffs: vec![low_cutoff, high_cutoff],
        }
    }

    /// Design the coefficients for a given sampling rate
    pub fn design(&self, sampling_rate: f64) -> PsyResult<FilterSpec> {
        FilterDesigner::design(self.filter_type, &self.cutoffs, self.order, sampling_rate)
    }
}

/// Designed IIR filter: transfer-function coefficients with `a[0] == 1`
///
/// Immutable; reuse it for every signal recorded at the same rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    filter_type: FilterType,
    order: usize,
    cutoffs: Vec<f64>,
    normalized_cutoffs: Vec<f64>,
    sampling_rate: f64,
    b: Vec<f64>,
    a: Vec<f64>,
}

impl FilterSpec {
    /// Butterworth lowpass designed for `sampling_rate`
    pub fn lowpass(cutoff: f64, order: usize, sampling_rate: f64) -> PsyResult<Self> {
        FilterDesigner::design(FilterType::Lowpass, &[cutoff], order, sampling_rate)
    }

    /// Butterworth bandpass designed for `sampling_rate`
    pub fn bandpass(low: f64, high: f64, order: usize, sampling_rate: f64) -> PsyResult<Self> {
        FilterDesigner::design(FilterType::Bandpass, &[low, high], order, sampling_rate)
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Cutoffs in Hz
    pub fn cutoffs(&self) -> &[f64] {
        &self.cutoffs
    }

    /// Cutoffs as a fraction of the Nyquist frequency
    pub fn normalized_cutoffs(&self) -> &[f64] {
        &self.normalized_cutoffs
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Numerator coefficients
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Denominator coefficients
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Magnitude response at `freq` Hz
    pub fn gain_at(&self, freq: f64) -> f64 {
        let omega = 2.0 * PI * freq / self.sampling_rate;
        let eval = |coeffs: &[f64]| -> Complex<f64> {
            coeffs.iter()
                .enumerate()
                .map(|(k, &c)| c * Complex::from_polar(1.0, -omega * k as f64))
                .sum()
        };
        (eval(&self.b) / eval(&self.a)).norm()
    }
}

/// Butterworth filter designer
pub struct FilterDesigner;

impl FilterDesigner {
    /// Design a digital Butterworth filter
    ///
    /// Cutoffs are normalized by the Nyquist frequency and must fall in
    /// `(0, 1)`; bandpass cutoffs must be strictly ascending.
    pub fn design(
        filter_type: FilterType,
        cutoffs: &[f64],
        order: usize,
        sampling_rate: f64,
    ) -> PsyResult<FilterSpec> {
        SignalMetadata::validate_sampling_rate(sampling_rate)?;

        if order == 0 {
            return Err(PsyError::invalid("filter order must be at least 1"));
        }

        let expected = match filter_type {
            FilterType::Lowpass => 1,
            FilterType::Bandpass => 2,
        };
        if cutoffs.len() != expected {
            return Err(PsyError::InvalidParameter {
                reason: format!(
                    "{:?} filter needs {} cutoff(s), got {}",
                    filter_type, expected, cutoffs.len()
                ),
            });
        }

        if let Some(bad) = cutoffs.iter().find(|c| !c.is_finite() || **c <= 0.0) {
            return Err(PsyError::InvalidParameter {
                reason: format!("cutoff frequencies must be positive, got {}", bad),
            });
        }

        if cutoffs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PsyError::invalid("bandpass cutoffs must be in ascending order"));
        }

        let nyquist = sampling_rate / 2.0;
        let normalized: Vec<f64> = cutoffs.iter().map(|c| c / nyquist).collect();
        if let Some(bad) = normalized.iter().find(|wn| **wn >= 1.0) {
            return Err(PsyError::InvalidParameter {
                reason: format!(
                    "cutoff must be below the Nyquist frequency {} Hz (normalized {:.4})",
                    nyquist, bad
                ),
            });
        }

        let (zeros, poles, gain) = butterworth_zpk(filter_type, order, &normalized);
        let b: Vec<f64> = poly(&zeros).iter().map(|c| c.re * gain).collect();
        let a: Vec<f64> = poly(&poles).iter().map(|c| c.re).collect();

        if let Some(index) = b.iter().chain(a.iter()).position(|c| !c.is_finite()) {
            return Err(PsyError::FilterInstability {
                stage: "filter design",
                index,
            });
        }

        tracing::debug!(
            ?filter_type,
            order,
            ?cutoffs,
            sampling_rate,
            "designed Butterworth filter"
        );

        Ok(FilterSpec {
            filter_type,
            order,
            cutoffs: cutoffs.to_vec(),
            normalized_cutoffs: normalized,
            sampling_rate,
            b,
            a,
        })
    }
}

/// Digital zeros, poles and gain of a Butterworth filter
fn butterworth_zpk(
    filter_type: FilterType,
    order: usize,
    normalized: &[f64],
) -> (Vec<Complex<f64>>, Vec<Complex<f64>>, f64) {
    // Analog prototype poles on the left half of the unit circle
    let n = order as f64;
    let prototype: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let m = -n + 1.0 + 2.0 * k as f64;
            -Complex::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect();

    // Pre-warp for the bilinear transform with fs = 2
    let fs2 = 4.0;
    let warp = |wn: f64| fs2 * (PI * wn / 2.0).tan();

    let (zeros, poles, gain) = match filter_type {
        FilterType::Lowpass => {
            let wo = warp(normalized[0]);
            let poles: Vec<Complex<f64>> = prototype.iter().map(|&p| p * wo).collect();
            (Vec::new(), poles, wo.powi(order as i32))
        }
        FilterType::Bandpass => {
            let w1 = warp(normalized[0]);
            let w2 = warp(normalized[1]);
            let bw = w2 - w1;
            let wo_sq = w1 * w2;

            let mut poles = Vec::with_capacity(2 * order);
            let scaled: Vec<Complex<f64>> = prototype.iter().map(|&p| p * (bw / 2.0)).collect();
            for &p in &scaled {
                poles.push(p + (p * p - wo_sq).sqrt());
            }
            for &p in &scaled {
                poles.push(p - (p * p - wo_sq).sqrt());
            }
            let zeros = vec![Complex::new(0.0, 0.0); order];
            (zeros, poles, bw.powi(order as i32))
        }
    };

    // Bilinear transform; zeros at infinity land on z = -1
    let to_z = |&s: &Complex<f64>| (fs2 + s) / (fs2 - s);
    let mut z_zeros: Vec<Complex<f64>> = zeros.iter().map(to_z).collect();
    let z_poles: Vec<Complex<f64>> = poles.iter().map(to_z).collect();
    z_zeros.resize(z_poles.len(), Complex::new(-1.0, 0.0));

    let num: Complex<f64> = zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex<f64> = poles.iter().map(|&p| fs2 - p).product();
    let z_gain = gain * (num / den).re;

    (z_zeros, z_poles, z_gain)
}

/// Polynomial coefficients (highest power first) from its roots
fn poly(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for &root in roots {
        let mut next = coeffs.clone();
        next.push(Complex::new(0.0, 0.0));
        for i in 1..next.len() {
            next[i] -= root * coeffs[i - 1];
        }
        coeffs = next;
    }
    coeffs
}

/// Coefficients padded to a common length
fn padded_coefficients(spec: &FilterSpec) -> (Vec<f64>, Vec<f64>) {
    let n = spec.a.len().max(spec.b.len());
    let mut b = spec.b.clone();
    let mut a = spec.a.clone();
    b.resize(n, 0.0);
    a.resize(n, 0.0);
    (b, a)
}

/// Direct form II transposed filter with an initial state
fn lfilter_with_state(b: &[f64], a: &[f64], input: &[f64], mut state: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    let mut output = Vec::with_capacity(input.len());

    for &x in input {
        if n == 1 {
            output.push(b[0] * x);
            continue;
        }

        let y = b[0] * x + state[0];
        for i in 0..n - 2 {
            state[i] = b[i + 1] * x + state[i + 1] - a[i + 1] * y;
        }
        state[n - 2] = b[n - 1] * x - a[n - 1] * y;
        output.push(y);
    }

    output
}

/// First non-finite sample, reported as a filter instability
fn check_finite(samples: &[f64], stage: &'static str) -> PsyResult<()> {
    match samples.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(PsyError::FilterInstability { stage, index }),
        None => Ok(()),
    }
}

/// Causal single-pass filter with zero initial state
///
/// Phase-shifting; output length equals input length.
pub fn lfilter(spec: &FilterSpec, input: &[f64]) -> PsyResult<Vec<f64>> {
    let (b, a) = padded_coefficients(spec);
    let output = lfilter_with_state(&b, &a, input, vec![0.0; b.len().saturating_sub(1)]);
    check_finite(&output, "lfilter")?;
    Ok(output)
}

/// Steady-state initial conditions for a unit step input
pub fn lfilter_zi(spec: &FilterSpec) -> PsyResult<Vec<f64>> {
    let (b, a) = padded_coefficients(spec);
    let m = b.len() - 1;
    if m == 0 {
        return Ok(Vec::new());
    }

    // (I - companion(a)^T) zi = b[1..] - a[1..] * b[0]
    let i_minus_a = DMatrix::<f64>::from_fn(m, m, |r, c| {
        let identity = if r == c { 1.0 } else { 0.0 };
        let first_column = if c == 0 { -a[r + 1] } else { 0.0 };
        let super_diagonal = if c == r + 1 { 1.0 } else { 0.0 };
        identity - first_column - super_diagonal
    });
    let rhs = DVector::<f64>::from_iterator(m, (0..m).map(|i| b[i + 1] - a[i + 1] * b[0]));

    let zi = i_minus_a
        .lu()
        .solve(&rhs)
        .ok_or_else(|| PsyError::invalid("filter has no steady state (singular system)"))?;

    Ok(zi.iter().copied().collect())
}

/// Padding used by [`filtfilt`] on each side of the input
pub fn filtfilt_padlen(spec: &FilterSpec) -> usize {
    3 * spec.a.len().max(spec.b.len())
}

/// Zero-phase forward-backward filter
///
/// The input is extended by odd reflection at both ends and each pass starts
/// from steady-state conditions scaled to the first sample, so the output is
/// neither shifted nor dominated by start-up transients.
pub fn filtfilt(spec: &FilterSpec, input: &[f64]) -> PsyResult<Vec<f64>> {
    let padlen = filtfilt_padlen(spec);
    if input.len() <= padlen {
        return Err(PsyError::InvalidParameter {
            reason: format!(
                "zero-phase filtering needs more than {} samples, got {}",
                padlen,
                input.len()
            ),
        });
    }

    let first = input[0];
    let last = input[input.len() - 1];
    let mut extended = Vec::with_capacity(input.len() + 2 * padlen);
    extended.extend((1..=padlen).rev().map(|i| 2.0 * first - input[i]));
    extended.extend_from_slice(input);
    extended.extend((1..=padlen).map(|i| 2.0 * last - input[input.len() - 1 - i]));

    let (b, a) = padded_coefficients(spec);
    let zi = lfilter_zi(spec)?;

    let x0 = extended[0];
    let forward = lfilter_with_state(&b, &a, &extended, zi.iter().map(|z| z * x0).collect());

    let mut reversed = forward;
    reversed.reverse();
    let y0 = reversed[0];
    let mut backward = lfilter_with_state(&b, &a, &reversed, zi.iter().map(|z| z * y0).collect());
    backward.reverse();

    let output = backward[padlen..padlen + input.len()].to_vec();
    check_finite(&output, "filtfilt")?;
    Ok(output)
}

/// Trailing moving average; the first `window - 1` outputs have no full window
pub fn trailing_moving_average(input: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut output = Vec::with_capacity(input.len());
    if window == 0 {
        output.resize(input.len(), None);
        return output;
    }

    let mut sum = 0.0;
    for (i, &x) in input.iter().enumerate() {
        sum += x;
        if i >= window {
            sum -= input[i - window];
        }
        if i + 1 >= window {
            output.push(Some(sum / window as f64));
        } else {
            output.push(None);
        }
    }

    output
}

/// Causal application of a design as a signal stage
pub struct CausalFilter {
    spec: FilterSpec,
}

impl CausalFilter {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
}

impl SignalProcessor for CausalFilter {
    fn process(&self, input: &Signal) -> PsyResult<Signal> {
        check_rate(&self.spec, input)?;
        Ok(input.derive(lfilter(&self.spec, input.samples())?))
    }

    fn name(&self) -> &str {
        "Causal Butterworth Filter"
    }
}

/// Zero-phase application of a design as a signal stage
pub struct ZeroPhaseFilter {
    spec: FilterSpec,
}

impl ZeroPhaseFilter {
    pub fn new(spec: FilterSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }
}

impl SignalProcessor for ZeroPhaseFilter {
    fn process(&self, input: &Signal) -> PsyResult<Signal> {
        check_rate(&self.spec, input)?;
        Ok(input.derive(filtfilt(&self.spec, input.samples())?))
    }

    fn name(&self) -> &str {
        "Zero-phase Butterworth Filter"
    }
}

/// A design only applies to signals recorded at its own rate
pub(crate) fn check_rate(spec: &FilterSpec, signal: &Signal) -> PsyResult<()> {
    let rate = signal.sampling_rate();
    if (spec.sampling_rate() - rate).abs() > 1e-9 * rate.max(1.0) {
        return Err(PsyError::InvalidParameter {
            reason: format!(
                "filter designed for {} Hz applied to a {} Hz signal",
                spec.sampling_rate(),
                rate
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use psyphys_core::{ParticipantCondition, SignalKind};

    #[test]
    fn test_butterworth_lowpass_coefficients() {
        // Reference values for a 2nd order lowpass at half Nyquist
        let spec = FilterSpec::lowpass(250.0, 2, 1000.0).unwrap();

        assert_eq!(spec.b().len(), 3);
        assert_abs_diff_eq!(spec.b()[0], 0.292_893_218_813_452_5, epsilon = 1e-12);
        assert_abs_diff_eq!(spec.b()[1], 0.585_786_437_626_905, epsilon = 1e-12);
        assert_abs_diff_eq!(spec.b()[2], 0.292_893_218_813_452_5, epsilon = 1e-12);
        assert_abs_diff_eq!(spec.a()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(spec.a()[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(spec.a()[2], 0.171_572_875_253_809_9, epsilon = 1e-12);
    }

    #[test]
    fn test_lowpass_response() {
        let spec = FilterSpec::lowpass(0.05, 4, 10.0).unwrap();

        assert_eq!(spec.a().len(), 5);
        assert_abs_diff_eq!(spec.gain_at(0.0), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(spec.gain_at(0.05), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert!(spec.gain_at(1.0) < 1e-4);
    }

    #[test]
    fn test_bandpass_response() {
        let spec = FilterSpec::bandpass(0.5, 30.0, 1, 1000.0).unwrap();

        assert_eq!(spec.b().len(), 3);
        assert_eq!(spec.a().len(), 3);
        assert_abs_diff_eq!(spec.gain_at(0.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(spec.gain_at(500.0), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(spec.gain_at(0.5), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_abs_diff_eq!(spec.gain_at(30.0), std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert!(spec.gain_at(4.0) > 0.95);
    }

    #[test]
    fn test_design_rejects_bad_parameters() {
        assert!(FilterSpec::lowpass(0.0, 4, 10.0).is_err());
        assert!(FilterSpec::lowpass(-1.0, 4, 10.0).is_err());
        assert!(FilterSpec::lowpass(5.0, 4, 10.0).is_err()); // at Nyquist
        assert!(FilterSpec::lowpass(1.0, 0, 10.0).is_err());
        assert!(FilterSpec::bandpass(30.0, 0.5, 1, 1000.0).is_err());
        assert!(FilterSpec::bandpass(10.0, 10.0, 1, 1000.0).is_err());
        assert!(FilterSpec::bandpass(0.5, 600.0, 1, 1000.0).is_err());
        assert!(FilterDesigner::design(FilterType::Bandpass, &[1.0], 2, 100.0).is_err());
        assert!(FilterSpec::lowpass(1.0, 2, 0.0).is_err());

        let err = FilterSpec::lowpass(6.0, 2, 10.0).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn test_lfilter_keeps_length_and_dc() {
        let spec = FilterSpec::lowpass(5.0, 2, 100.0).unwrap();
        let output = lfilter(&spec, &vec![1.0; 500]).unwrap();

        assert_eq!(output.len(), 500);
        // Starts from rest, settles at unity DC gain
        assert!(output[0] < 0.1);
        assert_abs_diff_eq!(output[499], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_filtfilt_constant_passthrough() {
        let spec = FilterSpec::lowpass(0.05, 4, 10.0).unwrap();
        let output = filtfilt(&spec, &vec![3.5; 200]).unwrap();

        assert_eq!(output.len(), 200);
        for value in output {
            assert_abs_diff_eq!(value, 3.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_filtfilt_preserves_pulse_position_lfilter_does_not() {
        let spec = FilterSpec::lowpass(0.5, 2, 10.0).unwrap();
        let pulse: Vec<f64> = (0..401)
            .map(|i| (-((i as f64 - 200.0) / 10.0).powi(2) / 2.0).exp())
            .collect();

        let argmax = |x: &[f64]| {
            x.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best })
                .0
        };

        let zero_phase = filtfilt(&spec, &pulse).unwrap();
        assert_eq!(argmax(&zero_phase), 200);

        let causal = lfilter(&spec, &pulse).unwrap();
        assert!(argmax(&causal) > 202);
    }

    #[test]
    fn test_filtfilt_rejects_short_input() {
        let spec = FilterSpec::lowpass(0.05, 4, 10.0).unwrap();
        assert_eq!(filtfilt_padlen(&spec), 15);
        assert!(filtfilt(&spec, &[1.0; 15]).is_err());
        assert!(filtfilt(&spec, &[1.0; 16]).is_ok());
    }

    #[test]
    fn test_lfilter_zi_steady_state() {
        let spec = FilterSpec::bandpass(0.5, 30.0, 1, 1000.0).unwrap();
        let zi = lfilter_zi(&spec).unwrap();
        let (b, a) = padded_coefficients(&spec);

        // A step that starts in steady state stays flat
        let output = lfilter_with_state(&b, &a, &[1.0; 50], zi);
        for value in output {
            assert_abs_diff_eq!(value, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_trailing_moving_average() {
        let output = trailing_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);

        assert_eq!(output[0], None);
        assert_eq!(output[1], None);
        assert_abs_diff_eq!(output[2].unwrap(), 2.0);
        assert_abs_diff_eq!(output[4].unwrap(), 4.0);
    }

    #[test]
    fn test_filter_stage_rejects_rate_mismatch() {
        let spec = FilterSpec::lowpass(5.0, 2, 100.0).unwrap();
        let stage = CausalFilter::new(spec);
        let signal = Signal::from_samples(
            vec![0.0; 10],
            SignalKind::Ecg,
            1000.0,
            ParticipantCondition::default(),
        ).unwrap();

        assert!(stage.process(&signal).is_err());
    }
}
