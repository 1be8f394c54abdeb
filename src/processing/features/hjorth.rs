//! Hjorth parameters: activity, mobility and complexity
//!
//! All variances are population variances. A zero variance in a denominator
//! makes the statistic undefined and is reported as
//! [`SignalError::DegenerateSignal`] instead of producing a non-finite value.

use crate::error::SignalError;

/// Hjorth descriptors of a single signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HjorthParameters {
    /// Variance of the signal
    pub activity: f64,
    /// `sqrt(var(d1) / var(x))`
    pub mobility: f64,
    /// `sqrt(var(d2) / var(d1)) / mobility`
    pub complexity: f64,
}

impl HjorthParameters {
    /// Compute all three parameters, sharing the difference sequences
    pub fn compute(signal: &[f64]) -> Result<Self, SignalError> {
        require_len("complexity", signal, 3)?;

        let d1 = first_difference(signal);
        let d2 = first_difference(&d1);

        let activity = variance(signal);
        let var_d1 = variance(&d1);
        let var_d2 = variance(&d2);

        let mobility = ratio_sqrt("mobility", var_d1, activity)?;
        let complexity = ratio_sqrt("complexity", var_d2, var_d1)? / mobility;
        finite("complexity", complexity)?;

        Ok(Self {
            activity,
            mobility,
            complexity,
        })
    }
}

/// Variance of the signal (Hjorth activity)
pub fn activity(signal: &[f64]) -> Result<f64, SignalError> {
    require_len("activity", signal, 1)?;
    finite("activity", variance(signal))
}

/// `sqrt(var(diff(x)) / var(x))`, requires at least 2 samples
pub fn mobility(signal: &[f64]) -> Result<f64, SignalError> {
    require_len("mobility", signal, 2)?;
    let d1 = first_difference(signal);
    ratio_sqrt("mobility", variance(&d1), variance(signal))
}

/// `sqrt(var(diff(diff(x))) / var(diff(x))) / mobility(x)`, requires at least 3 samples
pub fn complexity(signal: &[f64]) -> Result<f64, SignalError> {
    HjorthParameters::compute(signal).map(|params| params.complexity)
}

/// Consecutive pairwise deltas, length `n - 1`
pub fn first_difference(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

fn variance(data: &[f64]) -> f64 {
    // Exact zero for flat input; the mean of repeated values can round off
    match data.first() {
        None => return 0.0,
        Some(&first) if data.iter().all(|&x| x == first) => return 0.0,
        Some(_) => {}
    }
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n
}

fn ratio_sqrt(statistic: &'static str, numerator: f64, denominator: f64) -> Result<f64, SignalError> {
    if denominator == 0.0 {
        return Err(SignalError::degenerate(statistic, "zero variance in denominator"));
    }
    finite(statistic, (numerator / denominator).sqrt())
}

fn finite(statistic: &'static str, value: f64) -> Result<f64, SignalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SignalError::degenerate(statistic, format!("non-finite result {}", value)))
    }
}

fn require_len(statistic: &'static str, signal: &[f64], required: usize) -> Result<(), SignalError> {
    if signal.len() < required {
        return Err(SignalError::degenerate(
            statistic,
            format!("needs at least {} samples, got {}", required, signal.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    #[test]
    fn test_constant_signal_is_degenerate() {
        let flat = [5.0, 5.0, 5.0, 5.0, 5.0];

        assert!(matches!(mobility(&flat), Err(SignalError::DegenerateSignal { statistic: "mobility", .. })));
        assert!(complexity(&flat).is_err());
        assert_eq!(activity(&flat).unwrap(), 0.0);
    }

    #[test]
    fn test_linear_ramp_has_undefined_complexity() {
        // Constant first difference: mobility defined, complexity not
        let ramp: Vec<f64> = (0..10).map(f64::from).collect();
        assert!(mobility(&ramp).unwrap() > 0.0);
        assert!(matches!(
            complexity(&ramp),
            Err(SignalError::DegenerateSignal { statistic: "complexity", .. })
        ));
    }

    #[test]
    fn test_short_signals() {
        assert!(mobility(&[1.0]).is_err());
        assert!(complexity(&[1.0, 2.0]).is_err());
        assert!(activity(&[]).is_err());
    }

    #[test]
    fn test_known_values() {
        // x = [1, 4, 9]: d1 = [3, 5], d2 = [2]
        let x = [1.0, 4.0, 9.0];
        let var_x = 98.0 / 9.0;
        let expected_mobility = (1.0f64 / var_x).sqrt();
        assert!((mobility(&x).unwrap() - expected_mobility).abs() < 1e-12);
        // var(d2) = 0 gives complexity 0, which is finite and defined
        assert_eq!(complexity(&x).unwrap(), 0.0);
    }

    #[test]
    fn test_sine_mobility_tracks_frequency() {
        // For a sampled sinusoid mobility ~= 2 sin(pi f / fs)
        let fs = 160.0;
        let f = 10.0;
        let signal: Vec<f64> = (0..1600).map(|i| (2.0 * PI * f * i as f64 / fs).sin()).collect();

        let expected = 2.0 * (PI * f / fs).sin();
        let params = HjorthParameters::compute(&signal).unwrap();
        assert!((params.mobility - expected).abs() < 1e-2);
        // A pure tone has complexity close to 1
        assert!((params.complexity - 1.0).abs() < 1e-2);
        assert!((params.activity - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_compute_matches_individual_functions() {
        let signal = [0.3, -1.2, 2.5, 0.7, -0.4, 1.9, -2.2];
        let params = HjorthParameters::compute(&signal).unwrap();
        assert_eq!(params.mobility, mobility(&signal).unwrap());
        assert_eq!(params.complexity, complexity(&signal).unwrap());
    }

    proptest! {
        #[test]
        fn prop_never_non_finite(signal in prop::collection::vec(-1e6f64..1e6, 0..64)) {
            if let Ok(value) = mobility(&signal) {
                prop_assert!(value.is_finite() && value >= 0.0);
            }
            if let Ok(value) = complexity(&signal) {
                prop_assert!(value.is_finite() && value >= 0.0);
            }
        }

        #[test]
        fn prop_constant_signal_degenerate(value in -1e3f64..1e3, len in 2usize..50) {
            let signal = vec![value; len];
            prop_assert!(mobility(&signal).is_err());
        }
    }
}
