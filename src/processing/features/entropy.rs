//! Sample entropy
//!
//! `SampEn(m, r) = -ln(A / B)` where `B` counts pairs of length-`m` templates
//! whose Chebyshev distance is strictly below `r` and `A` counts the pairs that
//! still match when extended to length `m + 1`. Self-matches are excluded and
//! both counts use the same `n - m` templates. Cost is quadratic in the signal
//! length; `max_samples` bounds it.

use serde::{Deserialize, Serialize};

/// Sample entropy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEntropyConfig {
    /// Template length `m`
    pub embedding_dimension: usize,
    /// Tolerance as a fraction of the signal's standard deviation
    pub tolerance_ratio: f64,
    /// Only the leading samples are used when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_samples: Option<usize>,
}

impl SampleEntropyConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        use crate::config::constants::entropy::MIN_EMBEDDING_DIMENSION;

        let mut errors = Vec::new();
        if self.embedding_dimension < MIN_EMBEDDING_DIMENSION {
            errors.push(format!(
                "Embedding dimension must be at least {}",
                MIN_EMBEDDING_DIMENSION
            ));
        }
        if !(self.tolerance_ratio.is_finite() && self.tolerance_ratio > 0.0) {
            errors.push(format!(
                "Tolerance ratio must be positive, got {}",
                self.tolerance_ratio
            ));
        }
        if let Some(max) = self.max_samples {
            if max < self.embedding_dimension + 2 {
                errors.push(format!(
                    "max_samples {} is too small for embedding dimension {}",
                    max, self.embedding_dimension
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for SampleEntropyConfig {
    fn default() -> Self {
        use crate::config::constants::entropy::*;

        Self {
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            tolerance_ratio: DEFAULT_TOLERANCE_RATIO,
            max_samples: None,
        }
    }
}

/// Sample entropy of `signal`, or `None` where the statistic is undefined:
/// too few samples, zero spread, or no matching template pairs.
pub fn sample_entropy(signal: &[f64], config: &SampleEntropyConfig) -> Option<f64> {
    let data = match config.max_samples {
        Some(max) if signal.len() > max => &signal[..max],
        _ => signal,
    };

    let m = config.embedding_dimension;
    let n = data.len();
    if m == 0 || n < m + 2 {
        return None;
    }

    let tolerance = config.tolerance_ratio * std_dev(data);
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return None;
    }

    let (matches_m, matches_m1) = count_template_matches(data, m, tolerance);
    if matches_m == 0 || matches_m1 == 0 {
        return None;
    }

    let value = (matches_m as f64 / matches_m1 as f64).ln();
    value.is_finite().then_some(value)
}

/// Counts of matching template pairs at lengths `m` and `m + 1`
fn count_template_matches(data: &[f64], m: usize, tolerance: f64) -> (u64, u64) {
    let templates = data.len() - m;
    let mut matches_m = 0u64;
    let mut matches_m1 = 0u64;

    for i in 0..templates {
        for j in (i + 1)..templates {
            let within = (0..m).all(|k| (data[i + k] - data[j + k]).abs() < tolerance);
            if within {
                matches_m += 1;
                if (data[i + m] - data[j + m]).abs() < tolerance {
                    matches_m1 += 1;
                }
            }
        }
    }

    (matches_m, matches_m1)
}

fn std_dev(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    (data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}
