//! Feature records produced per recording
//!
//! Two fixed-schema variants exist: [`CanonicalFeatureRecord`] (band powers and
//! spectral ratios) and [`EntropyFeatureRecord`] (the canonical part plus
//! nonlinear descriptors). Every numeric field is finite.

use crate::config::constants::FEATURE_SENTINEL;
use crate::dataset::identity::{Identity, Label};
use crate::processing::features::frequency::BandPowers;
use crate::processing::features::FeatureSet;

/// Column names of the identity fields leading every table row
pub const IDENTITY_COLUMNS: [&str; 3] = ["subject", "run", "label"];

/// Ratios derived from the canonical band powers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralRatios {
    pub alpha_theta_ratio: f64,
    pub beta_alpha_ratio: f64,
    pub total_power: f64,
    pub log_alpha: f64,
    pub spectral_ratio: f64,
}

impl SpectralRatios {
    pub const COLUMNS: [&'static str; 5] = [
        "alpha_theta_ratio",
        "beta_alpha_ratio",
        "total_power",
        "log_alpha",
        "spectral_ratio",
    ];

    /// Every zero denominator resolves to 0
    pub fn from_powers(delta: f64, theta: f64, alpha: f64, beta: f64, total_power: f64) -> Self {
        Self {
            alpha_theta_ratio: safe_ratio(alpha, theta),
            beta_alpha_ratio: safe_ratio(beta, alpha),
            total_power: finite_or_sentinel(total_power),
            log_alpha: if alpha > 0.0 {
                finite_or_sentinel(alpha.ln())
            } else {
                FEATURE_SENTINEL
            },
            spectral_ratio: safe_ratio(alpha + beta, theta + delta),
        }
    }

    pub fn values(&self) -> [f64; 5] {
        [
            self.alpha_theta_ratio,
            self.beta_alpha_ratio,
            self.total_power,
            self.log_alpha,
            self.spectral_ratio,
        ]
    }
}

/// Band powers plus derived ratios
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalFeatureRecord {
    pub source_id: String,
    pub identity: Identity,
    pub label: Label,
    pub band_powers: BandPowers,
    pub ratios: SpectralRatios,
}

impl CanonicalFeatureRecord {
    pub fn columns(&self) -> Vec<String> {
        self.band_powers
            .names()
            .map(str::to_string)
            .chain(SpectralRatios::COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.band_powers
            .values()
            .chain(self.ratios.values())
            .collect()
    }
}

/// Nonlinear descriptors of the channel-averaged signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyFeatures {
    pub sample_entropy: f64,
    pub hjorth_mobility: f64,
    pub hjorth_complexity: f64,
    pub alpha2_over_beta: f64,
}

impl EntropyFeatures {
    pub const COLUMNS: [&'static str; 4] = [
        "sample_entropy",
        "hjorth_mobility",
        "hjorth_complexity",
        "alpha2_over_beta",
    ];

    pub fn values(&self) -> [f64; 4] {
        [
            self.sample_entropy,
            self.hjorth_mobility,
            self.hjorth_complexity,
            self.alpha2_over_beta,
        ]
    }
}

/// Canonical features extended with entropy and Hjorth descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct EntropyFeatureRecord {
    pub canonical: CanonicalFeatureRecord,
    pub entropy: EntropyFeatures,
}

impl EntropyFeatureRecord {
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.canonical.columns();
        columns.extend(EntropyFeatures::COLUMNS.iter().map(|c| c.to_string()));
        columns
    }

    pub fn values(&self) -> Vec<f64> {
        let mut values = self.canonical.values();
        values.extend(self.entropy.values());
        values
    }
}

/// One row of the feature table
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureRecord {
    Canonical(CanonicalFeatureRecord),
    Entropy(EntropyFeatureRecord),
}

impl FeatureRecord {
    pub fn feature_set(&self) -> FeatureSet {
        match self {
            FeatureRecord::Canonical(_) => FeatureSet::Canonical,
            FeatureRecord::Entropy(_) => FeatureSet::Entropy,
        }
    }

    fn canonical(&self) -> &CanonicalFeatureRecord {
        match self {
            FeatureRecord::Canonical(record) => record,
            FeatureRecord::Entropy(record) => &record.canonical,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.canonical().identity
    }

    pub fn label(&self) -> Label {
        self.canonical().label
    }

    /// Identifier of the recording this row was built from
    pub fn source_id(&self) -> &str {
        &self.canonical().source_id
    }

    /// Feature column names, excluding identity columns
    pub fn columns(&self) -> Vec<String> {
        match self {
            FeatureRecord::Canonical(record) => record.columns(),
            FeatureRecord::Entropy(record) => record.columns(),
        }
    }

    /// Feature values in column order
    pub fn values(&self) -> Vec<f64> {
        match self {
            FeatureRecord::Canonical(record) => record.values(),
            FeatureRecord::Entropy(record) => record.values(),
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is zero or the result is not finite
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return FEATURE_SENTINEL;
    }
    finite_or_sentinel(numerator / denominator)
}

pub fn finite_or_sentinel(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        FEATURE_SENTINEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn powers(values: &[(&str, f64)]) -> BandPowers {
        values.iter().map(|&(name, p)| (name.to_string(), p)).collect()
    }

    #[test]
    fn test_ratios() {
        let ratios = SpectralRatios::from_powers(1.0, 2.0, 4.0, 8.0, 15.0);
        assert_eq!(ratios.alpha_theta_ratio, 2.0);
        assert_eq!(ratios.beta_alpha_ratio, 2.0);
        assert_eq!(ratios.total_power, 15.0);
        assert_eq!(ratios.log_alpha, 4.0f64.ln());
        assert_eq!(ratios.spectral_ratio, 4.0);
    }

    #[test]
    fn test_zero_denominators() {
        let ratios = SpectralRatios::from_powers(0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(ratios.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_record_columns_match_values() {
        let canonical = CanonicalFeatureRecord {
            source_id: "S001_S001R01".to_string(),
            identity: Identity::parse("S001_S001R01"),
            label: Label::Rest,
            band_powers: powers(&[("delta", 1.0), ("theta", 2.0), ("alpha", 3.0), ("beta", 4.0)]),
            ratios: SpectralRatios::from_powers(1.0, 2.0, 3.0, 4.0, 10.0),
        };
        let record = FeatureRecord::Entropy(EntropyFeatureRecord {
            canonical,
            entropy: EntropyFeatures {
                sample_entropy: 0.5,
                hjorth_mobility: 0.2,
                hjorth_complexity: 1.1,
                alpha2_over_beta: 2.25,
            },
        });

        assert_eq!(record.columns().len(), record.values().len());
        assert_eq!(record.columns()[0], "delta");
        assert_eq!(record.columns()[4], "alpha_theta_ratio");
        assert_eq!(record.columns().last().map(String::as_str), Some("alpha2_over_beta"));
        assert_eq!(record.source_id(), "S001_S001R01");
        assert_eq!(record.label(), Label::Rest);
        assert_eq!(record.feature_set(), FeatureSet::Entropy);
    }

    #[test]
    fn test_source_id_kept_verbatim() {
        for source_id in ["S042", "S001_S001R03_raw"] {
            let identity = Identity::parse(source_id);
            let record = FeatureRecord::Canonical(CanonicalFeatureRecord {
                source_id: source_id.to_string(),
                label: Label::Unknown,
                identity,
                band_powers: powers(&[("delta", 1.0)]),
                ratios: SpectralRatios::from_powers(1.0, 0.0, 0.0, 0.0, 1.0),
            });
            assert_eq!(record.source_id(), source_id);
        }
    }

    proptest! {
        #[test]
        fn prop_ratio_safety(
            delta in prop_oneof![Just(0.0), 0.0f64..1e3],
            theta in prop_oneof![Just(0.0), 0.0f64..1e3],
            alpha in prop_oneof![Just(0.0), 0.0f64..1e3],
            beta in prop_oneof![Just(0.0), 0.0f64..1e3],
        ) {
            let ratios = SpectralRatios::from_powers(delta, theta, alpha, beta, delta + theta + alpha + beta);
            for value in ratios.values() {
                prop_assert!(value.is_finite());
            }
            if theta == 0.0 {
                prop_assert_eq!(ratios.alpha_theta_ratio, 0.0);
            }
            if alpha == 0.0 {
                prop_assert_eq!(ratios.beta_alpha_ratio, 0.0);
                prop_assert_eq!(ratios.log_alpha, 0.0);
            }
            if theta + delta == 0.0 {
                prop_assert_eq!(ratios.spectral_ratio, 0.0);
            }
        }

        #[test]
        fn prop_safe_ratio_any_input(n in prop::num::f64::ANY, d in prop::num::f64::ANY) {
            prop_assert!(safe_ratio(n, d).is_finite());
        }
    }
}
