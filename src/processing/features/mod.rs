//! EEG feature extraction module
//!
//! This module provides the per-recording feature computations:
//! - Frequency domain features (Welch PSD, band power, spectral ratios)
//! - Hjorth parameters (activity, mobility, complexity)
//! - Sample entropy
//! - Typed feature records and the builder that assembles them

pub mod builder;
pub mod entropy;
pub mod frequency;
pub mod hjorth;
pub mod record;

use crate::error::{EegError, EegResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use builder::FeatureRecordBuilder;
pub use entropy::{sample_entropy, SampleEntropyConfig};
pub use frequency::{
    BandPowers, BandRegistry, EmptyBandPolicy, FrequencyBand, Psd, SignalView, SpectralEstimator,
    WelchConfig,
};
pub use hjorth::HjorthParameters;
pub use record::{
    CanonicalFeatureRecord, EntropyFeatureRecord, EntropyFeatures, FeatureRecord, SpectralRatios,
};

/// Which record variant a pipeline run produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSet {
    /// Band powers and spectral ratios
    Canonical,
    /// Canonical features plus sample entropy and Hjorth descriptors
    Entropy,
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSet::Canonical => f.write_str("canonical"),
            FeatureSet::Entropy => f.write_str("entropy"),
        }
    }
}

/// Configuration for feature extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub empty_band: EmptyBandPolicy,
    /// Ordered band registry; order defines band power column order
    pub bands: BandRegistry,
    /// Welch settings for the canonical band powers
    pub spectral: WelchConfig,
    pub entropy: SampleEntropyConfig,
    /// Welch settings for the alpha/beta estimate of the entropy feature set
    pub entropy_spectral: WelchConfig,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            empty_band: EmptyBandPolicy::default(),
            bands: BandRegistry::canonical(),
            spectral: WelchConfig::canonical(),
            entropy: SampleEntropyConfig::default(),
            entropy_spectral: WelchConfig::entropy_variant(),
        }
    }
}

impl FeatureConfig {
    /// Collect every problem with the feature settings
    pub fn validate(&self) -> Result<(), Vec<String>> {
        use crate::config::constants::bands::REQUIRED;

        let mut errors = Vec::new();

        if let Err(band_errors) = self.bands.validate() {
            errors.extend(band_errors);
        }
        for required in REQUIRED {
            if self.bands.get(required).is_none() {
                errors.push(format!("Band registry is missing required band '{}'", required));
            }
        }
        if let Err(spectral_errors) = self.spectral.validate() {
            errors.extend(spectral_errors.into_iter().map(|e| format!("spectral: {}", e)));
        }
        if let Err(spectral_errors) = self.entropy_spectral.validate() {
            errors.extend(spectral_errors.into_iter().map(|e| format!("entropy_spectral: {}", e)));
        }
        if let Err(entropy_errors) = self.entropy.validate() {
            errors.extend(entropy_errors.into_iter().map(|e| format!("entropy: {}", e)));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub(crate) fn validated(&self) -> EegResult<()> {
        self.validate()
            .map_err(|errors| EegError::configuration("features", errors.join("; ")))
    }
}
