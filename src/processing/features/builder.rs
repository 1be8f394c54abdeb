//! Per-recording feature record construction

use crate::config::constants::bands::{ALPHA, BETA, DELTA, THETA};
use crate::config::constants::FEATURE_SENTINEL;
use crate::dataset::identity::LabelRules;
use crate::dataset::recording::Recording;
use crate::error::{EegError, EegResult, ProcessingStage, SignalError};
use crate::processing::features::entropy::{sample_entropy, SampleEntropyConfig};
use crate::processing::features::frequency::{BandPowers, BandRegistry, SpectralEstimator};
use crate::processing::features::hjorth::{self, HjorthParameters};
use crate::processing::features::record::{
    finite_or_sentinel, safe_ratio, CanonicalFeatureRecord, EntropyFeatureRecord, EntropyFeatures,
    FeatureRecord, SpectralRatios,
};
use crate::processing::features::{FeatureConfig, FeatureSet};
use tracing::{debug, warn};

/// Builds one [`FeatureRecord`] per recording.
///
/// Holds no per-recording state, so a single builder is shared across
/// threads during parallel assembly.
#[derive(Debug, Clone)]
pub struct FeatureRecordBuilder {
    feature_set: FeatureSet,
    bands: BandRegistry,
    spectral: SpectralEstimator,
    entropy_spectral: SpectralEstimator,
    entropy: SampleEntropyConfig,
    labels: LabelRules,
}

impl FeatureRecordBuilder {
    pub fn new(feature_set: FeatureSet, config: &FeatureConfig, labels: LabelRules) -> EegResult<Self> {
        config.validated()?;

        Ok(Self {
            feature_set,
            bands: config.bands.clone(),
            spectral: SpectralEstimator::new(config.spectral.clone(), config.empty_band)?,
            entropy_spectral: SpectralEstimator::new(config.entropy_spectral.clone(), config.empty_band)?,
            entropy: config.entropy.clone(),
            labels,
        })
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.feature_set
    }

    /// Feature columns every record from this builder carries
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.bands.names().map(str::to_string).collect();
        columns.extend(SpectralRatios::COLUMNS.iter().map(|c| c.to_string()));
        if self.feature_set == FeatureSet::Entropy {
            columns.extend(EntropyFeatures::COLUMNS.iter().map(|c| c.to_string()));
        }
        columns
    }

    pub fn build(&self, recording: &Recording) -> EegResult<FeatureRecord> {
        let canonical = self.build_canonical(recording)?;

        let record = match self.feature_set {
            FeatureSet::Canonical => FeatureRecord::Canonical(canonical),
            FeatureSet::Entropy => {
                let entropy = self.entropy_features(recording)?;
                FeatureRecord::Entropy(EntropyFeatureRecord { canonical, entropy })
            }
        };

        debug!(
            "built {} record for '{}' ({} features)",
            self.feature_set,
            recording.source_id(),
            record.values().len()
        );
        Ok(record)
    }

    fn build_canonical(&self, recording: &Recording) -> EegResult<CanonicalFeatureRecord> {
        let source_id = recording.source_id();
        let identity = recording.identity();
        let label = self.labels.label_for(&identity);

        let raw = self.spectral.estimate_band_powers(
            recording.samples(),
            recording.sampling_rate_hz(),
            &self.bands,
        )?;
        let band_powers: BandPowers = raw
            .iter()
            .map(|(name, power)| (name.to_string(), sanitize(source_id, name, power)))
            .collect();

        let ratios = SpectralRatios::from_powers(
            required_band(&band_powers, DELTA)?,
            required_band(&band_powers, THETA)?,
            required_band(&band_powers, ALPHA)?,
            required_band(&band_powers, BETA)?,
            band_powers.total(),
        );

        Ok(CanonicalFeatureRecord {
            source_id: source_id.to_string(),
            identity,
            label,
            band_powers,
            ratios,
        })
    }

    fn entropy_features(&self, recording: &Recording) -> EegResult<EntropyFeatures> {
        let source_id = recording.source_id();
        let signal = recording.channel_mean();
        let samples = signal.as_slice().ok_or_else(|| EegError::Processing {
            stage: ProcessingStage::FeatureAssembly,
            reason: format!("'{}': channel mean is not contiguous", source_id),
        })?;

        let sample_entropy = match sample_entropy(samples, &self.entropy) {
            Some(value) => value,
            None => {
                debug!("'{}': sample entropy undefined; using {}", source_id, FEATURE_SENTINEL);
                FEATURE_SENTINEL
            }
        };

        let (hjorth_mobility, hjorth_complexity) = match HjorthParameters::compute(samples) {
            Ok(params) => (params.mobility, params.complexity),
            Err(err) => hjorth_fallback(source_id, samples, err),
        };

        let reduced = self.entropy_spectral.estimate_band_powers(
            signal.view(),
            recording.sampling_rate_hz(),
            &self.bands,
        )?;
        let alpha = sanitize(source_id, ALPHA, required_band(&reduced, ALPHA)?);
        let beta = sanitize(source_id, BETA, required_band(&reduced, BETA)?);

        Ok(EntropyFeatures {
            sample_entropy: sanitize(source_id, "sample_entropy", sample_entropy),
            hjorth_mobility,
            hjorth_complexity,
            alpha2_over_beta: safe_ratio(alpha * alpha, beta),
        })
    }
}

/// Mobility may still be defined when only complexity is degenerate
fn hjorth_fallback(source_id: &str, samples: &[f64], err: SignalError) -> (f64, f64) {
    warn!("'{}': {}; using {}", source_id, err, FEATURE_SENTINEL);
    let mobility = hjorth::mobility(samples).unwrap_or(FEATURE_SENTINEL);
    (mobility, FEATURE_SENTINEL)
}

fn required_band(powers: &BandPowers, name: &str) -> EegResult<f64> {
    powers.get(name).ok_or_else(|| {
        EegError::configuration("features", format!("band registry is missing '{}'", name))
    })
}

fn sanitize(source_id: &str, feature: &str, value: f64) -> f64 {
    let clean = finite_or_sentinel(value);
    if clean.to_bits() != value.to_bits() {
        warn!("'{}': {} is {}; using {}", source_id, feature, value, clean);
    }
    clean
}
