//! EEG-Features: offline feature extraction for rest/motor EEG classification
//!
//! This library turns cleaned multi-channel EEG recordings into a labeled
//! feature table. It features:
//!
//! - Welch power spectral density and band power over a configurable band registry
//! - Hjorth parameters and sample entropy
//! - Subject/run identity parsing and rest/motor labelling
//! - Deterministic dataset assembly with optional rayon parallelism
//! - Layered TOML/environment configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use eeg_features::config::ConfigLoader;
//! use eeg_features::dataset::DatasetAssembler;
//! use eeg_features::processing::features::{FeatureRecordBuilder, FeatureSet};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load()?;
//!     let builder = FeatureRecordBuilder::new(
//!         FeatureSet::Canonical,
//!         &config.features,
//!         config.labels.clone(),
//!     )?;
//!
//!     let report = DatasetAssembler::new(builder).assemble_directory(Path::new("data/clean"))?;
//!     report.table.write_csv(Path::new("outputs/features.csv"))?;
//!
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod processing;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, PipelineConfig};
pub use dataset::{
    AssemblyReport, DatasetAssembler, FeatureMatrix, FeatureTable, Identity, Label, LabelRules,
    Recording,
};
pub use error::{EegError, EegResult, SignalError};
pub use processing::features::{
    BandRegistry, FeatureConfig, FeatureRecord, FeatureRecordBuilder, FeatureSet, FrequencyBand,
    SpectralEstimator, WelchConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Offline EEG feature extraction for rest/motor classification".to_string(),
        features: vec![
            "Welch band power".to_string(),
            "Hjorth parameters".to_string(),
            "Sample entropy".to_string(),
            "Layered configuration".to_string(),
            "CSV feature tables".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
