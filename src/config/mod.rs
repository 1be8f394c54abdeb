// src/config/mod.rs
//! Pipeline configuration: defaults, TOML files and environment overrides

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::dataset::identity::{LabelMatching, LabelRules};
use crate::processing::features::{FeatureConfig, FeatureSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Build records on the rayon thread pool
    #[serde(default = "defaults::parallel")]
    pub parallel: bool,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    pub labels: LabelRules,
}

/// Input directory and output table locations
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "defaults::input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "defaults::canonical_output")]
    pub canonical_output: PathBuf,

    #[serde(default = "defaults::entropy_output")]
    pub entropy_output: PathBuf,
}

impl PathsConfig {
    pub fn output_for(&self, feature_set: FeatureSet) -> &Path {
        match feature_set {
            FeatureSet::Canonical => &self.canonical_output,
            FeatureSet::Entropy => &self.entropy_output,
        }
    }
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::paths;
    use std::path::PathBuf;

    pub fn parallel() -> bool { false }

    pub fn input_dir() -> PathBuf { PathBuf::from(paths::INPUT_DIR) }
    pub fn canonical_output() -> PathBuf { PathBuf::from(paths::CANONICAL_OUTPUT) }
    pub fn entropy_output() -> PathBuf { PathBuf::from(paths::ENTROPY_OUTPUT) }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: defaults::input_dir(),
            canonical_output: defaults::canonical_output(),
            entropy_output: defaults::entropy_output(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parallel: defaults::parallel(),
            paths: PathsConfig::default(),
            features: FeatureConfig::default(),
            labels: LabelRules::default(),
        }
    }
}

/// Configuration utility functions
impl PipelineConfig {
    /// Validate configuration consistency
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(feature_errors) = self.features.validate() {
            errors.extend(feature_errors);
        }

        // Both feature sets may run in one session
        if self.paths.canonical_output == self.paths.entropy_output {
            errors.push(format!(
                "Canonical and entropy outputs must differ, both are {}",
                self.paths.canonical_output.display()
            ));
        }
        for (name, path) in [
            ("input_dir", &self.paths.input_dir),
            ("canonical_output", &self.paths.canonical_output),
            ("entropy_output", &self.paths.entropy_output),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(format!("paths.{} must not be empty", name));
            }
        }

        // An empty code is a substring of every run token
        for (class, codes) in [("rest", &self.labels.rest), ("motor", &self.labels.motor)] {
            if codes.iter().any(|code| code.trim().is_empty()) {
                errors.push(format!("labels.{} contains an empty run code", class));
            }
        }
        if let Some(shared) = self.labels.rest.iter().find(|code| self.labels.motor.contains(code)) {
            errors.push(format!("Run code '{}' is listed as both rest and motor", shared));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        ConfigSummary {
            input_dir: self.paths.input_dir.clone(),
            canonical_output: self.paths.canonical_output.clone(),
            entropy_output: self.paths.entropy_output.clone(),
            bands: self.features.bands.names().map(str::to_string).collect(),
            label_matching: self.labels.matching,
            parallel: self.parallel,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub input_dir: PathBuf,
    pub canonical_output: PathBuf,
    pub entropy_output: PathBuf,
    pub bands: Vec<String>,
    pub label_matching: LabelMatching,
    pub parallel: bool,
}
