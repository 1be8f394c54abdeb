// src/config/loader.rs
//! Layered configuration loader
//!
//! Layers, later ones winning: built-in defaults, each existing config file in
//! order, then environment variables. `EEG_FEATURES__ENTROPY__MAX_SAMPLES=4000`
//! sets `features.entropy.max_samples`.

use crate::config::{constants::paths, PipelineConfig};
use std::path::{Path, PathBuf};

/// Tables replaced wholesale by an overlay instead of merged key by key
const REPLACED_TABLES: &[&[&str]] = &[&["features", "bands"]];

/// Configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration validation errors:\n  {}", .0.join("\n  "))]
    Validation(Vec<String>),
}

impl ConfigLoader {
    /// Create loader over the default config file locations
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Read overrides from variables starting with `prefix` instead
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load and validate the merged configuration
    pub fn load(&self) -> Result<PipelineConfig, ConfigError> {
        let mut merged_config = toml::Value::try_from(PipelineConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        // Missing files are optional layers
        for config_path in &self.config_paths {
            if config_path.exists() {
                let file_config = Self::load_config_file(config_path)?;
                tracing::debug!("merging configuration from {}", config_path.display());
                merge_toml_values(&mut merged_config, file_config, &mut Vec::new());
            }
        }

        self.apply_environment_overrides(&mut merged_config);

        let config: PipelineConfig = merged_config
            .try_into()
            .map_err(|e| ConfigError::Parse(format!("Failed to deserialize config: {}", e)))?;

        config
            .validate_consistency()
            .map_err(ConfigError::Validation)?;

        Ok(config)
    }

    /// Validate a single configuration file on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<PipelineConfig, ConfigError> {
        let config: PipelineConfig = toml::from_str(&read(path.as_ref())?)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config
            .validate_consistency()
            .map_err(ConfigError::Validation)?;

        Ok(config)
    }

    /// Export a configuration to file
    pub fn export_config<P: AsRef<Path>>(config: &PipelineConfig, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let toml_content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, toml_content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        toml::from_str(&read(path)?)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        let mut overrides: Vec<(String, String)> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&self.env_prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect();
        overrides.sort();

        for (key, value) in overrides {
            let path: Vec<&str> = key.split(paths::ENV_SEPARATOR).collect();
            tracing::debug!("environment override {} = {}", path.join("."), value);
            set_nested_value(config, &path, &value);
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ]
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value, key_path: &mut Vec<String>) {
    let replaced = REPLACED_TABLES
        .iter()
        .any(|table| table.iter().copied().eq(key_path.iter().map(String::as_str)));

    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) if !replaced => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    key_path.push(key);
                    merge_toml_values(base_value, value, key_path);
                    key_path.pop();
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Interpret an environment string using the type already present at that key
fn parse_env_value(existing: Option<&toml::Value>, value: &str) -> toml::Value {
    match existing {
        Some(toml::Value::String(_)) => toml::Value::String(value.to_string()),
        Some(toml::Value::Float(_)) => value
            .parse::<f64>()
            .map(toml::Value::Float)
            .unwrap_or_else(|_| toml::Value::String(value.to_string())),
        _ => {
            if let Ok(int_val) = value.parse::<i64>() {
                toml::Value::Integer(int_val)
            } else if let Ok(float_val) = value.parse::<f64>() {
                toml::Value::Float(float_val)
            } else if let Ok(bool_val) = value.parse::<bool>() {
                toml::Value::Boolean(bool_val)
            } else if let Ok(inline) = toml::from_str::<toml::Value>(&format!("v = {}", value)) {
                // Arrays such as ["R01", "R02"]
                inline.get("v").cloned().unwrap_or_else(|| toml::Value::String(value.to_string()))
            } else {
                toml::Value::String(value.to_string())
            }
        }
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[&str], value: &str) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }

    if let toml::Value::Table(table) = current {
        let parsed = parse_env_value(table.get(*last), value);
        table.insert(last.to_string(), parsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::identity::LabelMatching;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn loader_for(paths: Vec<PathBuf>, prefix: &str) -> ConfigLoader {
        ConfigLoader::with_paths(paths).with_env_prefix(prefix)
    }

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert_eq!(loader.config_paths().len(), 2);
    }

    #[test]
    fn test_load_default_config() {
        let config = loader_for(Vec::new(), "EEGTEST_DEFAULTS_").load().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_later_files_win() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("eeg_features.toml");
        let local = dir.path().join("local.toml");
        std::fs::write(
            &base,
            r#"
parallel = true

[paths]
input_dir = "recordings"
canonical_output = "out/base.csv"
            "#,
        )
        .unwrap();
        std::fs::write(&local, "[paths]\ncanonical_output = \"out/local.csv\"\n").unwrap();

        let config = loader_for(vec![base, local, dir.path().join("missing.toml")], "EEGTEST_LAYERS_")
            .load()
            .unwrap();

        assert!(config.parallel);
        assert_eq!(config.paths.input_dir, PathBuf::from("recordings"));
        assert_eq!(config.paths.canonical_output, PathBuf::from("out/local.csv"));
        assert_eq!(config.paths.entropy_output, PathBuf::from(paths::ENTROPY_OUTPUT));
    }

    #[test]
    fn test_band_table_is_replaced() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[features.bands]
beta = [13.0, 30.0]
alpha = [8.0, 12.0]
theta = [4.0, 8.0]
delta = [0.5, 4.0]
            "#
        )
        .unwrap();

        let config = loader_for(vec![file.path().to_path_buf()], "EEGTEST_BANDS_")
            .load()
            .unwrap();

        let names: Vec<&str> = config.features.bands.names().collect();
        assert_eq!(names, vec!["beta", "alpha", "theta", "delta"]);
        assert_eq!(config.features.bands.get("alpha").map(|b| b.fmax_hz), Some(12.0));
    }

    #[test]
    fn test_environment_override() {
        std::env::set_var("EEGTEST_ENV_PATHS__INPUT_DIR", "2024");
        std::env::set_var("EEGTEST_ENV_FEATURES__ENTROPY__MAX_SAMPLES", "4000");
        std::env::set_var("EEGTEST_ENV_FEATURES__SPECTRAL__OVERLAP", "0");
        std::env::set_var("EEGTEST_ENV_LABELS__MATCHING", "exact_run_code");
        std::env::set_var("EEGTEST_ENV_PARALLEL", "true");

        let config = loader_for(Vec::new(), "EEGTEST_ENV_").load().unwrap();

        assert_eq!(config.paths.input_dir, PathBuf::from("2024"));
        assert_eq!(config.features.entropy.max_samples, Some(4000));
        assert_eq!(config.features.spectral.overlap, 0.0);
        assert_eq!(config.labels.matching, LabelMatching::ExactRunCode);
        assert!(config.parallel);

        for key in [
            "EEGTEST_ENV_PATHS__INPUT_DIR",
            "EEGTEST_ENV_FEATURES__ENTROPY__MAX_SAMPLES",
            "EEGTEST_ENV_FEATURES__SPECTRAL__OVERLAP",
            "EEGTEST_ENV_LABELS__MATCHING",
            "EEGTEST_ENV_PARALLEL",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_environment_array_override() {
        std::env::set_var("EEGTEST_ARRAY_LABELS__MOTOR", r#"["R05", "R06"]"#);
        let config = loader_for(Vec::new(), "EEGTEST_ARRAY_").load().unwrap();
        std::env::remove_var("EEGTEST_ARRAY_LABELS__MOTOR");

        assert_eq!(config.labels.motor, vec!["R05".to_string(), "R06".to_string()]);
    }

    #[test]
    fn test_invalid_config_validation() {
        let loader = ConfigLoader::new();

        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[features.spectral]
segment_length = 256
overlap = 1.5  # Must be below 1
window = "hamming"
        "#
        )
        .unwrap();

        match loader.validate_config_file(temp_file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("overlap")));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_reported() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "parallel = [unclosed").unwrap();

        let result = loader_for(vec![temp_file.path().to_path_buf()], "EEGTEST_PARSE_").load();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_export() {
        let temp_file = NamedTempFile::new().unwrap();
        ConfigLoader::export_config(&PipelineConfig::default(), temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("[paths]"));

        let reloaded = ConfigLoader::new().validate_config_file(temp_file.path()).unwrap();
        assert_eq!(reloaded, PipelineConfig::default());
    }
}
