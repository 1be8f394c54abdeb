// src/config/constants.rs
//! Pipeline-wide configuration constants

/// Canonical EEG frequency bands as `(name, fmin_hz, fmax_hz)`
pub mod bands {
    pub const DELTA: &str = "delta";
    pub const THETA: &str = "theta";
    pub const ALPHA: &str = "alpha";
    pub const BETA: &str = "beta";

    pub const CANONICAL: &[(&str, f64, f64)] = &[
        (DELTA, 1.0, 4.0),
        (THETA, 4.0, 8.0),
        (ALPHA, 8.0, 13.0),
        (BETA, 13.0, 30.0),
    ];

    /// Bands the derived ratios are computed from
    pub const REQUIRED: &[&str] = &[DELTA, THETA, ALPHA, BETA];
}

/// Welch estimator presets
pub mod spectral {
    pub const CANONICAL_SEGMENT_LENGTH: usize = 256;
    pub const CANONICAL_OVERLAP: f64 = 0.0;
    pub const CANONICAL_FMIN_HZ: f64 = 1.0;
    pub const CANONICAL_FMAX_HZ: f64 = 30.0;

    pub const ENTROPY_SEGMENT_LENGTH: usize = 1024;
    pub const ENTROPY_OVERLAP: f64 = 0.5;
}

/// Sample entropy defaults
pub mod entropy {
    pub const DEFAULT_EMBEDDING_DIMENSION: usize = 2;
    pub const DEFAULT_TOLERANCE_RATIO: f64 = 0.2;
    pub const MIN_EMBEDDING_DIMENSION: usize = 1;
}

/// Identity parsing and run labelling
pub mod labels {
    pub const IDENTITY_DELIMITER: char = '_';
    pub const UNKNOWN_RUN: &str = "unknown";

    pub const REST_RUNS: &[&str] = &["R01", "R02"];
    pub const MOTOR_RUNS: &[&str] = &["R03", "R04", "R07", "R08"];
}

/// Value substituted for undefined or non-finite features
pub const FEATURE_SENTINEL: f64 = 0.0;

/// File system paths
pub mod paths {
    pub const INPUT_DIR: &str = "data/clean";
    pub const CANONICAL_OUTPUT: &str = "outputs/features.csv";
    pub const ENTROPY_OUTPUT: &str = "outputs/features_entropy.csv";

    pub const DEFAULT_CONFIG_FILE: &str = "eeg_features.toml";
    pub const LOCAL_CONFIG_FILE: &str = "config/local.toml";

    pub const RECORDING_EXTENSION: &str = "json";

    /// Prefix of environment overrides; `__` separates nested keys
    pub const ENV_PREFIX: &str = "EEG_";
    pub const ENV_SEPARATOR: &str = "__";
}
