// src/error.rs
//! Unified error handling for the EEG feature pipeline
//!
//! Two layers of errors exist:
//!
//! - [`SignalError`] is raised by the numerical estimators (Hjorth statistics,
//!   band power aggregation). These are local degeneracies of a single signal and
//!   the record builder decides whether to substitute a sentinel value.
//! - [`EegError`] is the structural error type returned by loading, building and
//!   assembling. Unreadable recordings are reported per item; schema mismatches
//!   abort assembly before anything is written.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Estimator-local failures on a single signal
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    /// Statistic is undefined: zero variance in a denominator or too few samples
    #[error("[SIGNAL] {statistic} undefined for degenerate signal: {reason}")]
    DegenerateSignal {
        statistic: &'static str,
        reason: String,
    },

    /// No frequency bin fell inside the requested band
    #[error("[SPECTRAL] no frequency bins in band '{band}' [{fmin}, {fmax}) Hz")]
    EmptyBandSelection {
        band: String,
        fmin: f64,
        fmax: f64,
    },

    /// Input shorter than the estimator can work with
    #[error("[SIGNAL] {operation} needs at least {required} samples, got {actual}")]
    InsufficientSamples {
        operation: &'static str,
        required: usize,
        actual: usize,
    },
}

impl SignalError {
    pub(crate) fn degenerate(statistic: &'static str, reason: impl Into<String>) -> Self {
        SignalError::DegenerateSignal {
            statistic,
            reason: reason.into(),
        }
    }
}

/// Pipeline stages for error tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStage {
    SpectralEstimation,
    FeatureAssembly,
}

/// Unified error type for the feature extraction pipeline
#[derive(Debug, thiserror::Error)]
pub enum EegError {
    /// Input recording missing, corrupt, or malformed
    #[error("[READ] cannot read recording '{source_id}': {reason}")]
    RecordingRead {
        source_id: String,
        reason: String,
    },

    /// Feature keys differ across the records of one table
    #[error("[SCHEMA] record '{source_id}' has columns {found:?}, table expects {expected:?}")]
    SchemaMismatch {
        source_id: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Invalid input data
    #[error("[DATA] invalid {data_type}: {reason}")]
    InvalidData {
        data_type: String,
        reason: String,
    },

    /// Configuration and setup errors
    #[error("[CONFIG] configuration error in {component}: {reason}")]
    Configuration {
        component: String,
        reason: String,
    },

    /// Stage-level processing failure
    #[error("[PROCESSING] {stage:?} stage error: {reason}")]
    Processing {
        stage: ProcessingStage,
        reason: String,
    },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error("[IO] {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("[CSV] {0}")]
    Csv(#[from] csv::Error),
}

impl EegError {
    pub fn invalid_data(data_type: &str, reason: impl Into<String>) -> Self {
        EegError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn configuration(component: &str, reason: impl Into<String>) -> Self {
        EegError::Configuration {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EegError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only concerns one recording and assembly may continue
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            EegError::RecordingRead { .. } | EegError::InvalidData { .. } | EegError::Signal(_)
        )
    }
}

/// Result type alias for pipeline operations
pub type EegResult<T> = Result<T, EegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_error_display() {
        let err = SignalError::EmptyBandSelection {
            band: "gamma".to_string(),
            fmin: 30.0,
            fmax: 45.0,
        };
        let display = err.to_string();
        assert!(display.contains("gamma"));
        assert!(display.contains("[30, 45)"));
    }

    #[test]
    fn test_signal_error_converts() {
        let err: EegError = SignalError::degenerate("mobility", "zero variance").into();
        assert!(matches!(err, EegError::Signal(SignalError::DegenerateSignal { .. })));
        assert!(err.to_string().contains("mobility"));
        assert!(err.is_per_item());
    }

    #[test]
    fn test_schema_mismatch_is_structural() {
        let err = EegError::SchemaMismatch {
            source_id: "S001_S001R03".to_string(),
            expected: vec!["delta".to_string()],
            found: vec!["sample_entropy".to_string()],
        };
        assert!(!err.is_per_item());
        assert!(err.to_string().contains("S001_S001R03"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EegError>();
        assert_send_sync::<SignalError>();
    }
}
