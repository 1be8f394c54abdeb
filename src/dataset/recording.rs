//! Cleaned EEG recordings and their on-disk JSON form

use crate::config::constants::paths::RECORDING_EXTENSION;
use crate::dataset::identity::Identity;
use crate::error::{EegError, EegResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One subject-run multi-channel time series
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    source_id: String,
    sampling_rate_hz: f64,
    channel_names: Vec<String>,
    samples: Array2<f64>,
}

/// Serialized recording: `samples[channel][time]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingFile {
    pub sampling_rate_hz: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_names: Vec<String>,
    pub samples: Vec<Vec<f64>>,
}

impl Recording {
    /// Build a recording from a channel-by-time array.
    ///
    /// Requires at least one channel and one sample, a positive finite
    /// sampling rate and finite sample values.
    pub fn new(
        source_id: impl Into<String>,
        sampling_rate_hz: f64,
        samples: Array2<f64>,
    ) -> EegResult<Self> {
        let source_id = source_id.into();

        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(EegError::invalid_data(
                "sampling rate",
                format!("'{}': must be positive and finite, got {}", source_id, sampling_rate_hz),
            ));
        }
        if samples.nrows() == 0 || samples.ncols() == 0 {
            return Err(EegError::invalid_data(
                "recording",
                format!("'{}': empty shape {:?}", source_id, samples.dim()),
            ));
        }
        if let Some(((channel, index), value)) = samples.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(EegError::invalid_data(
                "recording",
                format!("'{}': sample {} of channel {} is {}", source_id, index, channel, value),
            ));
        }

        Ok(Self {
            source_id,
            sampling_rate_hz,
            channel_names: Vec::new(),
            samples,
        })
    }

    /// Attach channel names, one per row
    pub fn with_channel_names(mut self, names: Vec<String>) -> EegResult<Self> {
        if names.len() != self.n_channels() {
            return Err(EegError::invalid_data(
                "channel names",
                format!(
                    "'{}': {} names for {} channels",
                    self.source_id,
                    names.len(),
                    self.n_channels()
                ),
            ));
        }
        self.channel_names = names;
        Ok(self)
    }

    /// Load `{source_id}.json`; the file stem becomes the source identifier
    pub fn from_json_file(path: &Path) -> EegResult<Self> {
        let source_id = source_id_for(path);
        let read_error = |reason: String| EegError::RecordingRead {
            source_id: source_id.clone(),
            reason,
        };

        let content = fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
        let file: RecordingFile =
            serde_json::from_str(&content).map_err(|e| read_error(e.to_string()))?;

        Self::from_file(source_id.clone(), file).map_err(|e| match e {
            EegError::InvalidData { reason, .. } => read_error(reason),
            other => other,
        })
    }

    /// Convert the serialized form, rejecting ragged channels
    pub fn from_file(source_id: impl Into<String>, file: RecordingFile) -> EegResult<Self> {
        let source_id = source_id.into();
        let n_channels = file.samples.len();
        let n_times = file.samples.first().map_or(0, Vec::len);

        if let Some((channel, row)) = file
            .samples
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != n_times)
        {
            return Err(EegError::invalid_data(
                "recording",
                format!(
                    "'{}': channel {} has {} samples, channel 0 has {}",
                    source_id,
                    channel,
                    row.len(),
                    n_times
                ),
            ));
        }

        let flat: Vec<f64> = file.samples.into_iter().flatten().collect();
        let samples = Array2::from_shape_vec((n_channels, n_times), flat)
            .map_err(|e| EegError::invalid_data("recording", format!("'{}': {}", source_id, e)))?;

        let recording = Self::new(source_id, file.sampling_rate_hz, samples)?;
        if file.channel_names.is_empty() {
            Ok(recording)
        } else {
            recording.with_channel_names(file.channel_names)
        }
    }

    /// Serialize to the JSON form read by [`Recording::from_json_file`]
    pub fn write_json(&self, path: &Path) -> EegResult<()> {
        let file = RecordingFile {
            sampling_rate_hz: self.sampling_rate_hz,
            channel_names: self.channel_names.clone(),
            samples: self.samples.outer_iter().map(|row| row.to_vec()).collect(),
        };
        let json = serde_json::to_string(&file)
            .map_err(|e| EegError::invalid_data("recording", e.to_string()))?;
        fs::write(path, json).map_err(|e| EegError::io(path, e))
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn identity(&self) -> Identity {
        Identity::parse(&self.source_id)
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.sampling_rate_hz
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    pub fn n_channels(&self) -> usize {
        self.samples.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.samples.ncols()
    }

    /// Average across channels at each time point
    pub fn channel_mean(&self) -> Array1<f64> {
        self.samples
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.n_times()))
    }
}

/// File stem of a recording path
pub fn source_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Recording files in `dir`, sorted lexicographically by file name
pub fn list_recordings(dir: &Path) -> EegResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| EegError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EegError::io(dir, e))?.path();
        let is_recording = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORDING_EXTENSION));
        if is_recording {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}
