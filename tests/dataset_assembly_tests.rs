// ================================================================================
// Integration tests for dataset assembly and table persistence
// File: tests/dataset_assembly_tests.rs
// ================================================================================

use eeg_features::dataset::{DatasetAssembler, FeatureTable, Label, LabelRules, Recording};
use eeg_features::error::EegError;
use eeg_features::processing::features::{FeatureConfig, FeatureRecordBuilder, FeatureSet};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn assembler(feature_set: FeatureSet, parallel: bool) -> DatasetAssembler {
    let builder =
        FeatureRecordBuilder::new(feature_set, &FeatureConfig::default(), LabelRules::default()).unwrap();
    DatasetAssembler::new(builder).with_parallel(parallel)
}

fn noisy_recording(source_id: &str, seed: u64) -> Recording {
    let fs = 160.0;
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = Array2::from_shape_fn((4, 960), |(_, i)| {
        (2.0 * PI * 10.0 * i as f64 / fs).sin() + rng.gen_range(-0.5..0.5)
    });
    Recording::new(source_id, fs, samples).unwrap()
}

fn write_recordings(dir: &Path, ids: &[&str]) {
    for (seed, id) in ids.iter().enumerate() {
        noisy_recording(id, seed as u64)
            .write_json(&dir.join(format!("{}.json", id)))
            .unwrap();
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_directory_assembly_round_trip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clean");
    fs::create_dir_all(&input).unwrap();
    write_recordings(&input, &["S002_S002R03", "S001_S001R01", "S001_S001R07", "S002_S002R05"]);

    let report = assembler(FeatureSet::Canonical, false)
        .assemble_directory(&input)
        .unwrap();
    assert_eq!(report.table.len(), 4);
    assert!(report.skipped.is_empty());

    let output = dir.path().join("outputs").join("features.csv");
    report.table.write_csv(&output).unwrap();
    let matrix = FeatureTable::read_csv(&output).unwrap();

    let runs: Vec<&str> = matrix.identities.iter().map(|id| id.run.as_str()).collect();
    assert_eq!(runs, vec!["S001R01", "S001R07", "S002R03", "S002R05"]);
    assert_eq!(matrix.labels, vec![Label::Rest, Label::Motor, Label::Motor, Label::Unknown]);
    assert_eq!(matrix.values.dim(), (4, 9));
    assert!(matrix.values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_unreadable_recordings_are_skipped() {
    let dir = tempdir().unwrap();
    write_recordings(dir.path(), &["S001_S001R01"]);
    fs::write(dir.path().join("S001_S001R02.json"), r#"{"sampling_rate_hz": 160.0}"#).unwrap();
    fs::write(
        dir.path().join("S001_S001R03.json"),
        r#"{"sampling_rate_hz": 160.0, "samples": [[1.0, 2.0], [1.0]]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("S001_S001R04.json"),
        r#"{"sampling_rate_hz": -1.0, "samples": [[1.0, 2.0]]}"#,
    )
    .unwrap();

    let report = assembler(FeatureSet::Entropy, false)
        .assemble_directory(dir.path())
        .unwrap();

    assert_eq!(report.table.len(), 1);
    assert_eq!(report.attempted(), 4);
    let skipped: Vec<&str> = report.skipped.iter().map(|s| s.source_id.as_str()).collect();
    assert_eq!(skipped, vec!["S001_S001R02", "S001_S001R03", "S001_S001R04"]);
}

#[test]
fn test_directory_progress_reported_per_recording() {
    let dir = tempdir().unwrap();
    write_recordings(dir.path(), &["S001_S001R01", "S001_S001R03"]);
    fs::write(dir.path().join("S001_S001R02.json"), "not json").unwrap();

    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let report = tracing::subscriber::with_default(subscriber, || {
        assembler(FeatureSet::Canonical, false)
            .assemble_directory(dir.path())
            .unwrap()
    });
    assert_eq!(report.table.len(), 2);
    assert_eq!(report.skipped.len(), 1);

    // Each file is reported before the next one is read
    let logs = buffer.contents();
    let position = |needle: &str| {
        logs.find(needle)
            .unwrap_or_else(|| panic!("missing '{}' in log:\n{}", needle, logs))
    };
    let first = position("processed 'S001_S001R01'");
    let second = position("skipping 'S001_S001R02'");
    let third = position("processed 'S001_S001R03'");
    assert!(first < second && second < third, "out of order log:\n{}", logs);
}

#[test]
fn test_parallel_assembly_matches_sequential() {
    let recordings: Vec<Recording> = (0..8)
        .map(|i| noisy_recording(&format!("S{:03}_S{:03}R0{}", 8 - i, 8 - i, i % 8 + 1), i))
        .collect();

    let sequential = assembler(FeatureSet::Entropy, false)
        .assemble(recordings.clone())
        .unwrap();
    let parallel = assembler(FeatureSet::Entropy, true).assemble(recordings).unwrap();

    assert_eq!(sequential.table, parallel.table);
    let ids: Vec<String> = parallel.table.records().iter().map(|r| r.source_id().to_string()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn test_empty_assembly_writes_header_only() {
    let dir = tempdir().unwrap();
    let report = assembler(FeatureSet::Entropy, false).assemble(Vec::new()).unwrap();
    assert!(report.table.is_empty());

    let output = dir.path().join("features_entropy.csv");
    report.table.write_csv(&output).unwrap();

    let content = fs::read_to_string(&output).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.starts_with("subject,run,label,delta"));
    assert!(content.trim_end().ends_with("alpha2_over_beta"));
}

#[test]
fn test_mixed_schema_rejected() {
    let recording = noisy_recording("S001_S001R01", 1);
    let canonical = assembler(FeatureSet::Canonical, false).builder().build(&recording).unwrap();
    let entropy = assembler(FeatureSet::Entropy, false).builder().build(&recording).unwrap();

    let result = FeatureTable::from_records(vec![canonical, entropy]);
    assert!(matches!(result, Err(EegError::SchemaMismatch { .. })));
}

#[test]
fn test_output_overwritten() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("features.csv");
    fs::write(&output, "stale content\nthat is long\n").unwrap();

    let report = assembler(FeatureSet::Canonical, false)
        .assemble(vec![noisy_recording("S001_S001R01", 3)])
        .unwrap();
    report.table.write_csv(&output).unwrap();

    let content = fs::read_to_string(&output).unwrap();
    assert!(!content.contains("stale"));
    assert_eq!(content.lines().count(), 2);
}
