//! Batch entry points shared by the extraction binaries

use crate::config::{ConfigError, ConfigLoader};
use crate::dataset::DatasetAssembler;
use crate::error::EegError;
use crate::logging;
use crate::processing::features::{FeatureRecordBuilder, FeatureSet};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Failures that end a batch run with a non-zero exit status
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("input directory {0} does not exist")]
    MissingInput(PathBuf),

    #[error("no recordings found in {0}")]
    NoRecordings(PathBuf),

    #[error(transparent)]
    Pipeline(#[from] EegError),
}

/// What a completed run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub rows: usize,
    pub skipped: usize,
}

/// Run one feature set end to end and map the outcome to an exit status
pub fn run(feature_set: FeatureSet) -> ExitCode {
    if let Err(err) = logging::init() {
        eprintln!("{}", err);
    }

    match execute(feature_set, &ConfigLoader::new()) {
        Ok(summary) => {
            info!(
                "done: {} rows written to {} ({} recordings skipped)",
                summary.rows,
                summary.output.display(),
                summary.skipped
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// Load configuration, assemble the input directory and write the table
pub fn execute(feature_set: FeatureSet, loader: &ConfigLoader) -> Result<RunSummary, CliError> {
    let config = loader.load()?;
    let summary = config.get_summary();
    info!(
        "extracting {} features from {} (bands: {}, parallel: {})",
        feature_set,
        summary.input_dir.display(),
        summary.bands.join(", "),
        summary.parallel
    );

    let input_dir = &config.paths.input_dir;
    if !input_dir.is_dir() {
        return Err(CliError::MissingInput(input_dir.clone()));
    }

    let builder = FeatureRecordBuilder::new(feature_set, &config.features, config.labels.clone())?;
    let assembler = DatasetAssembler::new(builder).with_parallel(config.parallel);
    let report = assembler.assemble_directory(input_dir)?;

    if report.attempted() == 0 {
        return Err(CliError::NoRecordings(input_dir.clone()));
    }
    for skipped in &report.skipped {
        warn!("skipped '{}': {}", skipped.source_id, skipped.reason);
    }

    let output = config.paths.output_for(feature_set).to_path_buf();
    report.table.write_csv(&output)?;

    Ok(RunSummary {
        output,
        rows: report.table.len(),
        skipped: report.skipped.len(),
    })
}
