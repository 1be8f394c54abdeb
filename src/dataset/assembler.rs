//! Dataset assembly: recordings in, one feature table out

use crate::dataset::recording::{list_recordings, source_id_for, Recording};
use crate::dataset::table::FeatureTable;
use crate::error::{EegError, EegResult};
use crate::processing::features::{FeatureRecord, FeatureRecordBuilder};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// A recording left out of the table and why
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecording {
    pub source_id: String,
    pub reason: String,
}

/// Outcome of one assembly run
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub table: FeatureTable,
    pub skipped: Vec<SkippedRecording>,
}

impl AssemblyReport {
    /// Recordings processed or skipped
    pub fn attempted(&self) -> usize {
        self.table.len() + self.skipped.len()
    }
}

/// Builds a feature table from a batch of recordings
#[derive(Debug, Clone)]
pub struct DatasetAssembler {
    builder: FeatureRecordBuilder,
    parallel: bool,
}

impl DatasetAssembler {
    pub fn new(builder: FeatureRecordBuilder) -> Self {
        Self {
            builder,
            parallel: false,
        }
    }

    /// Load and build on the rayon thread pool; row order is unaffected
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn builder(&self) -> &FeatureRecordBuilder {
        &self.builder
    }

    /// Build one row per recording, ordered by source identifier.
    ///
    /// Recordings that fail on their own are skipped and reported; a schema
    /// mismatch or configuration failure aborts the whole assembly.
    pub fn assemble(&self, mut recordings: Vec<Recording>) -> EegResult<AssemblyReport> {
        recordings.sort_by(|a, b| a.source_id().cmp(b.source_id()));
        self.assemble_with(&recordings, |recording| {
            (recording.source_id().to_string(), self.builder.build(recording))
        })
    }

    /// Load and assemble every recording file in `dir`, one file at a time.
    ///
    /// Only the recording being processed is held in memory; in parallel
    /// mode each worker loads and builds its own file.
    pub fn assemble_directory(&self, dir: &Path) -> EegResult<AssemblyReport> {
        let mut paths = list_recordings(dir)?;
        paths.sort_by_cached_key(|path| source_id_for(path));
        info!("found {} recordings in {}", paths.len(), dir.display());

        self.assemble_with(&paths, |path| {
            let result = Recording::from_json_file(path)
                .and_then(|recording| self.builder.build(&recording));
            (source_id_for(path), result)
        })
    }

    /// Runs `process` over `items` in order, pushing each row as it completes
    fn assemble_with<T, F>(&self, items: &[T], process: F) -> EegResult<AssemblyReport>
    where
        T: Sync,
        F: Fn(&T) -> (String, EegResult<FeatureRecord>) + Sync + Send,
    {
        let start = Instant::now();
        let mut table = FeatureTable::new(self.builder.columns());
        let mut skipped = Vec::new();

        if self.parallel {
            let built: Vec<(String, EegResult<FeatureRecord>)> =
                items.par_iter().map(&process).collect();
            for (source_id, result) in built {
                accept(&mut table, &mut skipped, source_id, result)?;
            }
        } else {
            for item in items {
                let (source_id, result) = process(item);
                accept(&mut table, &mut skipped, source_id, result)?;
            }
        }

        info!(
            "assembled {} {} records ({} skipped) in {:.2?}",
            table.len(),
            self.builder.feature_set(),
            skipped.len(),
            start.elapsed()
        );

        Ok(AssemblyReport { table, skipped })
    }
}

fn accept(
    table: &mut FeatureTable,
    skipped: &mut Vec<SkippedRecording>,
    source_id: String,
    result: EegResult<FeatureRecord>,
) -> EegResult<()> {
    match result {
        Ok(record) => {
            table.push(record)?;
            info!("processed '{}'", source_id);
        }
        Err(err) if err.is_per_item() => skipped.push(skip(source_id, &err)),
        Err(err) => return Err(err),
    }
    Ok(())
}

fn skip(source_id: String, err: &EegError) -> SkippedRecording {
    warn!("skipping '{}': {}", source_id, err);
    SkippedRecording {
        source_id,
        reason: err.to_string(),
    }
}
