//! Feature table persistence
//!
//! A table is written as CSV: `subject,run,label` followed by the feature
//! columns, one row per record. Every record in a table shares one schema.

use crate::dataset::identity::{Identity, Label};
use crate::error::{EegError, EegResult};
use crate::processing::features::record::{FeatureRecord, IDENTITY_COLUMNS};
use csv::{Reader, Writer};
use ndarray::Array2;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Ordered rows of feature records sharing one column schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    feature_columns: Option<Vec<String>>,
    records: Vec<FeatureRecord>,
}

impl FeatureTable {
    /// Empty table with a declared schema, written as a header-only file
    pub fn new(feature_columns: Vec<String>) -> Self {
        Self {
            feature_columns: Some(feature_columns),
            records: Vec::new(),
        }
    }

    /// Table whose schema is taken from the first record
    pub fn from_records(records: Vec<FeatureRecord>) -> EegResult<Self> {
        let mut table = Self::default();
        for record in records {
            table.push(record)?;
        }
        Ok(table)
    }

    /// Append a record, rejecting one whose columns differ from the table's
    pub fn push(&mut self, record: FeatureRecord) -> EegResult<()> {
        let columns = record.columns();
        match &self.feature_columns {
            Some(expected) if *expected != columns => {
                return Err(EegError::SchemaMismatch {
                    source_id: record.source_id().to_string(),
                    expected: expected.clone(),
                    found: columns,
                });
            }
            Some(_) => {}
            None => self.feature_columns = Some(columns),
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    /// Feature columns, `None` for an empty table without a declared schema
    pub fn feature_columns(&self) -> Option<&[String]> {
        self.feature_columns.as_deref()
    }

    /// Full header: identity columns followed by feature columns
    pub fn columns(&self) -> Vec<String> {
        match &self.feature_columns {
            Some(features) => IDENTITY_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .chain(features.iter().cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Write to `path`, creating parent directories and overwriting any existing file
    pub fn write_csv(&self, path: &Path) -> EegResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EegError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| EegError::io(path, e))?;
        self.to_writer(file)?;

        tracing::info!("wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> EegResult<()> {
        let mut writer = Writer::from_writer(writer);

        let header = self.columns();
        if !header.is_empty() {
            writer.write_record(&header)?;
        }

        for record in &self.records {
            let identity = record.identity();
            let row = [
                identity.subject.clone(),
                identity.run.clone(),
                record.label().to_string(),
            ]
            .into_iter()
            .chain(record.values().into_iter().map(|v| v.to_string()));
            writer.write_record(row)?;
        }

        writer.flush().map_err(|e| EegError::io("<csv writer>", e))?;
        Ok(())
    }

    /// Read a persisted table back as a numeric matrix
    pub fn read_csv(path: &Path) -> EegResult<FeatureMatrix> {
        let file = File::open(path).map_err(|e| EegError::io(path, e))?;
        FeatureMatrix::from_reader(file)
    }
}

/// Training-ready view of a persisted table
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_columns: Vec<String>,
    pub identities: Vec<Identity>,
    pub labels: Vec<Label>,
    /// One row per record, one column per feature
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn from_reader<R: Read>(reader: R) -> EegResult<Self> {
        let mut reader = Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        if headers.is_empty() {
            return Ok(Self {
                feature_columns: Vec::new(),
                identities: Vec::new(),
                labels: Vec::new(),
                values: Array2::zeros((0, 0)),
            });
        }

        let leading: Vec<&str> = headers.iter().take(IDENTITY_COLUMNS.len()).collect();
        if leading != IDENTITY_COLUMNS {
            return Err(EegError::invalid_data(
                "feature table",
                format!("expected leading columns {:?}, found {:?}", IDENTITY_COLUMNS, leading),
            ));
        }

        let feature_columns: Vec<String> = headers
            .iter()
            .skip(IDENTITY_COLUMNS.len())
            .map(str::to_string)
            .collect();

        let mut identities = Vec::new();
        let mut labels = Vec::new();
        let mut flat = Vec::new();

        for (row_index, result) in reader.records().enumerate() {
            let row = result?;
            let field = |i: usize| row.get(i).unwrap_or_default();

            identities.push(Identity {
                subject: field(0).to_string(),
                run: field(1).to_string(),
            });
            labels.push(field(2).parse::<Label>().map_err(|reason| {
                EegError::invalid_data("feature table", format!("row {}: {}", row_index + 1, reason))
            })?);

            for (offset, column) in feature_columns.iter().enumerate() {
                let raw = field(IDENTITY_COLUMNS.len() + offset);
                let value = raw.parse::<f64>().map_err(|e| {
                    EegError::invalid_data(
                        "feature table",
                        format!("row {}, column '{}': '{}' {}", row_index + 1, column, raw, e),
                    )
                })?;
                flat.push(value);
            }
        }

        let values = Array2::from_shape_vec((identities.len(), feature_columns.len()), flat)
            .map_err(|e| EegError::invalid_data("feature table", e.to_string()))?;

        Ok(Self {
            feature_columns,
            identities,
            labels,
            values,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Values of one feature column across all rows
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.feature_columns.iter().position(|c| c == name)?;
        Some(self.values.column(index).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::features::frequency::BandPowers;
    use crate::processing::features::record::{CanonicalFeatureRecord, SpectralRatios};
    use tempfile::tempdir;

    fn record(source_id: &str, alpha: f64) -> FeatureRecord {
        let band_powers: BandPowers = [("delta", 1.0), ("theta", 2.0), ("alpha", alpha), ("beta", 0.5)]
            .iter()
            .map(|&(name, p)| (name.to_string(), p))
            .collect();
        let identity = Identity::parse(source_id);
        FeatureRecord::Canonical(CanonicalFeatureRecord {
            source_id: source_id.to_string(),
            label: crate::dataset::identity::LabelRules::default().label_for(&identity),
            identity,
            ratios: SpectralRatios::from_powers(1.0, 2.0, alpha, 0.5, 3.5 + alpha),
            band_powers,
        })
    }

    #[test]
    fn test_schema_from_first_record() {
        let table = FeatureTable::from_records(vec![record("S001_S001R01", 3.0)]).unwrap();
        assert_eq!(&table.columns()[..4], ["subject", "run", "label", "delta"]);
        assert_eq!(table.columns().len(), 3 + 4 + 5);
    }

    #[test]
    fn test_mismatched_schema_rejected() {
        let mut table = FeatureTable::new(vec!["delta".to_string()]);
        let err = table.push(record("S001_S001R03_raw", 3.0)).unwrap_err();
        assert!(matches!(err, EegError::SchemaMismatch { ref source_id, .. } if source_id == "S001_S001R03_raw"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("features.csv");
        let table = FeatureTable::from_records(vec![
            record("S001_S001R01", 3.0),
            record("S001_S001R03", 0.1 + 0.2),
        ])
        .unwrap();

        table.write_csv(&path).unwrap();
        let matrix = FeatureTable::read_csv(&path).unwrap();

        assert_eq!(matrix.n_rows(), 2);
        assert_eq!(matrix.labels, vec![Label::Rest, Label::Motor]);
        assert_eq!(matrix.identities[1].run, "S001R03");
        assert_eq!(matrix.column("alpha"), Some(vec![3.0, 0.1 + 0.2]));
        assert_eq!(matrix.feature_columns, table.feature_columns().unwrap());
    }

    #[test]
    fn test_empty_tables() {
        let dir = tempdir().unwrap();

        let declared = dir.path().join("declared.csv");
        FeatureTable::new(vec!["delta".to_string(), "theta".to_string()])
            .write_csv(&declared)
            .unwrap();
        assert_eq!(fs::read_to_string(&declared).unwrap(), "subject,run,label,delta,theta\n");
        let matrix = FeatureTable::read_csv(&declared).unwrap();
        assert_eq!(matrix.n_rows(), 0);
        assert_eq!(matrix.values.dim(), (0, 2));

        let bare = dir.path().join("bare.csv");
        FeatureTable::default().write_csv(&bare).unwrap();
        assert_eq!(fs::read_to_string(&bare).unwrap(), "");
    }

    #[test]
    fn test_read_rejects_foreign_header() {
        let err = FeatureMatrix::from_reader("a,b,c\n1,2,3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("leading columns"));
    }
}
