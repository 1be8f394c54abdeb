//! Recordings, identities and feature tables
//!
//! Loading cleaned recordings, deriving subject/run/label, assembling the
//! feature table and persisting it.

pub mod assembler;
pub mod identity;
pub mod recording;
pub mod table;

pub use assembler::{AssemblyReport, DatasetAssembler, SkippedRecording};
pub use identity::{Identity, Label, LabelMatching, LabelRules};
pub use recording::{list_recordings, Recording, RecordingFile};
pub use table::{FeatureMatrix, FeatureTable};
