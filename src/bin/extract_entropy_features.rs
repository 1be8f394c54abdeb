//! Band power, sample entropy and Hjorth features for every cleaned recording

use eeg_features::cli;
use eeg_features::processing::features::FeatureSet;
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run(FeatureSet::Entropy)
}
