// src/processing/mod.rs
//! Signal processing for EEG feature extraction

pub mod features;
pub mod windowing;

pub use features::*;
pub use windowing::*;
