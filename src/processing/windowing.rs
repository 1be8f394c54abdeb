// src/processing/windowing.rs
//! Taper windows for spectral estimation
//!
//! Windows are generated in their periodic (DFT-even) form, which is what
//! Welch-style PSD estimation expects: the window of length `N` is the first
//! `N` points of a symmetric window of length `N + 1`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    Rectangular,
    #[serde(alias = "hanning")]
    Hann,
    Hamming,
    Blackman,
}

impl WindowType {
    /// Generate `size` window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        match size {
            0 => Vec::new(),
            1 => vec![1.0],
            _ => {
                let n = size as f64;
                (0..size)
                    .map(|i| {
                        let phase = 2.0 * PI * i as f64 / n;
                        match self {
                            WindowType::Rectangular => 1.0,
                            WindowType::Hann => 0.5 - 0.5 * phase.cos(),
                            WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
                            WindowType::Blackman => {
                                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
                            }
                        }
                    })
                    .collect()
            }
        }
    }

    /// Sum of squared coefficients, the density normalization term of a periodogram
    pub fn power(&self, size: usize) -> f64 {
        self.coefficients(size).iter().map(|w| w * w).sum()
    }
}
