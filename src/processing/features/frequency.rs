//! Frequency domain features: Welch power spectral density and band power
//!
//! Band power is the arithmetic mean of PSD values over the bins `f` with
//! `fmin <= f < fmax`. Multi-channel input is reduced by averaging the
//! per-channel PSDs, never the time-domain signals.

use crate::error::{EegError, EegResult, ProcessingStage, SignalError};
use crate::processing::windowing::WindowType;
use ndarray::{s, ArrayView1, ArrayView2, Axis};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Named half-open frequency interval `[fmin_hz, fmax_hz)`
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBand {
    pub name: String,
    pub fmin_hz: f64,
    pub fmax_hz: f64,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, fmin_hz: f64, fmax_hz: f64) -> Self {
        Self {
            name: name.into(),
            fmin_hz,
            fmax_hz,
        }
    }

    pub fn contains(&self, frequency_hz: f64) -> bool {
        frequency_hz >= self.fmin_hz && frequency_hz < self.fmax_hz
    }
}

/// Ordered set of frequency bands; order defines output column order.
///
/// Serialized as a table of `name = [fmin_hz, fmax_hz]` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct BandRegistry {
    bands: Vec<FrequencyBand>,
}

impl BandRegistry {
    pub fn new(bands: Vec<FrequencyBand>) -> Self {
        Self { bands }
    }

    /// delta 1-4, theta 4-8, alpha 8-13, beta 13-30 Hz
    pub fn canonical() -> Self {
        use crate::config::constants::bands::CANONICAL;

        Self::new(
            CANONICAL
                .iter()
                .map(|&(name, fmin, fmax)| FrequencyBand::new(name, fmin, fmax))
                .collect(),
        )
    }

    /// Add a band at the end of the registry
    pub fn with_band(mut self, band: FrequencyBand) -> Self {
        self.bands.push(band);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FrequencyBand> {
        self.bands.iter().find(|band| band.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrequencyBand> {
        self.bands.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|band| band.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Check every band is a finite, non-empty interval with a unique name.
    /// Overlapping bands are accepted.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for band in &self.bands {
            if band.name.trim().is_empty() {
                errors.push("Band name must not be empty".to_string());
            }
            if !seen.insert(band.name.as_str()) {
                errors.push(format!("Duplicate band name '{}'", band.name));
            }
            if !band.fmin_hz.is_finite() || !band.fmax_hz.is_finite() {
                errors.push(format!("Band '{}' has non-finite edges", band.name));
            } else if band.fmin_hz < 0.0 || band.fmin_hz >= band.fmax_hz {
                errors.push(format!(
                    "Band '{}' must satisfy 0 <= fmin < fmax, got [{}, {})",
                    band.name, band.fmin_hz, band.fmax_hz
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for BandRegistry {
    fn default() -> Self {
        Self::canonical()
    }
}

impl Serialize for BandRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.bands.len()))?;
        for band in &self.bands {
            map.serialize_entry(&band.name, &(band.fmin_hz, band.fmax_hz))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BandRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = BandRegistry;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of band_name = [fmin_hz, fmax_hz]")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut bands = Vec::new();
                while let Some((name, (fmin, fmax))) = access.next_entry::<String, (f64, f64)>()? {
                    bands.push(FrequencyBand::new(name, fmin, fmax));
                }
                Ok(BandRegistry::new(bands))
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}

/// What band aggregation does when no frequency bin falls inside a band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyBandPolicy {
    /// Log a warning and report zero power
    #[default]
    Zero,
    /// Fail with `SignalError::EmptyBandSelection`
    Error,
}

/// Welch estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelchConfig {
    /// Samples per segment, also the FFT length
    pub segment_length: usize,
    /// Fraction of a segment shared with the next one, in [0, 1)
    pub overlap: f64,
    pub window: WindowType,
    /// Lowest frequency kept in the estimate (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmin_hz: Option<f64>,
    /// Highest frequency kept in the estimate (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmax_hz: Option<f64>,
}

impl WelchConfig {
    /// Settings used for canonical band power: 256-sample Hamming segments,
    /// no overlap, restricted to 1-30 Hz
    pub fn canonical() -> Self {
        use crate::config::constants::spectral::*;

        Self {
            segment_length: CANONICAL_SEGMENT_LENGTH,
            overlap: CANONICAL_OVERLAP,
            window: WindowType::Hamming,
            fmin_hz: Some(CANONICAL_FMIN_HZ),
            fmax_hz: Some(CANONICAL_FMAX_HZ),
        }
    }

    /// Settings used by the entropy feature set: 1024-sample Hann segments with
    /// 50% overlap over the full frequency axis
    pub fn entropy_variant() -> Self {
        use crate::config::constants::spectral::*;

        Self {
            segment_length: ENTROPY_SEGMENT_LENGTH,
            overlap: ENTROPY_OVERLAP,
            window: WindowType::Hann,
            fmin_hz: None,
            fmax_hz: None,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.segment_length < 2 {
            errors.push(format!(
                "Welch segment length must be at least 2, got {}",
                self.segment_length
            ));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            errors.push(format!("Welch overlap must be in [0, 1), got {}", self.overlap));
        }
        if let (Some(fmin), Some(fmax)) = (self.fmin_hz, self.fmax_hz) {
            if fmin > fmax {
                errors.push(format!("Welch range is inverted: fmin {} > fmax {}", fmin, fmax));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Input to the spectral estimator
#[derive(Debug, Clone, Copy)]
pub enum SignalView<'a> {
    /// A single 1-D signal
    Single(ArrayView1<'a, f64>),
    /// Channel-by-time array; PSDs are averaged over channels
    Channels(ArrayView2<'a, f64>),
}

impl<'a> From<ArrayView1<'a, f64>> for SignalView<'a> {
    fn from(view: ArrayView1<'a, f64>) -> Self {
        SignalView::Single(view)
    }
}

impl<'a> From<ArrayView2<'a, f64>> for SignalView<'a> {
    fn from(view: ArrayView2<'a, f64>) -> Self {
        SignalView::Channels(view)
    }
}

impl<'a> From<&'a [f64]> for SignalView<'a> {
    fn from(samples: &'a [f64]) -> Self {
        SignalView::Single(ArrayView1::from(samples))
    }
}

/// One-sided power spectral density estimate
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    frequencies: Vec<f64>,
    values: Vec<f64>,
    segments: usize,
}

impl Psd {
    /// Frequency axis in Hz, ascending and non-negative
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// PSD values (signal units squared per Hz), one per frequency
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of averaged segments per channel
    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean PSD over the bins inside `band`
    pub fn band_power(&self, band: &FrequencyBand) -> Result<f64, SignalError> {
        let (sum, count) = self
            .frequencies
            .iter()
            .zip(&self.values)
            .filter(|&(&f, _)| band.contains(f))
            .fold((0.0, 0usize), |(sum, count), (_, &p)| (sum + p, count + 1));

        if count == 0 {
            return Err(SignalError::EmptyBandSelection {
                band: band.name.clone(),
                fmin: band.fmin_hz,
                fmax: band.fmax_hz,
            });
        }

        Ok(sum / count as f64)
    }

    fn restrict(self, fmin: Option<f64>, fmax: Option<f64>) -> Self {
        if fmin.is_none() && fmax.is_none() {
            return self;
        }

        let lo = fmin.unwrap_or(f64::NEG_INFINITY);
        let hi = fmax.unwrap_or(f64::INFINITY);
        let (frequencies, values) = self
            .frequencies
            .into_iter()
            .zip(self.values)
            .filter(|&(f, _)| f >= lo && f <= hi)
            .unzip();

        Self {
            frequencies,
            values,
            segments: self.segments,
        }
    }
}

/// Band powers in registry order
#[derive(Debug, Clone, PartialEq)]
pub struct BandPowers {
    powers: Vec<(String, f64)>,
}

impl BandPowers {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.powers
            .iter()
            .find(|(band, _)| band == name)
            .map(|&(_, power)| power)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.powers.iter().map(|(name, power)| (name.as_str(), *power))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.powers.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.powers.iter().map(|&(_, power)| power)
    }

    /// Sum of all band powers
    pub fn total(&self) -> f64 {
        self.values().sum()
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }
}

impl FromIterator<(String, f64)> for BandPowers {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            powers: iter.into_iter().collect(),
        }
    }
}

/// Welch PSD estimator with band aggregation
#[derive(Debug, Clone)]
pub struct SpectralEstimator {
    config: WelchConfig,
    empty_band: EmptyBandPolicy,
}

impl SpectralEstimator {
    pub fn new(config: WelchConfig, empty_band: EmptyBandPolicy) -> EegResult<Self> {
        config
            .validate()
            .map_err(|errors| EegError::configuration("spectral", errors.join("; ")))?;

        Ok(Self { config, empty_band })
    }

    /// Estimate band powers for a single signal or a channel array
    pub fn estimate_band_powers<'a>(
        &self,
        input: impl Into<SignalView<'a>>,
        sampling_rate_hz: f64,
        bands: &BandRegistry,
    ) -> EegResult<BandPowers> {
        let psd = self.estimate(input, sampling_rate_hz)?;
        self.band_powers(&psd, bands)
    }

    /// Aggregate an existing PSD into band powers, applying the empty band policy
    pub fn band_powers(&self, psd: &Psd, bands: &BandRegistry) -> EegResult<BandPowers> {
        bands
            .iter()
            .map(|band| {
                let power = match psd.band_power(band) {
                    Ok(power) => power,
                    Err(err) if self.empty_band == EmptyBandPolicy::Zero => {
                        tracing::warn!("{}; using 0", err);
                        0.0
                    }
                    Err(err) => return Err(err.into()),
                };
                Ok((band.name.clone(), power))
            })
            .collect()
    }

    /// PSD of a single signal or the channel-averaged PSD of an array
    pub fn estimate<'a>(
        &self,
        input: impl Into<SignalView<'a>>,
        sampling_rate_hz: f64,
    ) -> EegResult<Psd> {
        match input.into() {
            SignalView::Single(signal) => self.psd(signal, sampling_rate_hz),
            SignalView::Channels(channels) => self.psd_multichannel(channels, sampling_rate_hz),
        }
    }

    pub fn psd(&self, signal: ArrayView1<f64>, sampling_rate_hz: f64) -> EegResult<Psd> {
        check_sampling_rate(sampling_rate_hz)?;
        let mut planner = FftPlanner::new();
        let (values, segments) = self.welch(signal, sampling_rate_hz, &mut planner)?;

        Ok(self.finish(values, segments, signal.len(), sampling_rate_hz))
    }

    /// Per-channel Welch PSDs averaged across channels
    pub fn psd_multichannel(&self, channels: ArrayView2<f64>, sampling_rate_hz: f64) -> EegResult<Psd> {
        check_sampling_rate(sampling_rate_hz)?;
        let n_channels = channels.nrows();
        if n_channels == 0 {
            return Err(EegError::invalid_data("signal", "no channels"));
        }

        let mut planner = FftPlanner::new();
        let mut mean: Vec<f64> = Vec::new();
        let mut segments = 0;

        for channel in channels.axis_iter(Axis(0)) {
            let (values, n_segments) = self.welch(channel, sampling_rate_hz, &mut planner)?;
            if mean.is_empty() {
                mean = vec![0.0; values.len()];
            }
            for (acc, value) in mean.iter_mut().zip(values) {
                *acc += value;
            }
            segments = n_segments;
        }

        mean.iter_mut().for_each(|value| *value /= n_channels as f64);

        Ok(self.finish(mean, segments, channels.ncols(), sampling_rate_hz))
    }

    fn finish(&self, values: Vec<f64>, segments: usize, signal_len: usize, sampling_rate_hz: f64) -> Psd {
        let nfft = self.segment_length_for(signal_len);
        let frequencies = (0..values.len())
            .map(|k| k as f64 * sampling_rate_hz / nfft as f64)
            .collect();

        Psd {
            frequencies,
            values,
            segments,
        }
        .restrict(self.config.fmin_hz, self.config.fmax_hz)
    }

    fn segment_length_for(&self, signal_len: usize) -> usize {
        self.config.segment_length.min(signal_len)
    }

    fn welch(
        &self,
        signal: ArrayView1<f64>,
        sampling_rate_hz: f64,
        planner: &mut FftPlanner<f64>,
    ) -> EegResult<(Vec<f64>, usize)> {
        let n = signal.len();
        if n < 2 {
            return Err(SignalError::InsufficientSamples {
                operation: "welch psd",
                required: 2,
                actual: n,
            }
            .into());
        }

        let segment_length = self.segment_length_for(n);
        if segment_length < self.config.segment_length {
            tracing::warn!(
                "signal of {} samples is shorter than the {}-sample Welch segment; using {}",
                n,
                self.config.segment_length,
                segment_length
            );
        }

        let overlap = ((segment_length as f64 * self.config.overlap) as usize).min(segment_length - 1);
        let step = segment_length - overlap;
        let n_segments = (n - segment_length) / step + 1;

        let window = self.config.window.coefficients(segment_length);
        let window_power = self.config.window.power(segment_length);
        if window_power <= 0.0 {
            return Err(EegError::Processing {
                stage: ProcessingStage::SpectralEstimation,
                reason: format!("{:?} window has zero power", self.config.window),
            });
        }

        let fft = planner.plan_fft_forward(segment_length);
        let n_bins = segment_length / 2 + 1;
        let mut accumulated = vec![0.0; n_bins];
        let mut buffer = vec![Complex::new(0.0, 0.0); segment_length];

        for segment_index in 0..n_segments {
            let start = segment_index * step;
            let segment = signal.slice(s![start..start + segment_length]);
            // Constant detrend
            let mean = segment.sum() / segment_length as f64;

            for ((slot, &x), &w) in buffer.iter_mut().zip(segment.iter()).zip(&window) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }

            fft.process(&mut buffer);

            for (acc, bin) in accumulated.iter_mut().zip(&buffer[..n_bins]) {
                *acc += bin.norm_sqr();
            }
        }

        let scale = 1.0 / (sampling_rate_hz * window_power * n_segments as f64);
        // One-sided: double everything but DC and, for even lengths, Nyquist
        let doubled_end = if segment_length % 2 == 0 { n_bins - 1 } else { n_bins };

        let psd = accumulated
            .into_iter()
            .enumerate()
            .map(|(k, power)| {
                let one_sided = if k > 0 && k < doubled_end { 2.0 } else { 1.0 };
                power * scale * one_sided
            })
            .collect();

        Ok((psd, n_segments))
    }
}

fn check_sampling_rate(sampling_rate_hz: f64) -> EegResult<()> {
    if sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0 {
        Ok(())
    } else {
        Err(EegError::invalid_data(
            "sampling rate",
            format!("must be positive and finite, got {}", sampling_rate_hz),
        ))
    }
}
