//! Causal per-channel signal filters.
//!
//! Every filter here processes one multi-channel sample at a time and keeps
//! its own delay-line state, so feeding a batch or the same samples one by
//! one gives identical output.

/// First-order (single-pole RC) high-pass filter
pub mod high_pass;

/// Butterworth high-pass filter of arbitrary order
pub mod butterworth;

use log::warn;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::utils::ensure_channels;
use crate::{Error, Result};

/// Trait for all multi-channel sample filters
pub trait SignalFilter: Send + Sync {
    /// Filter a single sample (one value per channel)
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` if the sample has the wrong channel count;
    /// the sample is skipped and the filter state is left untouched
    fn apply(&mut self, sample: &[f64]) -> Result<Vec<f64>>;

    /// Filter a batch of samples, one row per sample
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` if the batch has the wrong number of columns
    fn apply_batch(&mut self, batch: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        ensure_channels(self.name(), self.num_channels(), batch.ncols())?;

        let mut output = Array2::zeros(batch.raw_dim());
        for (row, mut out_row) in batch.rows().into_iter().zip(output.rows_mut()) {
            let filtered = self.apply(&row.to_vec())?;
            out_row.assign(&ArrayView1::from(&filtered[..]));
        }
        Ok(output)
    }

    /// Reset filter state
    fn reset(&mut self);

    /// Number of channels this instance was built for
    fn num_channels(&self) -> usize;

    /// Get filter name
    fn name(&self) -> &str;
}

/// Pass-through filter that returns samples unchanged
pub struct NoFilter {
    num_channels: usize,
}

impl NoFilter {
    #[must_use]
    pub fn new(num_channels: usize) -> Self {
        Self { num_channels }
    }
}

impl SignalFilter for NoFilter {
    fn apply(&mut self, sample: &[f64]) -> Result<Vec<f64>> {
        check_sample(self, sample)?;
        Ok(sample.to_vec())
    }

    fn reset(&mut self) {}

    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Log and report a sample whose width does not match the filter
pub(crate) fn check_sample<F: SignalFilter + ?Sized>(filter: &F, sample: &[f64]) -> Result<()> {
    ensure_channels(filter.name(), filter.num_channels(), sample.len()).map_err(|e| {
        warn!("Skipping sample: {e}");
        e
    })
}

/// Parse one numeric argument of a filter description
fn parse_param<T: std::str::FromStr>(filter_type: &str, value: &str, what: &str) -> Result<T> {
    value.parse().map_err(|_| {
        Error::ConfigError(format!("Invalid {what} '{value}' in filter description '{filter_type}'"))
    })
}

/// Create a signal filter from a description string
///
/// Accepted forms:
/// - `none`: pass-through
/// - `highpass:<cutoff_hz>`: first-order high-pass
/// - `butterworth:<cutoff_hz>[:<order>]`: Butterworth high-pass, order 2 by default
///
/// # Errors
///
/// Returns `Error::ConfigError` for unknown filter types or invalid parameters
pub fn create_filter(filter_type: &str, sampling_rate: f64, num_channels: usize) -> Result<Box<dyn SignalFilter>> {
    let lowered = filter_type.to_lowercase();
    let parts: Vec<&str> = lowered.split(':').map(str::trim).collect();

    match parts.as_slice() {
        ["none" | "nofilter"] => Ok(Box::new(NoFilter::new(num_channels))),
        ["highpass" | "high_pass" | "firstorder", cutoff] => {
            let cutoff = parse_param(filter_type, cutoff, "cutoff")?;
            Ok(Box::new(high_pass::FirstOrderHighPassFilter::new(
                cutoff,
                sampling_rate,
                num_channels,
            )?))
        }
        ["butterworth" | "butter", cutoff] => Ok(Box::new(butterworth::ButterworthHighPassFilter::new(
            parse_param(filter_type, cutoff, "cutoff")?,
            sampling_rate,
            crate::constants::DEFAULT_BUTTERWORTH_ORDER,
            num_channels,
        )?)),
        ["butterworth" | "butter", cutoff, order] => Ok(Box::new(butterworth::ButterworthHighPassFilter::new(
            parse_param(filter_type, cutoff, "cutoff")?,
            sampling_rate,
            parse_param(filter_type, order, "order")?,
            num_channels,
        )?)),
        _ => Err(Error::ConfigError(format!("Unknown filter type: {filter_type}"))),
    }
}

/// Validate the common design parameters of a high-pass filter
pub(crate) fn validate_design(cutoff_frequency: f64, sampling_rate: f64, num_channels: usize) -> Result<()> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(Error::ConfigError(format!(
            "Sampling rate must be positive, got {sampling_rate}"
        )));
    }
    if !(cutoff_frequency.is_finite() && cutoff_frequency > 0.0) {
        return Err(Error::ConfigError(format!(
            "Cutoff frequency must be positive, got {cutoff_frequency}"
        )));
    }
    if cutoff_frequency >= sampling_rate / 2.0 {
        return Err(Error::ConfigError(format!(
            "Cutoff frequency {cutoff_frequency} Hz must be below the Nyquist frequency {} Hz",
            sampling_rate / 2.0
        )));
    }
    if num_channels == 0 {
        return Err(Error::ConfigError("Channel count must be greater than 0".to_string()));
    }
    Ok(())
}
