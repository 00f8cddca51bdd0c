//! Shared helpers for sample validation and classifier output handling.

use crate::constants::NEGATIVE_CLASS;
use crate::{Error, Result};

/// Check that a sample carries the expected number of channels
///
/// # Errors
///
/// Returns `Error::ShapeError` naming `what` when the lengths differ
pub fn ensure_channels(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ShapeError(format!(
            "{what} expects {expected} channels, got {actual}"
        )))
    }
}

/// Reject NaN and infinite values before they reach recursive filter state
///
/// # Errors
///
/// Returns `Error::InvalidInput` naming `what` and the first offending channel
pub fn ensure_finite(what: &str, sample: &[f64]) -> Result<()> {
    match sample.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(channel) => Err(Error::InvalidInput(format!(
            "{what} has non-finite value {} in channel {channel}",
            sample[channel]
        ))),
    }
}

/// Index and value of the largest entry; the first maximum wins ties
#[must_use]
pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
    values.iter().copied().enumerate().fold(None, |best, (i, v)| match best {
        Some((_, b)) if v <= b => best,
        _ => Some((i, v)),
    })
}

/// Argmax with the negative class substituted below `threshold`
///
/// Returns `(label, certainty)`; a rejected prediction is `(0, 0.0)`.
///
/// # Errors
///
/// Returns `Error::ShapeError` for an empty probability vector
pub fn thresholded_argmax(probabilities: &[f64], threshold: f64) -> Result<(usize, f64)> {
    let (label, certainty) = argmax(probabilities)
        .ok_or_else(|| Error::ShapeError("Probability vector is empty".to_string()))?;

    if certainty < threshold {
        Ok((NEGATIVE_CLASS, 0.0))
    } else {
        Ok((label, certainty))
    }
}
