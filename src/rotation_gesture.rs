//! Rotation gesture state machine
//!
//! Driven by classifier probabilities and the current orientation. While a
//! rotation is in progress every call emits the signed angle turned since
//! the previous call, in degrees.

use log::debug;
use nalgebra::Quaternion;

use crate::config::RotationConfig;
use crate::constants::{EPSILON, PROBABILITY_SMOOTHING};
use crate::quaternion::{signed_angle, wrap_degrees};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum RotationState {
    Idle,
    Rotating {
        reference: Quaternion<f64>,
        /// Calls spent in this rotation, starting at 1 on entry
        elapsed: u32,
    },
}

/// Idle/rotating state machine over smoothed classifier output
#[derive(Debug, Clone)]
pub struct RotationGestureFilter {
    track_index: usize,
    start_index: usize,
    end_index: usize,
    probability_threshold: f64,
    max_rotation_samples: f64,
    smoothed: Option<Vec<f64>>,
    state: RotationState,
}

impl RotationGestureFilter {
    /// Create a new rotation filter
    ///
    /// `max_rotation_time` and `inference_interval` are in seconds; their
    /// ratio is the number of calls a rotation may last.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the threshold is outside [0, 1] or a
    /// duration is not positive
    pub fn new(
        track_index: usize,
        start_index: usize,
        end_index: usize,
        probability_threshold: f64,
        inference_interval: f64,
        max_rotation_time: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability_threshold) {
            return Err(Error::ConfigError(format!(
                "Rotation probability threshold must be between 0.0 and 1.0, got {probability_threshold}"
            )));
        }
        if !(inference_interval.is_finite() && inference_interval > 0.0) {
            return Err(Error::ConfigError("Inference interval must be greater than 0".to_string()));
        }
        if !(max_rotation_time.is_finite() && max_rotation_time > 0.0) {
            return Err(Error::ConfigError("Max rotation time must be greater than 0".to_string()));
        }

        Ok(Self {
            track_index,
            start_index,
            end_index,
            probability_threshold,
            max_rotation_samples: max_rotation_time / inference_interval,
            smoothed: None,
            state: RotationState::Idle,
        })
    }

    pub fn from_config(config: &RotationConfig) -> Result<Self> {
        Self::new(
            config.track_index,
            config.start_index,
            config.end_index,
            config.probability_threshold,
            config.inference_interval,
            config.max_rotation_time,
        )
    }

    /// Process one classifier output
    ///
    /// Returns the rotation since the previous call while rotating, `None`
    /// when idle or on the call that ends a rotation.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` for a probability vector that does not
    /// cover the configured indices or changes length, and
    /// `Error::InvalidInput` for a zero orientation. State is unchanged in
    /// both cases.
    pub fn update(&mut self, probabilities: &[f64], orientation: &Quaternion<f64>) -> Result<Option<f64>> {
        self.check_probabilities(probabilities)?;
        if orientation.norm() <= EPSILON {
            return Err(Error::InvalidInput("Orientation quaternion has zero norm".to_string()));
        }

        let delta = match self.state {
            RotationState::Rotating { reference, .. } => wrap_degrees(signed_angle(&reference, orientation)?),
            RotationState::Idle => 0.0,
        };

        self.smooth(probabilities);
        let start = self.smoothed_value(self.start_index);
        let end = self.smoothed_value(self.end_index);

        match self.state {
            RotationState::Idle => {
                if start > self.probability_threshold {
                    debug!("Rotation started (p = {start:.3})");
                    self.state = RotationState::Rotating {
                        reference: *orientation,
                        elapsed: 1,
                    };
                }
                Ok(None)
            }
            RotationState::Rotating { elapsed, .. } => {
                let timed_out = f64::from(elapsed) > self.max_rotation_samples;
                if end > self.probability_threshold || timed_out {
                    debug!("Rotation ended after {elapsed} calls (timed out: {timed_out})");
                    self.state = RotationState::Idle;
                    Ok(None)
                } else {
                    self.state = RotationState::Rotating {
                        reference: *orientation,
                        elapsed: elapsed.saturating_add(1),
                    };
                    Ok(Some(-delta))
                }
            }
        }
    }

    fn check_probabilities(&self, probabilities: &[f64]) -> Result<()> {
        let highest = self.track_index.max(self.start_index).max(self.end_index);
        if probabilities.len() <= highest {
            return Err(Error::ShapeError(format!(
                "Probability vector has {} entries, index {highest} required",
                probabilities.len()
            )));
        }
        if let Some(smoothed) = &self.smoothed {
            if smoothed.len() != probabilities.len() {
                return Err(Error::ShapeError(format!(
                    "Probability vector length changed from {} to {}",
                    smoothed.len(),
                    probabilities.len()
                )));
            }
        }
        Ok(())
    }

    fn smooth(&mut self, probabilities: &[f64]) {
        match &mut self.smoothed {
            Some(average) => {
                for (avg, p) in average.iter_mut().zip(probabilities) {
                    *avg = PROBABILITY_SMOOTHING * *avg + (1.0 - PROBABILITY_SMOOTHING) * p;
                }
            }
            None => self.smoothed = Some(probabilities.to_vec()),
        }
    }

    fn smoothed_value(&self, index: usize) -> f64 {
        self.smoothed
            .as_ref()
            .and_then(|average| average.get(index).copied())
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn is_rotating(&self) -> bool {
        matches!(self.state, RotationState::Rotating { .. })
    }

    /// Smoothed probability vector, `None` before the first call
    #[must_use]
    pub fn smoothed_probabilities(&self) -> Option<&[f64]> {
        self.smoothed.as_deref()
    }

    /// Smoothed "rotation in progress" probability
    #[must_use]
    pub fn rotation_probability(&self) -> Option<f64> {
        self.smoothed
            .as_ref()
            .and_then(|average| average.get(self.track_index).copied())
    }

    /// Number of calls a rotation may last before it is ended
    #[must_use]
    pub fn max_rotation_samples(&self) -> f64 {
        self.max_rotation_samples
    }

    pub fn reset(&mut self) {
        self.smoothed = None;
        self.state = RotationState::Idle;
    }
}

impl Default for RotationGestureFilter {
    fn default() -> Self {
        let config = RotationConfig::default();
        Self {
            track_index: config.track_index,
            start_index: config.start_index,
            end_index: config.end_index,
            probability_threshold: config.probability_threshold,
            max_rotation_samples: config.max_rotation_time / config.inference_interval,
            smoothed: None,
            state: RotationState::Idle,
        }
    }
}
