//! Run-length hold with peak certainty

use crate::change_energy::ChangeEvent;
use crate::constants::{DEFAULT_HOLD_CONFIRM_THRESHOLD, DEFAULT_MIN_GESTURE_LENGTH, NEGATIVE_CLASS};
use crate::labels::GestureLabels;
use crate::utils::thresholded_argmax;
use crate::{Error, Result};

use super::{announce, check_threshold, GestureConfirmation, PredictionFilter};

/// A run of identical non-negative predictions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Run {
    label: usize,
    length: usize,
    max_certainty: f64,
}

/// Tracks runs of identical predictions and confirms each with the highest
/// certainty seen during the run
///
/// A run is confirmed when a change event arrives while it is active, or
/// when it ends after reaching `min_length` calls.
pub struct HoldConfirmFilter {
    threshold: f64,
    min_length: usize,
    labels: GestureLabels,
    run: Run,
}

impl HoldConfirmFilter {
    pub fn new(threshold: f64, min_length: usize, labels: GestureLabels) -> Result<Self> {
        check_threshold(threshold)?;
        if min_length == 0 {
            return Err(Error::ConfigError(
                "Minimum gesture length must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            threshold,
            min_length,
            labels,
            run: Run::default(),
        })
    }

    /// Label and length of the active run, if any
    #[must_use]
    pub fn current_run(&self) -> Option<(usize, usize)> {
        (self.run.label != NEGATIVE_CLASS).then_some((self.run.label, self.run.length))
    }
}

impl Default for HoldConfirmFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HOLD_CONFIRM_THRESHOLD,
            min_length: DEFAULT_MIN_GESTURE_LENGTH,
            labels: GestureLabels::default(),
            run: Run::default(),
        }
    }
}

impl PredictionFilter for HoldConfirmFilter {
    fn update(&mut self, probabilities: &[f64], events: &[ChangeEvent]) -> Result<Option<GestureConfirmation>> {
        let (predicted, certainty) = thresholded_argmax(probabilities, self.threshold)?;

        if predicted != NEGATIVE_CLASS && predicted == self.run.label {
            self.run.max_certainty = self.run.max_certainty.max(certainty);

            if events.is_empty() {
                self.run.length += 1;
                return Ok(None);
            }

            let finished = std::mem::take(&mut self.run);
            return Ok(Some(announce(&self.labels, finished.label, finished.max_certainty)));
        }

        let finished = std::mem::replace(
            &mut self.run,
            if predicted == NEGATIVE_CLASS {
                Run::default()
            } else {
                Run {
                    label: predicted,
                    length: 1,
                    max_certainty: certainty,
                }
            },
        );

        if finished.label != NEGATIVE_CLASS && finished.length >= self.min_length {
            Ok(Some(announce(&self.labels, finished.label, finished.max_certainty)))
        } else {
            Ok(None)
        }
    }

    fn reset(&mut self) {
        self.run = Run::default();
    }

    fn name(&self) -> &str {
        "HoldConfirm"
    }
}
