//! Immediate confirmation on a change event

use crate::change_energy::ChangeEvent;
use crate::constants::{DEFAULT_EVENT_CONFIRM_THRESHOLD, EVENT_CONFIRM_DELAY, NEGATIVE_CLASS};
use crate::labels::GestureLabels;
use crate::utils::thresholded_argmax;
use crate::Result;

use super::{announce, check_threshold, GestureConfirmation, PredictionFilter};

/// Confirms a gesture when a change event coincides with a confident
/// prediction
///
/// An event that arrives before the classifier is confident opens a short
/// delay: the first confident prediction within the next
/// [`EVENT_CONFIRM_DELAY`] calls is confirmed instead.
pub struct EventConfirmFilter {
    threshold: f64,
    labels: GestureLabels,
    /// 0 when no event is pending
    delay: u32,
}

impl EventConfirmFilter {
    pub fn new(threshold: f64, labels: GestureLabels) -> Result<Self> {
        check_threshold(threshold)?;
        Ok(Self {
            threshold,
            labels,
            delay: 0,
        })
    }

    /// Whether an unconfirmed event is still pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.delay > 0
    }
}

impl Default for EventConfirmFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EVENT_CONFIRM_THRESHOLD,
            labels: GestureLabels::default(),
            delay: 0,
        }
    }
}

impl PredictionFilter for EventConfirmFilter {
    fn update(&mut self, probabilities: &[f64], events: &[ChangeEvent]) -> Result<Option<GestureConfirmation>> {
        let (predicted, certainty) = thresholded_argmax(probabilities, self.threshold)?;

        if !events.is_empty() {
            if predicted == NEGATIVE_CLASS {
                self.delay = 1;
                return Ok(None);
            }
            self.delay = 0;
            return Ok(Some(announce(&self.labels, predicted, certainty)));
        }

        match self.delay {
            0 => Ok(None),
            d if d <= EVENT_CONFIRM_DELAY => {
                if predicted == NEGATIVE_CLASS {
                    self.delay += 1;
                    Ok(None)
                } else {
                    self.delay = 0;
                    Ok(Some(announce(&self.labels, predicted, certainty)))
                }
            }
            _ => {
                self.delay = 0;
                Ok(None)
            }
        }
    }

    fn reset(&mut self) {
        self.delay = 0;
    }

    fn name(&self) -> &str {
        "EventConfirm"
    }
}
