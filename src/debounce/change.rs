//! Confirmation on prediction change

use crate::change_energy::ChangeEvent;
use crate::constants::{DEFAULT_CHANGE_CONFIRM_THRESHOLD, NEGATIVE_CLASS};
use crate::labels::GestureLabels;
use crate::utils::thresholded_argmax;
use crate::Result;

use super::{announce, check_threshold, GestureConfirmation, PredictionFilter};

/// Confirms a confident prediction whenever it differs from the previous
/// call's prediction. Change events are ignored.
pub struct ChangeConfirmFilter {
    threshold: f64,
    labels: GestureLabels,
    previous: usize,
}

impl ChangeConfirmFilter {
    pub fn new(threshold: f64, labels: GestureLabels) -> Result<Self> {
        check_threshold(threshold)?;
        Ok(Self {
            threshold,
            labels,
            previous: NEGATIVE_CLASS,
        })
    }

    #[must_use]
    pub fn previous_prediction(&self) -> usize {
        self.previous
    }
}

impl Default for ChangeConfirmFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CHANGE_CONFIRM_THRESHOLD,
            labels: GestureLabels::default(),
            previous: NEGATIVE_CLASS,
        }
    }
}

impl PredictionFilter for ChangeConfirmFilter {
    fn update(&mut self, probabilities: &[f64], _events: &[ChangeEvent]) -> Result<Option<GestureConfirmation>> {
        let (predicted, certainty) = thresholded_argmax(probabilities, self.threshold)?;

        let changed = predicted != self.previous;
        self.previous = predicted;

        if changed && predicted != NEGATIVE_CLASS {
            Ok(Some(announce(&self.labels, predicted, certainty)))
        } else {
            Ok(None)
        }
    }

    fn reset(&mut self) {
        self.previous = NEGATIVE_CLASS;
    }

    fn name(&self) -> &str {
        "ChangeConfirm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirms_once_per_run() {
        let mut filter = ChangeConfirmFilter::default();
        let p = [0.02, 0.95, 0.03];

        assert_eq!(filter.update(&p, &[]).unwrap().map(|c| c.label), Some(1));
        assert_eq!(filter.update(&p, &[]).unwrap(), None);
        assert_eq!(filter.update(&p, &[]).unwrap(), None);
    }

    #[test]
    fn test_switching_gestures() {
        let mut filter = ChangeConfirmFilter::default();
        assert!(filter.update(&[0.0, 0.95, 0.05], &[]).unwrap().is_some());
        let second = filter.update(&[0.0, 0.04, 0.96], &[]).unwrap().unwrap();
        assert_eq!(second.label, 2);
        assert!((second.certainty - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_low_certainty_rearms() {
        let mut filter = ChangeConfirmFilter::default();
        assert!(filter.update(&[0.0, 0.95, 0.05], &[]).unwrap().is_some());

        // Below threshold counts as the negative class
        assert_eq!(filter.update(&[0.2, 0.6, 0.2], &[]).unwrap(), None);
        assert_eq!(filter.previous_prediction(), 0);

        assert!(filter.update(&[0.0, 0.95, 0.05], &[]).unwrap().is_some());
    }

    #[test]
    fn test_negative_class_never_confirmed() {
        let mut filter = ChangeConfirmFilter::default();
        filter.update(&[0.0, 0.95, 0.05], &[]).unwrap();
        assert_eq!(filter.update(&[0.99, 0.005, 0.005], &[]).unwrap(), None);
    }
}
