//! Debounce policies turning per-frame classifier output into discrete
//! gesture confirmations

pub mod change;
pub mod event;
pub mod hold;

use std::fmt;
use std::str::FromStr;

use log::info;

use crate::change_energy::ChangeEvent;
use crate::config::PredictionConfig;
use crate::labels::{ConfirmationMessage, GestureLabels};
use crate::{Error, Result};

pub use change::ChangeConfirmFilter;
pub use event::EventConfirmFilter;
pub use hold::HoldConfirmFilter;

/// A confirmed, non-negative gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfirmation {
    pub label: usize,
    pub certainty: f64,
}

/// Common interface of the debounce policies
pub trait PredictionFilter: Send {
    /// Process one probability vector together with the boundary events
    /// detected for the same call
    ///
    /// Returns `Ok(None)` when nothing is confirmed.
    fn update(&mut self, probabilities: &[f64], events: &[ChangeEvent]) -> Result<Option<GestureConfirmation>>;

    fn reset(&mut self);

    fn name(&self) -> &str;
}

/// Selectable debounce policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncePolicy {
    /// Confirm on a change event, or shortly after one
    Event,
    /// Confirm whenever the prediction changes
    Change,
    /// Confirm a run of identical predictions with its peak certainty
    Hold,
}

impl FromStr for DebouncePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "event" => Ok(Self::Event),
            "change" => Ok(Self::Change),
            "hold" => Ok(Self::Hold),
            other => Err(Error::ConfigError(format!(
                "Unknown debounce policy: {other}. Valid: event, change, hold"
            ))),
        }
    }
}

impl fmt::Display for DebouncePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Change => "change",
            Self::Hold => "hold",
        };
        f.write_str(name)
    }
}

/// Create a prediction filter for the given policy
///
/// # Errors
///
/// Returns `Error::ConfigError` if a threshold in `config` is invalid
pub fn create_prediction_filter(
    policy: DebouncePolicy,
    config: &PredictionConfig,
    labels: GestureLabels,
) -> Result<Box<dyn PredictionFilter>> {
    Ok(match policy {
        DebouncePolicy::Event => Box::new(EventConfirmFilter::new(config.event_threshold, labels)?),
        DebouncePolicy::Change => Box::new(ChangeConfirmFilter::new(config.change_threshold, labels)?),
        DebouncePolicy::Hold => Box::new(HoldConfirmFilter::new(
            config.hold_threshold,
            config.min_gesture_length,
            labels,
        )?),
    })
}

fn check_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!(
            "Confirmation threshold must be between 0.0 and 1.0, got {threshold}"
        )))
    }
}

/// Log the confirmation and hand it back
fn announce(labels: &GestureLabels, label: usize, certainty: f64) -> GestureConfirmation {
    info!("{}", ConfirmationMessage::new(labels, label, certainty));
    GestureConfirmation { label, certainty }
}
