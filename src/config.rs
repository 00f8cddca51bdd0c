//! Configuration management for the gesture stream filters

use crate::constants::{
    DEFAULT_CHANGE_CONFIRM_THRESHOLD, DEFAULT_END_ROTATION_INDEX, DEFAULT_EVENT_CONFIRM_THRESHOLD,
    DEFAULT_EVENT_THRESHOLD, DEFAULT_FUSION_GAIN, DEFAULT_HISTORY_SIZE, DEFAULT_HOLD_CONFIRM_THRESHOLD,
    DEFAULT_INFERENCE_INTERVAL, DEFAULT_MAX_LOGGED_EVENTS, DEFAULT_MAX_ROTATION_TIME, DEFAULT_MIN_GESTURE_LENGTH,
    DEFAULT_PEAK_WINDOW, DEFAULT_RCS_DECAY, DEFAULT_REFRACTORY_WINDOW, DEFAULT_ROTATION_THRESHOLD,
    DEFAULT_SAMPLING_FREQUENCY, DEFAULT_START_ROTATION_INDEX, DEFAULT_TRACK_ROTATION_INDEX, IMU_CHANNELS,
};
use crate::debounce::DebouncePolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Change-energy filter and event detector
    pub change_energy: ChangeEnergyConfig,

    /// Orientation estimator
    pub orientation: OrientationConfig,

    /// Rotation gesture state machine
    pub rotation: RotationConfig,

    /// Prediction debounce policy
    pub prediction: PredictionConfig,

    /// Display names indexed by class id; index 0 is the negative class
    pub labels: Vec<String>,
}

/// Change-energy parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeEnergyConfig {
    /// Divisor applied to the previous energy on every sample
    pub decay: f64,

    /// Energy above which the detector starts tracking a peak
    pub threshold: f64,

    /// Samples to follow a rising peak before confirming it
    pub peak_window: usize,

    /// Samples after the threshold crossing before the detector re-arms
    pub refractory_window: usize,

    /// Keep every computed energy for diagnostics
    pub record_history: bool,

    /// Bound on the confirmed-event log
    pub max_logged_events: usize,
}

/// Orientation estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// IMU sampling frequency in Hz
    pub sampling_frequency: f64,

    /// Madgwick gain
    pub gain: f64,

    /// Number of orientations kept in the history
    pub history_size: usize,

    /// Gyroscope pre-filter, e.g. "none" or "butterworth:0.5:2"
    pub gyro_filter: String,

    /// Frames buffered for the initial batch estimate
    pub bootstrap_samples: usize,
}

/// Rotation gesture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Probability index of "rotation in progress"
    pub track_index: usize,

    /// Probability index of "rotation start"
    pub start_index: usize,

    /// Probability index of "rotation end"
    pub end_index: usize,

    /// Smoothed probability that triggers a transition
    pub probability_threshold: f64,

    /// Seconds between classifier outputs
    pub inference_interval: f64,

    /// Longest rotation in seconds before it is ended automatically
    pub max_rotation_time: f64,
}

/// Prediction debounce parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Debounce policy: "event", "change" or "hold"
    pub policy: String,

    /// Certainty threshold of the event-confirm policy
    pub event_threshold: f64,

    /// Certainty threshold of the change-confirm policy
    pub change_threshold: f64,

    /// Certainty threshold of the hold policy
    pub hold_threshold: f64,

    /// Minimum run length the hold policy confirms without an event
    pub min_gesture_length: usize,
}

impl Default for ChangeEnergyConfig {
    fn default() -> Self {
        Self {
            decay: DEFAULT_RCS_DECAY,
            threshold: DEFAULT_EVENT_THRESHOLD,
            peak_window: DEFAULT_PEAK_WINDOW,
            refractory_window: DEFAULT_REFRACTORY_WINDOW,
            record_history: false,
            max_logged_events: DEFAULT_MAX_LOGGED_EVENTS,
        }
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            sampling_frequency: DEFAULT_SAMPLING_FREQUENCY,
            gain: DEFAULT_FUSION_GAIN,
            history_size: DEFAULT_HISTORY_SIZE,
            gyro_filter: "none".to_string(),
            bootstrap_samples: 112,
        }
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            track_index: DEFAULT_TRACK_ROTATION_INDEX,
            start_index: DEFAULT_START_ROTATION_INDEX,
            end_index: DEFAULT_END_ROTATION_INDEX,
            probability_threshold: DEFAULT_ROTATION_THRESHOLD,
            inference_interval: DEFAULT_INFERENCE_INTERVAL,
            max_rotation_time: DEFAULT_MAX_ROTATION_TIME,
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            policy: "change".to_string(),
            event_threshold: DEFAULT_EVENT_CONFIRM_THRESHOLD,
            change_threshold: DEFAULT_CHANGE_CONFIRM_THRESHOLD,
            hold_threshold: DEFAULT_HOLD_CONFIRM_THRESHOLD,
            min_gesture_length: DEFAULT_MIN_GESTURE_LENGTH,
        }
    }
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0")))
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be greater than 0")))
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Change energy
        check_positive("Change-energy decay", self.change_energy.decay)?;
        if !(self.change_energy.threshold.is_finite() && self.change_energy.threshold >= 0.0) {
            return Err(Error::ConfigError(
                "Change-energy threshold must be non-negative".to_string(),
            ));
        }
        if self.change_energy.peak_window == 0 {
            return Err(Error::ConfigError("Peak window must be greater than 0".to_string()));
        }

        // Orientation
        check_positive("Sampling frequency", self.orientation.sampling_frequency)?;
        if !(self.orientation.gain.is_finite() && self.orientation.gain >= 0.0) {
            return Err(Error::ConfigError("Fusion gain must be non-negative".to_string()));
        }
        if self.orientation.history_size == 0 {
            return Err(Error::ConfigError("History size must be greater than 0".to_string()));
        }
        if self.orientation.bootstrap_samples == 0 {
            return Err(Error::ConfigError("Bootstrap samples must be greater than 0".to_string()));
        }
        crate::filters::create_filter(
            &self.orientation.gyro_filter,
            self.orientation.sampling_frequency,
            IMU_CHANNELS / 2,
        )?;

        // Rotation
        check_probability("Rotation probability threshold", self.rotation.probability_threshold)?;
        check_positive("Inference interval", self.rotation.inference_interval)?;
        check_positive("Max rotation time", self.rotation.max_rotation_time)?;

        // Prediction
        self.prediction.policy.parse::<DebouncePolicy>()?;
        check_probability("Event threshold", self.prediction.event_threshold)?;
        check_probability("Change threshold", self.prediction.change_threshold)?;
        check_probability("Hold threshold", self.prediction.hold_threshold)?;
        if self.prediction.min_gesture_length == 0 {
            return Err(Error::ConfigError(
                "Minimum gesture length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gesture Stream Configuration

# Change-energy event detection
change_energy:
  decay: 1.6
  threshold: 2.0
  peak_window: 20
  refractory_window: 40
  record_history: false
  max_logged_events: 1024

# Orientation estimation (Madgwick fusion)
orientation:
  sampling_frequency: 112.2
  gain: 0.033
  history_size: 600
  gyro_filter: "none"
  bootstrap_samples: 112

# Rotation gesture detection
rotation:
  track_index: 8
  start_index: 5
  end_index: 6
  probability_threshold: 0.95
  inference_interval: 0.01
  max_rotation_time: 2.0

# Prediction debouncing
prediction:
  policy: "change"
  event_threshold: 0.8
  change_threshold: 0.9
  hold_threshold: 0.0
  min_gesture_length: 1

# Class display names, index 0 is "no gesture"
labels: []
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        let defaults = Config::default();

        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.change_energy.peak_window, defaults.change_energy.peak_window);
        assert_eq!(parsed.orientation.sampling_frequency, defaults.orientation.sampling_frequency);
        assert_eq!(parsed.rotation.start_index, defaults.rotation.start_index);
        assert_eq!(parsed.prediction.policy, defaults.prediction.policy);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("rotation:\n  max_rotation_time: 1.5\n").unwrap();
        assert_eq!(parsed.rotation.max_rotation_time, 1.5);
        assert_eq!(parsed.rotation.probability_threshold, DEFAULT_ROTATION_THRESHOLD);
        assert_eq!(parsed.change_energy.decay, DEFAULT_RCS_DECAY);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.change_energy.peak_window = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.orientation.gyro_filter = "butterworth:80".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rotation.probability_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.prediction.policy = "majority".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rotation.inference_interval = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("gesture_stream_config_{}.yaml", std::process::id()));

        let mut config = Config::default();
        config.labels = vec!["none".to_string(), "tap".to_string()];
        config.orientation.gyro_filter = "butterworth:0.5:2".to_string();
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.labels, config.labels);
        assert_eq!(loaded.orientation.gyro_filter, config.orientation.gyro_filter);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/gesture_stream.yaml"),
            Err(Error::Io(_))
        ));
    }
}
