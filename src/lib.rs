//! Causal filters for real-time gesture recognition on wearable sensor
//! streams.
//!
//! Every filter consumes one sample at a time, keeps its own bounded state
//! and never looks ahead:
//! - [`change_energy`]: change-energy accumulator and peak/event detector
//! - [`filters`]: first-order and Butterworth high-pass filters
//! - [`orientation`]: Madgwick sensor fusion with a bounded rotation history
//! - [`rotation_gesture`]: rotation state machine driven by classifier output
//! - [`debounce`]: three policies turning per-frame predictions into
//!   confirmed gestures
//!
//! # Examples
//!
//! ## Change events
//!
//! ```
//! use gesture_stream::change_energy::RcsEventDetector;
//!
//! # fn main() -> gesture_stream::Result<()> {
//! let mut detector = RcsEventDetector::new(2.0, 20, 40, false)?;
//! for sample in [[0.0, 0.0, 9.8], [3.0, -2.0, 9.8], [0.0, 0.0, 9.8]] {
//!     if let Some(event) = detector.update(&sample)? {
//!         println!("Change event at {} ({:.2})", event.index, event.magnitude);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Orientation and rotation gestures
//!
//! ```
//! use gesture_stream::{orientation::OrientationEstimator, rotation_gesture::RotationGestureFilter};
//!
//! # fn main() -> gesture_stream::Result<()> {
//! let mut estimator = OrientationEstimator::new(112.2, 0.033, 600, false)?;
//! estimator.update_imu_values(&[[0.0, 0.0, 9.81, 0.0, 0.0, 0.0]; 10]);
//!
//! let mut rotation = RotationGestureFilter::default();
//! let probabilities = [0.1, 0.0, 0.0, 0.0, 0.0, 0.9, 0.0, 0.0, 0.0];
//! let q = estimator.update_sample(&[0.0, 0.0, 9.81, 0.0, 20.0, 0.0])?;
//! if let Some(delta) = rotation.update(&probabilities, &q)? {
//!     println!("Rotated {delta:.1} degrees");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Debouncing predictions
//!
//! ```
//! use gesture_stream::{
//!     config::PredictionConfig,
//!     debounce::{create_prediction_filter, DebouncePolicy},
//!     labels::GestureLabels,
//! };
//!
//! # fn main() -> gesture_stream::Result<()> {
//! let labels = GestureLabels::new(["none", "swipe", "tap"]);
//! let mut filter = create_prediction_filter(DebouncePolicy::Change, &PredictionConfig::default(), labels)?;
//!
//! let confirmed = filter.update(&[0.02, 0.95, 0.03], &[])?;
//! assert_eq!(confirmed.map(|c| c.label), Some(1));
//! # Ok(())
//! # }
//! ```

/// Quaternion helpers and relative rotation angles
pub mod quaternion;

/// Change-energy filter and event detector
pub mod change_energy;

/// High-pass signal filters
pub mod filters;

/// Gradient-descent IMU fusion step
pub mod madgwick;

/// Orientation estimation with bounded history
pub mod orientation;

/// Rotation gesture state machine
pub mod rotation_gesture;

/// Prediction debounce policies
pub mod debounce;

/// Class labels and confirmation messages
pub mod labels;

/// Utility functions shared by the filters
pub mod utils;

/// Error types and result handling
pub mod error;

/// Stream host application
pub mod app;

/// Constants used throughout the crate
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
