//! Constants used throughout the library

/// Index of the negative ("no gesture") class in every probability vector
pub const NEGATIVE_CLASS: usize = 0;

/// Number of channels in a raw IMU row: accel xyz followed by gyro xyz
pub const IMU_CHANNELS: usize = 6;

/// Default decay constant of the change-energy accumulator
pub const DEFAULT_RCS_DECAY: f64 = 1.6;

/// Change-energy event detector defaults
pub const DEFAULT_EVENT_THRESHOLD: f64 = 2.0;
pub const DEFAULT_PEAK_WINDOW: usize = 20;
pub const DEFAULT_REFRACTORY_WINDOW: usize = 40;
pub const DEFAULT_MAX_LOGGED_EVENTS: usize = 1024;

/// IMU sampling frequency of the wrist device in Hz
pub const DEFAULT_SAMPLING_FREQUENCY: f64 = 112.2;

/// Madgwick fusion gain for accelerometer + gyroscope updates
pub const DEFAULT_FUSION_GAIN: f64 = 0.033;

/// Orientation history capacity in samples
pub const DEFAULT_HISTORY_SIZE: usize = 600;

/// Gyroscope pre-filter design
pub const DEFAULT_GYRO_CUTOFF: f64 = 0.5;
pub const DEFAULT_BUTTERWORTH_ORDER: usize = 2;
pub const MAX_BUTTERWORTH_ORDER: usize = 8;

/// Rotation gesture defaults: classifier indices and timing
pub const DEFAULT_TRACK_ROTATION_INDEX: usize = 8;
pub const DEFAULT_START_ROTATION_INDEX: usize = 5;
pub const DEFAULT_END_ROTATION_INDEX: usize = 6;
pub const DEFAULT_ROTATION_THRESHOLD: f64 = 0.95;
pub const DEFAULT_INFERENCE_INTERVAL: f64 = 0.01;
pub const DEFAULT_MAX_ROTATION_TIME: f64 = 2.0;

/// Weight of the running average when smoothing rotation probabilities
pub const PROBABILITY_SMOOTHING: f64 = 0.7;

/// Prediction debounce defaults
pub const DEFAULT_EVENT_CONFIRM_THRESHOLD: f64 = 0.8;
pub const DEFAULT_CHANGE_CONFIRM_THRESHOLD: f64 = 0.9;
pub const DEFAULT_HOLD_CONFIRM_THRESHOLD: f64 = 0.0;
pub const DEFAULT_MIN_GESTURE_LENGTH: usize = 1;

/// Calls a pending prediction stays open after an event without a gesture
pub const EVENT_CONFIRM_DELAY: u32 = 3;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-12;
