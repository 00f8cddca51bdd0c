//! Orientation estimation from accelerometer + gyroscope rows.
//!
//! Rows are `[ax, ay, az, gx, gy, gz]` with gyro rates in degrees/second.
//! The first batch bootstraps a converged orientation series; afterwards
//! every row is one Madgwick update from the current orientation.

use std::collections::VecDeque;

use log::{debug, warn};
use nalgebra::Quaternion;
use ndarray::ArrayView2;

use crate::config::OrientationConfig;
use crate::constants::{DEFAULT_BUTTERWORTH_ORDER, DEFAULT_GYRO_CUTOFF, IMU_CHANNELS};
use crate::filters::{butterworth::ButterworthHighPassFilter, create_filter, SignalFilter};
use crate::madgwick::Madgwick;
use crate::utils::{ensure_channels, ensure_finite};
use crate::{Error, Result};

type ImuRow = ([f64; 3], [f64; 3]);

/// Sensor-fusion orientation estimator with bounded history
pub struct OrientationEstimator {
    fusion: Madgwick,
    sampling_frequency: f64,
    history_size: usize,
    history: VecDeque<Quaternion<f64>>,
    current: Option<Quaternion<f64>>,
    gyro_filter: Option<Box<dyn SignalFilter>>,
}

impl OrientationEstimator {
    /// Create a new estimator
    ///
    /// With `filter_gyro` the gyroscope channels pass through a second-order
    /// 0.5 Hz Butterworth high-pass before each online update.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for a non-positive sampling frequency,
    /// a negative gain or a zero history size
    pub fn new(sampling_frequency: f64, gain: f64, history_size: usize, filter_gyro: bool) -> Result<Self> {
        let gyro_filter: Option<Box<dyn SignalFilter>> = if filter_gyro {
            Some(Box::new(ButterworthHighPassFilter::new(
                DEFAULT_GYRO_CUTOFF,
                sampling_frequency,
                DEFAULT_BUTTERWORTH_ORDER,
                3,
            )?))
        } else {
            None
        };
        Self::with_gyro_filter(sampling_frequency, gain, history_size, gyro_filter)
    }

    /// Create an estimator from its configuration section
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid parameters or an unknown
    /// gyro filter description
    pub fn from_config(config: &OrientationConfig) -> Result<Self> {
        let gyro_filter = match config.gyro_filter.trim().to_lowercase().as_str() {
            "" | "none" => None,
            description => Some(create_filter(description, config.sampling_frequency, 3)?),
        };
        Self::with_gyro_filter(config.sampling_frequency, config.gain, config.history_size, gyro_filter)
    }

    fn with_gyro_filter(
        sampling_frequency: f64,
        gain: f64,
        history_size: usize,
        gyro_filter: Option<Box<dyn SignalFilter>>,
    ) -> Result<Self> {
        if !(sampling_frequency.is_finite() && sampling_frequency > 0.0) {
            return Err(Error::ConfigError(format!(
                "Sampling frequency must be positive, got {sampling_frequency}"
            )));
        }
        if !(gain.is_finite() && gain >= 0.0) {
            return Err(Error::ConfigError(format!("Fusion gain must be non-negative, got {gain}")));
        }
        if history_size == 0 {
            return Err(Error::ConfigError("History size must be greater than 0".to_string()));
        }

        Ok(Self {
            fusion: Madgwick::new(gain, sampling_frequency),
            sampling_frequency,
            history_size,
            history: VecDeque::with_capacity(history_size),
            current: None,
            gyro_filter,
        })
    }

    /// Feed a batch of IMU rows; returns how many rows were accepted
    ///
    /// Rows without exactly six finite values are logged and skipped. The first
    /// call bootstraps the orientation from the whole batch.
    pub fn update_imu_values<R: AsRef<[f64]>>(&mut self, rows: &[R]) -> usize {
        let valid: Vec<ImuRow> = rows
            .iter()
            .filter_map(|row| match split_row(row.as_ref()) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Invalid IMU sample: {e}");
                    None
                }
            })
            .collect();

        if self.current.is_none() {
            self.bootstrap(&valid);
        } else {
            for (accel, gyro) in &valid {
                self.step(*accel, *gyro);
            }
        }
        valid.len()
    }

    /// Feed a batch held in an `(n, 6)` array
    pub fn update_imu_array(&mut self, batch: ArrayView2<'_, f64>) -> usize {
        let rows: Vec<Vec<f64>> = batch.rows().into_iter().map(|row| row.to_vec()).collect();
        self.update_imu_values(&rows)
    }

    /// Feed a single IMU row and return the new orientation
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` for a row without six values and
    /// `Error::InvalidInput` for a non-finite value; the orientation is
    /// unchanged
    pub fn update_sample(&mut self, sample: &[f64]) -> Result<Quaternion<f64>> {
        let (accel, gyro) = split_row(sample).map_err(|e| {
            warn!("Invalid IMU sample: {e}");
            e
        })?;

        match self.current {
            None => {
                self.bootstrap(&[(accel, gyro)]);
                Ok(self.current.unwrap_or_else(Quaternion::identity))
            }
            Some(_) => Ok(self.step(accel, gyro)),
        }
    }

    fn bootstrap(&mut self, rows: &[ImuRow]) {
        let in_radians: Vec<ImuRow> = rows
            .iter()
            .map(|(accel, gyro)| (*accel, gyro.map(f64::to_radians)))
            .collect();

        let series = self.fusion.estimate_series(&in_radians);
        let Some(last) = series.last().copied() else {
            return;
        };

        debug!("Bootstrapped orientation from {} samples", series.len());
        for q in series {
            self.push_history(q);
        }
        self.current = Some(last);
    }

    fn step(&mut self, accel: [f64; 3], gyro: [f64; 3]) -> Quaternion<f64> {
        let gyro = match &mut self.gyro_filter {
            Some(filter) => match filter.apply(&gyro) {
                Ok(filtered) => [filtered[0], filtered[1], filtered[2]],
                Err(e) => {
                    warn!("Gyro filter skipped, using raw rates: {e}");
                    gyro
                }
            },
            None => gyro,
        };

        let current = self.current.unwrap_or_else(Quaternion::identity);
        let rotation = self.fusion.update_imu(&current, gyro.map(f64::to_radians), accel);
        self.push_history(rotation);
        self.current = Some(rotation);
        rotation
    }

    fn push_history(&mut self, q: Quaternion<f64>) {
        if self.history.len() >= self.history_size {
            self.history.pop_front();
        }
        self.history.push_back(q);
    }

    /// Current orientation, `None` before the first valid sample
    #[must_use]
    pub fn current_rotation(&self) -> Option<Quaternion<f64>> {
        self.current
    }

    /// Stored orientations, oldest first
    #[must_use]
    pub fn rotation_history(&self) -> Vec<Quaternion<f64>> {
        self.history.iter().copied().collect()
    }

    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.history_size
    }

    #[must_use]
    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    /// Forget the orientation, history and gyro filter state
    pub fn reset(&mut self) {
        self.current = None;
        self.history.clear();
        if let Some(filter) = &mut self.gyro_filter {
            filter.reset();
        }
    }
}

fn split_row(row: &[f64]) -> Result<ImuRow> {
    ensure_channels("IMU sample", IMU_CHANNELS, row.len())?;
    ensure_finite("IMU sample", row)?;
    Ok(([row[0], row[1], row[2]], [row[3], row[4], row[5]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn still_rows(n: usize) -> Vec<[f64; 6]> {
        vec![[0.0, 0.0, 9.81, 0.0, 0.0, 0.0]; n]
    }

    #[test]
    fn test_bootstrap_seeds_history() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 50, false).unwrap();
        assert!(estimator.current_rotation().is_none());

        assert_eq!(estimator.update_imu_values(&still_rows(20)), 20);

        assert_eq!(estimator.rotation_history().len(), 20);
        assert_eq!(estimator.current_rotation(), Some(Quaternion::identity()));
    }

    #[test]
    fn test_bootstrap_capped_at_capacity() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 8, false).unwrap();
        estimator.update_imu_values(&still_rows(30));
        assert_eq!(estimator.rotation_history().len(), 8);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut estimator = OrientationEstimator::new(100.0, 0.1, 5, false).unwrap();
        estimator.update_imu_values(&still_rows(5));

        // Rotate about Z; each new orientation differs from the last
        let mut last = Quaternion::identity();
        for _ in 0..3 {
            last = estimator.update_sample(&[0.0, 0.0, 9.81, 0.0, 0.0, 45.0]).unwrap();
        }

        let history = estimator.rotation_history();
        assert_eq!(history.len(), 5);
        assert_eq!(history[4], last);
        assert_eq!(estimator.current_rotation(), Some(last));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 50, false).unwrap();
        estimator.update_imu_values(&still_rows(4));
        let before = estimator.current_rotation();

        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0, 3.0], vec![0.0; 7]];
        assert_eq!(estimator.update_imu_values(&rows), 0);
        assert_eq!(estimator.current_rotation(), before);
        assert!(estimator.update_sample(&[1.0; 5]).is_err());
        assert_eq!(estimator.current_rotation(), before);
    }

    #[test]
    fn test_non_finite_sample_is_skipped() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 50, true).unwrap();
        estimator.update_imu_values(&still_rows(2));
        let before = estimator.current_rotation();

        let nan_gyro = [0.0, 0.0, 9.81, f64::NAN, 0.0, 0.0];
        assert!(matches!(estimator.update_sample(&nan_gyro), Err(Error::InvalidInput(_))));
        let inf_accel = [0.0, f64::INFINITY, 9.81, 0.0, 0.0, 0.0];
        assert_eq!(estimator.update_imu_values(&[inf_accel]), 0);
        assert_eq!(estimator.current_rotation(), before);
        assert_eq!(estimator.rotation_history().len(), 2);

        for _ in 0..500 {
            let q = estimator.update_sample(&still_rows(1)[0]).unwrap();
            assert!((q.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_empty_bootstrap_stays_uninitialized() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 50, false).unwrap();
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0]];
        estimator.update_imu_values(&rows);
        assert!(!estimator.is_initialized());
        assert!(estimator.rotation_history().is_empty());
    }

    #[test]
    fn test_unit_norm_after_every_update() {
        let mut estimator = OrientationEstimator::new(112.2, 0.033, 600, true).unwrap();
        estimator.update_imu_values(&[[0.2, -0.1, 9.7, 1.0, -2.0, 0.5]; 10]);

        for i in 0..500 {
            let t = f64::from(i) / 112.2;
            let sample = [t.sin(), 0.3 * t.cos(), 9.81, 30.0 * t.sin(), -20.0, 45.0 * (2.0 * t).cos()];
            let q = estimator.update_sample(&sample).unwrap();
            assert!((q.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_array_batch() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 50, false).unwrap();
        let batch = Array2::from_shape_fn((12, 6), |(_, c)| if c == 2 { 1.0 } else { 0.0 });
        assert_eq!(estimator.update_imu_array(batch.view()), 12);
        assert_eq!(estimator.rotation_history().len(), 12);
    }

    #[test]
    fn test_from_config_gyro_filter() {
        let config = OrientationConfig {
            gyro_filter: "butterworth:0.5:2".to_string(),
            ..OrientationConfig::default()
        };
        assert!(OrientationEstimator::from_config(&config).is_ok());

        let config = OrientationConfig {
            gyro_filter: "median:3".to_string(),
            ..OrientationConfig::default()
        };
        assert!(OrientationEstimator::from_config(&config).is_err());
    }

    #[test]
    fn test_reset() {
        let mut estimator = OrientationEstimator::new(100.0, 0.033, 50, true).unwrap();
        estimator.update_imu_values(&still_rows(3));
        estimator.reset();
        assert!(estimator.current_rotation().is_none());
        assert!(estimator.rotation_history().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(OrientationEstimator::new(0.0, 0.033, 10, false).is_err());
        assert!(OrientationEstimator::new(100.0, -1.0, 10, false).is_err());
        assert!(OrientationEstimator::new(100.0, 0.033, 0, false).is_err());
    }
}
