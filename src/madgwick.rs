//! Madgwick gradient-descent attitude fusion for accelerometer + gyroscope.
//!
//! The gyroscope rate is integrated as a quaternion derivative, and a single
//! gradient-descent step pulls the estimate towards the attitude in which
//! gravity matches the measured acceleration.

use nalgebra::Quaternion;

use crate::quaternion::multiply;

/// Madgwick IMU (6-axis) fusion step
#[derive(Debug, Clone, Copy)]
pub struct Madgwick {
    gain: f64,
    dt: f64,
}

impl Madgwick {
    /// `gain` is the gradient step weight (β), `sampling_frequency` in Hz
    #[must_use]
    pub fn new(gain: f64, sampling_frequency: f64) -> Self {
        Self {
            gain,
            dt: 1.0 / sampling_frequency,
        }
    }

    #[must_use]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// One fusion update from orientation `q`
    ///
    /// `gyro` is in rad/s; `accel` in any unit (only its direction is used).
    /// A zero gyro rate returns `q` unchanged. A zero acceleration skips the
    /// gradient correction.
    #[must_use]
    pub fn update_imu(&self, q: &Quaternion<f64>, gyro: [f64; 3], accel: [f64; 3]) -> Quaternion<f64> {
        let [gx, gy, gz] = gyro;
        if gx * gx + gy * gy + gz * gz <= 0.0 {
            return *q;
        }

        // Rate of change from the gyroscope
        let mut q_dot = multiply(q, &Quaternion::new(0.0, gx, gy, gz)) * 0.5;

        let [ax, ay, az] = accel;
        let accel_norm = (ax * ax + ay * ay + az * az).sqrt();
        if accel_norm > 0.0 {
            let (ax, ay, az) = (ax / accel_norm, ay / accel_norm, az / accel_norm);
            let unit = *q / q.norm();
            let (qw, qx, qy, qz) = (unit.w, unit.i, unit.j, unit.k);

            // Objective: predicted gravity direction minus measured
            let f1 = 2.0 * (qx * qz - qw * qy) - ax;
            let f2 = 2.0 * (qw * qx + qy * qz) - ay;
            let f3 = 2.0 * (0.5 - qx * qx - qy * qy) - az;

            if f1 * f1 + f2 * f2 + f3 * f3 > 0.0 {
                // J^T f
                let gradient = Quaternion::new(
                    -2.0 * qy * f1 + 2.0 * qx * f2,
                    2.0 * qz * f1 + 2.0 * qw * f2 - 4.0 * qx * f3,
                    -2.0 * qw * f1 + 2.0 * qz * f2 - 4.0 * qy * f3,
                    2.0 * qx * f1 + 2.0 * qy * f2,
                );
                let gradient_norm = gradient.norm();
                if gradient_norm > 0.0 {
                    q_dot = q_dot - gradient * (self.gain / gradient_norm);
                }
            }
        }

        let integrated = *q + q_dot * self.dt;
        integrated / integrated.norm()
    }

    /// Estimate a whole series of orientations from `(accel, gyro)` rows
    ///
    /// The first orientation comes from the first accelerometer reading;
    /// each later one is a single [`update_imu`](Self::update_imu) step from
    /// its predecessor. Gyro rates must already be in rad/s.
    #[must_use]
    pub fn estimate_series(&self, rows: &[([f64; 3], [f64; 3])]) -> Vec<Quaternion<f64>> {
        let Some((first_accel, _)) = rows.first() else {
            return Vec::new();
        };

        let mut series = Vec::with_capacity(rows.len());
        let mut q = attitude_from_accel(*first_accel);
        series.push(q);
        for (accel, gyro) in &rows[1..] {
            q = self.update_imu(&q, *gyro, *accel);
            series.push(q);
        }
        series
    }
}

/// Roll and pitch from a gravity reading, yaw fixed at zero
///
/// Returns the identity for a zero reading.
#[must_use]
pub fn attitude_from_accel(accel: [f64; 3]) -> Quaternion<f64> {
    let [ax, ay, az] = accel;
    let norm = (ax * ax + ay * ay + az * az).sqrt();
    if norm <= 0.0 {
        return Quaternion::identity();
    }
    let (ax, ay, az) = (ax / norm, ay / norm, az / norm);

    let roll = ay.atan2(az);
    let pitch = (-ax).atan2(ay.hypot(az));
    let (sx, cx) = (roll / 2.0).sin_cos();
    let (sy, cy) = (pitch / 2.0).sin_cos();

    Quaternion::new(cy * cx, cy * sx, sy * cx, -sy * sx)
}
