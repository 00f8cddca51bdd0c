//! Quaternion helpers shared by the orientation estimator and the rotation
//! gesture detector.
//!
//! All quaternions are scalar-first: `Quaternion::new(w, x, y, z)`.

use crate::constants::EPSILON;
use crate::{Error, Result};
use nalgebra::{Quaternion, Vector3};

/// Axis used to give the relative rotation angle its sign (device "up")
pub const REFERENCE_AXIS: [f64; 3] = [0.0, 1.0, 0.0];

/// Hamilton product `q1 ⊗ q2`
#[must_use]
pub fn multiply(q1: &Quaternion<f64>, q2: &Quaternion<f64>) -> Quaternion<f64> {
    let (w1, x1, y1, z1) = (q1.w, q1.i, q1.j, q1.k);
    let (w2, x2, y2, z2) = (q2.w, q2.i, q2.j, q2.k);

    Quaternion::new(
        w1 * w2 - x1 * x2 - y1 * y2 - z1 * z2,
        w1 * x2 + x1 * w2 + y1 * z2 - z1 * y2,
        w1 * y2 - x1 * z2 + y1 * w2 + z1 * x2,
        w1 * z2 + x1 * y2 - y1 * x2 + z1 * w2,
    )
}

/// Conjugate; equals the inverse for unit quaternions
#[must_use]
pub fn conjugate(q: &Quaternion<f64>) -> Quaternion<f64> {
    Quaternion::new(q.w, -q.i, -q.j, -q.k)
}

/// Multiplicative inverse
///
/// # Errors
///
/// Returns `Error::InvalidInput` for a zero quaternion
pub fn inverse(q: &Quaternion<f64>) -> Result<Quaternion<f64>> {
    let norm_squared = q.norm_squared();
    if norm_squared < EPSILON {
        return Err(Error::InvalidInput("Cannot invert a zero quaternion".to_string()));
    }
    Ok(conjugate(q) / norm_squared)
}

/// Scale to unit norm
///
/// # Errors
///
/// Returns `Error::InvalidInput` for a zero quaternion
pub fn normalized(q: &Quaternion<f64>) -> Result<Quaternion<f64>> {
    let norm = q.norm();
    if norm < EPSILON {
        return Err(Error::InvalidInput("Cannot normalize a zero quaternion".to_string()));
    }
    Ok(*q / norm)
}

/// Relative rotation `q2 ⊗ q1*` between two orientations, both normalized first
fn relative_rotation(q1: &Quaternion<f64>, q2: &Quaternion<f64>) -> Result<Quaternion<f64>> {
    let q1 = normalized(q1)?;
    let q2 = normalized(q2)?;
    Ok(multiply(&q2, &conjugate(&q1)))
}

/// Signed rotation angle in degrees from `q1` to `q2`
///
/// The magnitude is `2·acos(w)` of the relative rotation. It is positive when
/// the rotation axis points along [`REFERENCE_AXIS`], and the whole result is
/// negated before returning. Callers depend on that sign convention.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if either quaternion has zero norm
pub fn signed_angle(q1: &Quaternion<f64>, q2: &Quaternion<f64>) -> Result<f64> {
    let q_rel = relative_rotation(q1, q2)?;
    let mut angle = (2.0 * q_rel.w.clamp(-1.0, 1.0).acos()).to_degrees();

    let axis = Vector3::new(q_rel.i, q_rel.j, q_rel.k);
    let axis_norm = axis.norm();
    if axis_norm > 0.0 {
        let reference = Vector3::from(REFERENCE_AXIS);
        if (axis / axis_norm).dot(&reference) < 0.0 {
            angle = -angle;
        }
    }

    Ok(-angle)
}

/// Unsigned rotation angle in degrees between two orientations, in `[0, 180]`
///
/// # Errors
///
/// Returns `Error::InvalidInput` if either quaternion has zero norm
pub fn unsigned_angle(q1: &Quaternion<f64>, q2: &Quaternion<f64>) -> Result<f64> {
    let q_rel = relative_rotation(q1, q2)?;
    Ok((2.0 * q_rel.w.abs().clamp(-1.0, 1.0).acos()).to_degrees())
}

/// Wrap an angle in degrees into `[-180, 180)`
#[must_use]
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to the modulus for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
