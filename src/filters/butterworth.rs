//! Butterworth high-pass filter designed with the bilinear transform.
//!
//! The runtime recurrence is the transposed direct form II. Its delay line
//! starts at the steady-state response to a unit step, so a constant input
//! produces no start-up transient.

use nalgebra::{Complex, DMatrix, DVector};

use super::{check_sample, validate_design, SignalFilter};
use crate::constants::MAX_BUTTERWORTH_ORDER;
use crate::{Error, Result};

/// Multi-channel Butterworth high-pass filter
pub struct ButterworthHighPassFilter {
    order: usize,
    cutoff_frequency: f64,
    sampling_rate: f64,
    b: Vec<f64>,
    a: Vec<f64>,
    zi: Vec<f64>,
    // One delay line of length `order` per channel
    state: Vec<Vec<f64>>,
}

impl ButterworthHighPassFilter {
    /// Design a new Butterworth high-pass filter
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the order is outside `1..=8`, the
    /// cutoff is not in `(0, f_s/2)`, or there are no channels
    pub fn new(cutoff_frequency: f64, sampling_rate: f64, order: usize, num_channels: usize) -> Result<Self> {
        validate_design(cutoff_frequency, sampling_rate, num_channels)?;
        if order == 0 || order > MAX_BUTTERWORTH_ORDER {
            return Err(Error::ConfigError(format!(
                "Filter order must be between 1 and {MAX_BUTTERWORTH_ORDER}, got {order}"
            )));
        }

        let (b, a) = design_highpass(order, cutoff_frequency, sampling_rate);
        let zi = steady_state_conditions(&b, &a)?;
        let state = vec![zi.clone(); num_channels];

        Ok(Self {
            order,
            cutoff_frequency,
            sampling_rate,
            b,
            a,
            zi,
            state,
        })
    }

    /// Numerator and denominator coefficients `(b, a)` with `a[0] == 1`
    #[must_use]
    pub fn coefficients(&self) -> (&[f64], &[f64]) {
        (&self.b, &self.a)
    }

    /// Steady-state delay line used for every channel at start-up
    #[must_use]
    pub fn initial_conditions(&self) -> &[f64] {
        &self.zi
    }

    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    #[must_use]
    pub fn cutoff_frequency(&self) -> f64 {
        self.cutoff_frequency
    }

    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }
}

impl SignalFilter for ButterworthHighPassFilter {
    fn apply(&mut self, sample: &[f64]) -> Result<Vec<f64>> {
        check_sample(self, sample)?;

        let (b, a, n) = (&self.b, &self.a, self.order);
        let output = sample
            .iter()
            .zip(self.state.iter_mut())
            .map(|(&x, z)| {
                let y = b[0].mul_add(x, z[0]);
                for i in 0..n - 1 {
                    z[i] = b[i + 1] * x + z[i + 1] - a[i + 1] * y;
                }
                z[n - 1] = b[n] * x - a[n] * y;
                y
            })
            .collect();

        Ok(output)
    }

    fn reset(&mut self) {
        for z in &mut self.state {
            z.copy_from_slice(&self.zi);
        }
    }

    fn num_channels(&self) -> usize {
        self.state.len()
    }

    fn name(&self) -> &str {
        "ButterworthHighPassFilter"
    }
}

/// Digital high-pass Butterworth coefficients `(b, a)`
///
/// Analog prototype poles are mapped to a high-pass at the prewarped cutoff
/// and then through the bilinear transform. All zeros land on `z = 1`. The
/// gain is normalized to unity at Nyquist.
#[allow(clippy::cast_precision_loss)] // order is at most 8
fn design_highpass(order: usize, cutoff_frequency: f64, sampling_rate: f64) -> (Vec<f64>, Vec<f64>) {
    let n = order as f64;
    let fs2 = 2.0 * sampling_rate;
    let warped = fs2 * (std::f64::consts::PI * cutoff_frequency / sampling_rate).tan();

    let poles: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let theta = std::f64::consts::PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
            let prototype = Complex::from_polar(1.0, theta);
            let analog = Complex::new(warped, 0.0) / prototype;
            (Complex::new(fs2, 0.0) + analog) / (Complex::new(fs2, 0.0) - analog)
        })
        .collect();

    // Denominator: product of (1 - p z^-1)
    let mut a = vec![Complex::new(1.0, 0.0)];
    for pole in &poles {
        let mut next = a.clone();
        next.push(Complex::new(0.0, 0.0));
        for (i, coeff) in a.iter().enumerate() {
            next[i + 1] -= pole * coeff;
        }
        a = next;
    }
    let a: Vec<f64> = a.iter().map(|c| c.re).collect();

    // Numerator: (1 - z^-1)^n
    let mut b = vec![1.0];
    for _ in 0..order {
        let mut next = b.clone();
        next.push(0.0);
        for (i, coeff) in b.iter().enumerate() {
            next[i + 1] -= coeff;
        }
        b = next;
    }

    // Evaluate both polynomials at z = -1
    let alternating = |coeffs: &[f64]| -> f64 {
        coeffs
            .iter()
            .enumerate()
            .map(|(i, c)| if i % 2 == 0 { *c } else { -*c })
            .sum()
    };
    let gain = alternating(&a) / alternating(&b);
    let b = b.iter().map(|c| c * gain).collect();

    (b, a)
}

/// Delay-line state in steady state for a unit step input
///
/// Solves `(I - Aᵀ) zi = b[1..] - a[1..]·b[0]` where `A` is the companion
/// matrix of the denominator.
fn steady_state_conditions(b: &[f64], a: &[f64]) -> Result<Vec<f64>> {
    let n = a.len() - 1;

    // Companion matrix: first row -a[1..], ones on the subdiagonal
    let companion = DMatrix::from_fn(n, n, |i, j| {
        if i == 0 {
            -a[j + 1]
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    let system = DMatrix::identity(n, n) - companion.transpose();
    let rhs = DVector::from_iterator(n, (1..=n).map(|i| b[i] - a[i] * b[0]));

    system
        .lu()
        .solve(&rhs)
        .map(|zi| zi.iter().copied().collect())
        .ok_or_else(|| Error::ConfigError("Filter design has no steady state".to_string()))
}
