use super::{check_sample, validate_design, SignalFilter};
use crate::Result;

/// First-order high-pass filter
///
/// Per channel: `y[n] = α·(y[n-1] + x[n] - x[n-1])` with
/// `α = dt / (RC + dt)`, `RC = 1 / (2π·f_c)` and `dt = 1 / f_s`.
pub struct FirstOrderHighPassFilter {
    cutoff_frequency: f64,
    sampling_rate: f64,
    alpha: f64,
    prev_x: Vec<f64>,
    prev_y: Vec<f64>,
}

impl FirstOrderHighPassFilter {
    /// Create a new first-order high-pass filter
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the cutoff is not in `(0, f_s/2)`, the
    /// sampling rate is not positive, or there are no channels
    pub fn new(cutoff_frequency: f64, sampling_rate: f64, num_channels: usize) -> Result<Self> {
        validate_design(cutoff_frequency, sampling_rate, num_channels)?;

        let rc = 1.0 / (2.0 * std::f64::consts::PI * cutoff_frequency);
        let dt = 1.0 / sampling_rate;

        Ok(Self {
            cutoff_frequency,
            sampling_rate,
            alpha: dt / (rc + dt),
            prev_x: vec![0.0; num_channels],
            prev_y: vec![0.0; num_channels],
        })
    }

    /// Smoothing coefficient α
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
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

impl SignalFilter for FirstOrderHighPassFilter {
    fn apply(&mut self, sample: &[f64]) -> Result<Vec<f64>> {
        check_sample(self, sample)?;

        let output = sample
            .iter()
            .zip(self.prev_x.iter_mut().zip(self.prev_y.iter_mut()))
            .map(|(&x, (prev_x, prev_y))| {
                let y = self.alpha * (*prev_y + x - *prev_x);
                *prev_x = x;
                *prev_y = y;
                y
            })
            .collect();

        Ok(output)
    }

    fn reset(&mut self) {
        self.prev_x.fill(0.0);
        self.prev_y.fill(0.0);
    }

    fn num_channels(&self) -> usize {
        self.prev_x.len()
    }

    fn name(&self) -> &str {
        "FirstOrderHighPassFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_order_high_pass_recurrence() {
        let mut filter = FirstOrderHighPassFilter::new(1.0, 100.0, 1).unwrap();
        let alpha = filter.alpha();

        // Step input: first output is alpha * x
        let y0 = filter.apply(&[1.0]).unwrap()[0];
        assert_eq!(y0, alpha * 1.0);

        // Then decays geometrically while the input holds
        let y1 = filter.apply(&[1.0]).unwrap()[0];
        assert_eq!(y1, alpha * y0);
    }

    #[test]
    fn test_alpha_from_cutoff() {
        let filter = FirstOrderHighPassFilter::new(0.5, 112.2, 3).unwrap();
        let rc = 1.0 / (2.0 * std::f64::consts::PI * 0.5);
        let dt = 1.0 / 112.2;
        assert!((filter.alpha() - dt / (rc + dt)).abs() < 1e-15);
    }

    #[test]
    fn test_channels_are_independent() {
        let mut filter = FirstOrderHighPassFilter::new(2.0, 50.0, 2).unwrap();
        let mut single = FirstOrderHighPassFilter::new(2.0, 50.0, 1).unwrap();

        for x in [1.0, 3.0, -2.0, 0.5] {
            let both = filter.apply(&[x, 100.0]).unwrap();
            let alone = single.apply(&[x]).unwrap();
            assert_eq!(both[0], alone[0]);
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let batch = array![[1.0, -1.0], [2.0, 0.0], [0.5, 4.0], [0.0, 0.0]];

        let mut batched = FirstOrderHighPassFilter::new(5.0, 100.0, 2).unwrap();
        let out = batched.apply_batch(batch.view()).unwrap();

        let mut single = FirstOrderHighPassFilter::new(5.0, 100.0, 2).unwrap();
        for (row, out_row) in batch.rows().into_iter().zip(out.rows()) {
            assert_eq!(single.apply(&row.to_vec()).unwrap(), out_row.to_vec());
        }
    }

    #[test]
    fn test_reset() {
        let mut filter = FirstOrderHighPassFilter::new(1.0, 100.0, 1).unwrap();
        let first = filter.apply(&[4.0]).unwrap();
        filter.apply(&[8.0]).unwrap();
        filter.reset();
        assert_eq!(filter.apply(&[4.0]).unwrap(), first);
    }

    #[test]
    fn test_invalid_design() {
        assert!(FirstOrderHighPassFilter::new(0.0, 100.0, 1).is_err());
        assert!(FirstOrderHighPassFilter::new(50.0, 100.0, 1).is_err());
        assert!(FirstOrderHighPassFilter::new(1.0, 0.0, 1).is_err());
        assert!(FirstOrderHighPassFilter::new(1.0, 100.0, 0).is_err());
    }
}
