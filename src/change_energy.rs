//! Change-energy accumulation and peak-based motion event detection.
//!
//! The change energy of a multi-channel stream is the summed absolute
//! sample-to-sample difference plus a geometrically decaying memory of the
//! previous value. Bursts of movement show up as peaks, which the event
//! detector turns into discrete [`ChangeEvent`]s.

use std::collections::VecDeque;

use log::{debug, warn};
use ndarray::ArrayView2;

use crate::config::ChangeEnergyConfig;
use crate::constants::{
    DEFAULT_EVENT_THRESHOLD, DEFAULT_MAX_LOGGED_EVENTS, DEFAULT_PEAK_WINDOW, DEFAULT_RCS_DECAY,
    DEFAULT_REFRACTORY_WINDOW,
};
use crate::utils::{ensure_channels, ensure_finite};
use crate::{Error, Result};

/// Change-energy accumulator (running change sum with decay)
#[derive(Debug, Clone)]
pub struct RcsFilter {
    decay: f64,
    prev_sample: Option<Vec<f64>>,
    prev_energy: Option<f64>,
}

impl RcsFilter {
    /// Create a new change-energy filter
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if `decay` is not a positive finite number
    pub fn new(decay: f64) -> Result<Self> {
        if !(decay.is_finite() && decay > 0.0) {
            return Err(Error::ConfigError(format!("Decay must be positive, got {decay}")));
        }
        Ok(Self {
            decay,
            prev_sample: None,
            prev_energy: None,
        })
    }

    /// Feed one sample and return its change energy
    ///
    /// The first sample fixes the channel count of this instance.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` when the channel count differs from the
    /// previous sample and `Error::InvalidInput` for a NaN or infinite value;
    /// the sample is skipped and the state is untouched.
    pub fn update(&mut self, sample: &[f64]) -> Result<f64> {
        if let Err(e) = ensure_finite("Change-energy filter", sample) {
            warn!("Skipping sample: {e}");
            return Err(e);
        }

        let change = match &self.prev_sample {
            Some(prev) => {
                if let Err(e) = ensure_channels("Change-energy filter", prev.len(), sample.len()) {
                    warn!("Skipping sample: {e}");
                    return Err(e);
                }
                prev.iter().zip(sample).map(|(p, s)| (p - s).abs()).sum()
            }
            None => 0.0,
        };

        let energy = match self.prev_energy {
            Some(prev) => prev / self.decay + change,
            None => change,
        };

        self.prev_energy = Some(energy);
        match &mut self.prev_sample {
            Some(prev) => prev.copy_from_slice(sample),
            None => self.prev_sample = Some(sample.to_vec()),
        }

        Ok(energy)
    }

    /// Feed a batch of samples (rows) in order
    ///
    /// # Errors
    ///
    /// Stops at the first malformed row and returns its shape error
    pub fn update_batch(&mut self, batch: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        batch.rows().into_iter().map(|row| self.update(&row.to_vec())).collect()
    }

    /// Decay constant of this filter
    #[must_use]
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Forget the previous sample and energy
    pub fn reset(&mut self) {
        self.prev_sample = None;
        self.prev_energy = None;
    }
}

impl Default for RcsFilter {
    fn default() -> Self {
        Self {
            decay: DEFAULT_RCS_DECAY,
            prev_sample: None,
            prev_energy: None,
        }
    }
}

/// A confirmed change-energy peak
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeEvent {
    /// Detector sample counter at the peak
    pub index: u64,
    /// Change energy at the peak
    pub magnitude: f64,
}

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq)]
enum DetectorState {
    Idle,
    Tracking {
        peak: ChangeEvent,
        samples_since_threshold: usize,
    },
}

/// Rise / peak / refractory state machine over the change-energy stream
#[derive(Debug, Clone)]
pub struct RcsEventDetector {
    threshold: f64,
    peak_window: usize,
    refractory_window: usize,
    rcs: RcsFilter,
    state: DetectorState,
    iter: u64,
    events: VecDeque<ChangeEvent>,
    max_logged_events: usize,
    energy_history: Option<Vec<f64>>,
}

impl RcsEventDetector {
    /// Create a new event detector with the default change-energy decay
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if `peak_window` is zero or `threshold`
    /// is negative or not finite
    pub fn new(threshold: f64, peak_window: usize, refractory_window: usize, record_history: bool) -> Result<Self> {
        Self::with_filter(
            RcsFilter::default(),
            threshold,
            peak_window,
            refractory_window,
            record_history,
        )
    }

    /// Create a detector from its configuration section
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` for invalid parameters
    pub fn from_config(config: &ChangeEnergyConfig) -> Result<Self> {
        let mut detector = Self::with_filter(
            RcsFilter::new(config.decay)?,
            config.threshold,
            config.peak_window,
            config.refractory_window,
            config.record_history,
        )?;
        detector.max_logged_events = config.max_logged_events;
        Ok(detector)
    }

    fn with_filter(
        rcs: RcsFilter,
        threshold: f64,
        peak_window: usize,
        refractory_window: usize,
        record_history: bool,
    ) -> Result<Self> {
        if peak_window == 0 {
            return Err(Error::ConfigError("Peak window must be greater than 0".to_string()));
        }
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(Error::ConfigError(format!(
                "Threshold must be non-negative, got {threshold}"
            )));
        }

        Ok(Self {
            threshold,
            peak_window,
            refractory_window,
            rcs,
            state: DetectorState::Idle,
            iter: 0,
            events: VecDeque::new(),
            max_logged_events: DEFAULT_MAX_LOGGED_EVENTS,
            energy_history: record_history.then(Vec::new),
        })
    }

    /// Feed one sample; returns the event confirmed on this call, if any
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` for a sample with the wrong channel count
    /// and `Error::InvalidInput` for a non-finite value. The sample is skipped and does not advance the sample counter.
    pub fn update(&mut self, sample: &[f64]) -> Result<Option<ChangeEvent>> {
        let energy = self.rcs.update(sample)?;
        if let Some(history) = &mut self.energy_history {
            history.push(energy);
        }

        let confirmed = self.step(energy);
        self.iter += 1;
        Ok(confirmed)
    }

    fn step(&mut self, energy: f64) -> Option<ChangeEvent> {
        match &mut self.state {
            DetectorState::Idle => {
                if energy > self.threshold {
                    debug!("Change energy {energy:.3} crossed threshold at sample {}", self.iter);
                    self.state = DetectorState::Tracking {
                        peak: ChangeEvent {
                            index: self.iter,
                            magnitude: energy,
                        },
                        samples_since_threshold: 0,
                    };
                }
                None
            }
            DetectorState::Tracking {
                peak,
                samples_since_threshold,
            } => {
                *samples_since_threshold += 1;
                let since = *samples_since_threshold;

                if since < self.peak_window {
                    if since > self.refractory_window {
                        self.state = DetectorState::Idle;
                    } else if energy >= peak.magnitude {
                        *peak = ChangeEvent {
                            index: self.iter,
                            magnitude: energy,
                        };
                    }
                    None
                } else if since == self.peak_window {
                    let event = *peak;
                    self.log_event(event);
                    Some(event)
                } else {
                    if since > self.refractory_window {
                        self.state = DetectorState::Idle;
                    }
                    None
                }
            }
        }
    }

    fn log_event(&mut self, event: ChangeEvent) {
        debug!("Change event at sample {} (energy {:.3})", event.index, event.magnitude);
        if self.max_logged_events == 0 {
            return;
        }
        if self.events.len() >= self.max_logged_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Feed a batch; returns the positions of confirmed peaks relative to the
    /// start of this batch (negative when the peak fell in an earlier batch)
    ///
    /// # Errors
    ///
    /// Stops at the first malformed row and returns its shape error
    #[allow(clippy::cast_possible_wrap)] // sample counters stay far below i64::MAX
    pub fn update_batch(&mut self, batch: ArrayView2<'_, f64>) -> Result<Vec<i64>> {
        let mut confirmed = Vec::new();
        for row in batch.rows() {
            if let Some(event) = self.update(&row.to_vec())? {
                confirmed.push(event.index);
            }
        }

        let batch_len = batch.nrows() as i64;
        let end = self.iter as i64;
        Ok(confirmed
            .into_iter()
            .map(|index| index as i64 - end + batch_len)
            .collect())
    }

    /// Whether the detector is currently following a rising peak
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, DetectorState::Tracking { .. })
    }

    /// Number of samples processed so far
    #[must_use]
    pub fn samples_processed(&self) -> u64 {
        self.iter
    }

    /// Most recent confirmed events, oldest first
    #[must_use]
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.iter().copied().collect()
    }

    /// Change energies seen so far, when history recording is enabled
    #[must_use]
    pub fn energy_history(&self) -> Option<&[f64]> {
        self.energy_history.as_deref()
    }

    /// Return to the idle state and clear all logs
    pub fn reset(&mut self) {
        self.rcs.reset();
        self.state = DetectorState::Idle;
        self.iter = 0;
        self.events.clear();
        if let Some(history) = &mut self.energy_history {
            history.clear();
        }
    }
}

impl Default for RcsEventDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EVENT_THRESHOLD,
            peak_window: DEFAULT_PEAK_WINDOW,
            refractory_window: DEFAULT_REFRACTORY_WINDOW,
            rcs: RcsFilter::default(),
            state: DetectorState::Idle,
            iter: 0,
            events: VecDeque::new(),
            max_logged_events: DEFAULT_MAX_LOGGED_EVENTS,
            energy_history: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rcs_skips_non_finite_sample() {
        let mut filter = RcsFilter::new(2.0).unwrap();
        assert_eq!(filter.update(&[1.0, 1.0]).unwrap(), 0.0);

        assert!(matches!(filter.update(&[f64::NAN, 1.0]), Err(Error::InvalidInput(_))));
        assert!(matches!(filter.update(&[1.0, f64::INFINITY]), Err(Error::InvalidInput(_))));

        // Previous sample and energy are still the ones from the first call
        assert_eq!(filter.update(&[3.0, 1.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_detector_recovers_after_non_finite_sample() {
        let mut detector = RcsEventDetector::new(5.0, 3, 10, false).unwrap();
        detector.update(&[0.0]).unwrap();
        assert!(detector.update(&[f64::NAN]).is_err());
        assert_eq!(detector.samples_processed(), 1);

        let mut events = 0;
        for i in 0..20 {
            let value = if i % 2 == 0 { 10.0 } else { 0.0 };
            if detector.update(&[value]).unwrap().is_some() {
                events += 1;
            }
        }
        assert!(events > 0);
    }

    #[test]
    fn test_rcs_reference_sequence() {
        let mut filter = RcsFilter::new(1.6).unwrap();

        assert_eq!(filter.update(&[0.0, 0.0]).unwrap(), 0.0);
        assert_eq!(filter.update(&[1.0, 0.0]).unwrap(), 1.0);
        assert_eq!(filter.update(&[1.0, 0.0]).unwrap(), 0.625);
    }

    #[test]
    fn test_rcs_batch_matches_single_updates() {
        let batch = array![[0.0, 1.0, 2.0], [0.5, 0.5, 2.5], [3.0, -1.0, 0.0], [3.0, -1.0, 0.0]];

        let mut single = RcsFilter::default();
        let expected: Vec<f64> = batch.rows().into_iter().map(|r| single.update(&r.to_vec()).unwrap()).collect();

        let mut batched = RcsFilter::default();
        assert_eq!(batched.update_batch(batch.view()).unwrap(), expected);
    }

    #[test]
    fn test_rcs_skips_malformed_sample() {
        let mut filter = RcsFilter::default();
        filter.update(&[1.0, 1.0]).unwrap();

        assert!(matches!(filter.update(&[1.0]), Err(Error::ShapeError(_))));

        // State untouched: the next valid sample is compared against [1, 1]
        assert_eq!(filter.update(&[2.0, 1.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_rcs_rejects_bad_decay() {
        assert!(RcsFilter::new(0.0).is_err());
        assert!(RcsFilter::new(-1.0).is_err());
        assert!(RcsFilter::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rcs_reset() {
        let mut filter = RcsFilter::default();
        filter.update(&[0.0]).unwrap();
        filter.update(&[5.0]).unwrap();
        filter.reset();
        assert_eq!(filter.update(&[100.0]).unwrap(), 0.0);
    }

    /// Feeds a single step of height `step` and then holds it
    fn step_stream(step: f64, quiet: usize, hold: usize) -> Vec<[f64; 1]> {
        let mut samples = vec![[0.0]; quiet];
        samples.extend(std::iter::repeat([step]).take(hold));
        samples
    }

    #[test]
    fn test_detector_confirms_after_peak_window() {
        let mut detector = RcsEventDetector::new(2.0, 3, 6, false).unwrap();
        let samples = step_stream(5.0, 2, 10);

        let mut confirmed = Vec::new();
        for (call, sample) in samples.iter().enumerate() {
            if let Some(event) = detector.update(sample).unwrap() {
                confirmed.push((call, event));
            }
        }

        // Threshold crossed at sample 2 (energy 5), confirmed 3 samples later
        assert_eq!(confirmed.len(), 1);
        let (call, event) = confirmed[0];
        assert_eq!(call, 5);
        assert_eq!(event.index, 2);
        assert_eq!(event.magnitude, 5.0);
        assert_eq!(detector.events(), vec![event]);
    }

    #[test]
    fn test_detector_ties_favor_later_sample() {
        let mut detector = RcsEventDetector::new(0.5, 4, 8, false).unwrap();
        // Energies: 0, 1, 1/1.6 + 0.375 = 1.0, ...
        detector.update(&[0.0]).unwrap();
        detector.update(&[1.0]).unwrap();
        detector.update(&[1.375]).unwrap();
        detector.update(&[1.375]).unwrap();
        detector.update(&[1.375]).unwrap();
        let event = detector.update(&[1.375]).unwrap().expect("event after peak window");

        assert_eq!(event.index, 2);
        assert_eq!(event.magnitude, 1.0);
    }

    #[test]
    fn test_detector_refractory_blocks_retrigger() {
        let mut detector = RcsEventDetector::new(0.5, 2, 5, false).unwrap();
        let mut emitted = Vec::new();

        // A large change every sample keeps the energy above threshold
        for i in 0..40 {
            let value = if i % 2 == 0 { 0.0 } else { 10.0 };
            if let Some(event) = detector.update(&[value]).unwrap() {
                emitted.push(event.index);
            }
        }

        // Each cycle: trigger, 2 samples to confirm, idle after 6 samples
        for pair in emitted.windows(2) {
            assert!(pair[1] - pair[0] >= 6, "overlapping events: {emitted:?}");
        }
        assert!(emitted.len() >= 4);
    }

    #[test]
    fn test_detector_short_refractory_never_confirms() {
        let mut detector = RcsEventDetector::new(0.5, 5, 2, false).unwrap();
        let samples = step_stream(3.0, 1, 20);
        for sample in &samples {
            assert_eq!(detector.update(sample).unwrap(), None);
        }
    }

    #[test]
    fn test_detector_batch_positions() {
        let mut detector = RcsEventDetector::new(2.0, 3, 6, false).unwrap();
        let batch = ndarray::Array2::from_shape_fn((10, 1), |(i, _)| if i >= 4 { 5.0 } else { 0.0 });

        // Peak at sample 4 of the batch
        assert_eq!(detector.update_batch(batch.view()).unwrap(), vec![4]);
    }

    #[test]
    fn test_detector_energy_history() {
        let mut detector = RcsEventDetector::new(2.0, 3, 6, true).unwrap();
        detector.update(&[0.0, 0.0]).unwrap();
        detector.update(&[1.0, 0.0]).unwrap();
        assert_eq!(detector.energy_history(), Some(&[0.0, 1.0][..]));

        let no_history = RcsEventDetector::default();
        assert!(no_history.energy_history().is_none());
    }

    #[test]
    fn test_detector_event_log_is_bounded() {
        let config = ChangeEnergyConfig {
            threshold: 0.5,
            peak_window: 1,
            refractory_window: 1,
            max_logged_events: 2,
            ..ChangeEnergyConfig::default()
        };
        let mut detector = RcsEventDetector::from_config(&config).unwrap();

        let mut count = 0;
        for i in 0..60 {
            let value = if i % 2 == 0 { 0.0 } else { 10.0 };
            if detector.update(&[value]).unwrap().is_some() {
                count += 1;
            }
        }

        assert!(count > 2);
        assert_eq!(detector.events().len(), 2);
    }

    #[test]
    fn test_detector_invalid_config() {
        assert!(matches!(RcsEventDetector::new(2.0, 0, 10, false), Err(Error::ConfigError(_))));
        assert!(RcsEventDetector::new(-1.0, 5, 10, false).is_err());
    }
}
