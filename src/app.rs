//! Stream host composing the filters over a line-oriented input.
//!
//! Each input line is one frame: six IMU values `ax ay az gx gy gz`
//! (gyro in degrees/second), optionally followed by `|` and the classifier
//! probability vector for that frame. Values are separated by commas or
//! whitespace; blank lines and `#` comments are ignored.

use std::io::BufRead;

use log::{debug, info, warn};

use crate::{
    change_energy::{ChangeEvent, RcsEventDetector},
    config::Config,
    constants::IMU_CHANNELS,
    debounce::{create_prediction_filter, DebouncePolicy, GestureConfirmation, PredictionFilter},
    error::{Error, Result},
    labels::GestureLabels,
    orientation::OrientationEstimator,
    rotation_gesture::RotationGestureFilter,
    utils::ensure_finite,
};

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// `[ax, ay, az, gx, gy, gz]`
    pub imu: [f64; IMU_CHANNELS],
    /// Classifier output for this frame, if the line carried one
    pub probabilities: Option<Vec<f64>>,
}

/// Everything the filters emitted for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    pub change_event: Option<ChangeEvent>,
    pub gesture: Option<GestureConfirmation>,
    /// Degrees turned since the previous frame while a rotation is active
    pub rotation: Option<f64>,
}

/// Totals reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    pub frames: usize,
    pub skipped_lines: usize,
    pub change_events: usize,
    pub gestures: usize,
    pub rotation_updates: usize,
    /// Sum of all emitted rotation deltas in degrees
    pub total_rotation: f64,
}

/// Parse one input line
///
/// Returns `Ok(None)` for blank and comment-only lines.
///
/// # Errors
///
/// Returns `Error::ParseError` for non-numeric values or an empty
/// probability section, and `Error::ShapeError` when the IMU part does not
/// hold exactly six values
pub fn parse_frame(line: &str) -> Result<Option<Frame>> {
    let content = line.split('#').next().unwrap_or_default().trim();
    if content.is_empty() {
        return Ok(None);
    }

    let (imu_part, prob_part) = match content.split_once('|') {
        Some((imu, probs)) => (imu, Some(probs)),
        None => (content, None),
    };

    let values = parse_values(imu_part)?;
    let imu: [f64; IMU_CHANNELS] = values.as_slice().try_into().map_err(|_| {
        Error::ShapeError(format!(
            "Expected {IMU_CHANNELS} IMU values, got {}",
            values.len()
        ))
    })?;

    let probabilities = match prob_part {
        Some(part) => {
            let probs = parse_values(part)?;
            if probs.is_empty() {
                return Err(Error::ParseError("Empty probability vector".to_string()));
            }
            Some(probs)
        }
        None => None,
    };

    Ok(Some(Frame { imu, probabilities }))
}

fn validate_frame(frame: &Frame) -> Result<()> {
    if let Some(probabilities) = &frame.probabilities {
        if probabilities.is_empty() {
            return Err(Error::ShapeError("Probability vector is empty".to_string()));
        }
        ensure_finite("Probability vector", probabilities)?;
    }
    ensure_finite("IMU sample", &frame.imu)
}

fn parse_values(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            let value = token
                .parse::<f64>()
                .map_err(|e| Error::ParseError(format!("Invalid number '{token}': {e}")))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(Error::ParseError(format!("Non-finite value '{token}'")))
            }
        })
        .collect()
}

/// Gesture stream application
pub struct StreamApp {
    detector: RcsEventDetector,
    orientation: OrientationEstimator,
    rotation: RotationGestureFilter,
    prediction: Box<dyn PredictionFilter>,
    bootstrap_samples: usize,
    bootstrap: Vec<[f64; IMU_CHANNELS]>,
    summary: StreamSummary,
}

impl StreamApp {
    /// Build every filter from a validated configuration
    pub fn new(config: &Config, policy: DebouncePolicy, labels: GestureLabels) -> Result<Self> {
        info!("Initializing gesture stream with {policy} debounce policy");

        let detector = RcsEventDetector::from_config(&config.change_energy)?;
        let orientation = OrientationEstimator::from_config(&config.orientation)?;
        let rotation = RotationGestureFilter::from_config(&config.rotation)?;
        let prediction = create_prediction_filter(policy, &config.prediction, labels)?;

        Ok(Self {
            detector,
            orientation,
            rotation,
            prediction,
            bootstrap_samples: config.orientation.bootstrap_samples.max(1),
            bootstrap: Vec::with_capacity(config.orientation.bootstrap_samples),
            summary: StreamSummary::default(),
        })
    }

    /// Run every filter on one frame
    ///
    /// Orientation is unavailable until the bootstrap batch is complete;
    /// rotation tracking starts afterwards. A rejected frame leaves every
    /// filter untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeError` for an empty probability vector and
    /// `Error::InvalidInput` for a non-finite value
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameOutput> {
        validate_frame(frame)?;

        let change_event = self.detector.update(&frame.imu)?;
        if let Some(event) = change_event {
            info!("Change event at sample {} (energy {:.3})", event.index, event.magnitude);
            self.summary.change_events += 1;
        }

        if self.orientation.is_initialized() {
            self.orientation.update_sample(&frame.imu)?;
        } else {
            self.bootstrap.push(frame.imu);
            if self.bootstrap.len() >= self.bootstrap_samples {
                self.flush_bootstrap();
            }
        }

        let mut output = FrameOutput {
            change_event,
            ..FrameOutput::default()
        };

        if let Some(probabilities) = &frame.probabilities {
            output.gesture = self.prediction.update(probabilities, change_event.as_slice())?;
            if output.gesture.is_some() {
                self.summary.gestures += 1;
            }

            if let Some(current) = self.orientation.current_rotation() {
                output.rotation = match self.rotation.update(probabilities, &current) {
                    Ok(delta) => delta,
                    Err(e) => {
                        warn!("Rotation tracking skipped: {e}");
                        None
                    }
                };
            }
            if let Some(delta) = output.rotation {
                info!("Rotation: {delta:+.2} deg");
                self.summary.rotation_updates += 1;
                self.summary.total_rotation += delta;
            }
        }

        self.summary.frames += 1;
        Ok(output)
    }

    fn flush_bootstrap(&mut self) {
        if self.bootstrap.is_empty() {
            return;
        }
        let accepted = self.orientation.update_imu_values(&self.bootstrap);
        debug!("Orientation bootstrapped from {accepted} samples");
        self.bootstrap.clear();
    }

    /// Process every line of `reader` until end of input
    ///
    /// Malformed lines are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<StreamSummary> {
        info!("Processing input stream");

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let frame = match parse_frame(&line) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Line {}: {e}", line_no + 1);
                    self.summary.skipped_lines += 1;
                    continue;
                }
            };

            if let Err(e) = self.process_frame(&frame) {
                warn!("Line {}: {e}", line_no + 1);
                self.summary.skipped_lines += 1;
            }
        }

        // Short streams never fill the bootstrap batch
        self.flush_bootstrap();

        let summary = self.summary.clone();
        info!(
            "Processed {} frames: {} change events, {} gestures, {} rotation updates ({:+.1} deg total), {} lines skipped",
            summary.frames,
            summary.change_events,
            summary.gestures,
            summary.rotation_updates,
            summary.total_rotation,
            summary.skipped_lines
        );
        Ok(summary)
    }

    #[must_use]
    pub fn summary(&self) -> &StreamSummary {
        &self.summary
    }

    #[must_use]
    pub fn orientation(&self) -> &OrientationEstimator {
        &self.orientation
    }

    #[must_use]
    pub fn detector(&self) -> &RcsEventDetector {
        &self.detector
    }

    #[must_use]
    pub fn prediction_filter(&self) -> &dyn PredictionFilter {
        self.prediction.as_ref()
    }
}
