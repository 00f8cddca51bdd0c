//! Edge case tests: first samples, malformed input, extreme values, resets

use gesture_stream::{
    change_energy::{RcsEventDetector, RcsFilter},
    config::PredictionConfig,
    debounce::{create_prediction_filter, DebouncePolicy},
    filters::create_filter,
    labels::GestureLabels,
    orientation::OrientationEstimator,
    quaternion::{signed_angle, unsigned_angle},
    rotation_gesture::RotationGestureFilter,
    Error,
};
use nalgebra::Quaternion;

#[test]
fn test_filter_extreme_values() {
    for description in ["none", "highpass:1.0", "butterworth:1.0", "butterworth:1.0:4"] {
        let mut filter = create_filter(description, 100.0, 2).unwrap();

        let extreme_values = [
            [f64::INFINITY, f64::NEG_INFINITY],
            [f64::NAN, f64::NAN],
            [f64::MAX, f64::MIN],
            [1e100, -1e100],
            [0.0, 0.0],
        ];

        // Non-finite input may propagate; it must not panic
        for sample in extreme_values {
            let out = filter.apply(&sample).unwrap();
            assert_eq!(out.len(), 2);
        }
    }
}

#[test]
fn test_filter_reset_behavior() {
    for description in ["highpass:2.0", "butterworth:2.0", "butterworth:2.0:3"] {
        let mut filter = create_filter(description, 100.0, 1).unwrap();

        let first = filter.apply(&[5.0]).unwrap();
        filter.apply(&[-3.0]).unwrap();
        filter.apply(&[8.0]).unwrap();

        filter.reset();
        let after_reset = filter.apply(&[5.0]).unwrap();
        assert_eq!(first, after_reset, "{} did not reset", filter.name());
    }
}

#[test]
fn test_wrong_width_leaves_state_untouched() {
    let mut reference = create_filter("butterworth:2.0", 100.0, 2).unwrap();
    let mut filter = create_filter("butterworth:2.0", 100.0, 2).unwrap();

    reference.apply(&[1.0, 2.0]).unwrap();
    filter.apply(&[1.0, 2.0]).unwrap();
    assert!(matches!(filter.apply(&[1.0, 2.0, 3.0]), Err(Error::ShapeError(_))));

    assert_eq!(filter.apply(&[4.0, 1.0]).unwrap(), reference.apply(&[4.0, 1.0]).unwrap());
}

#[test]
fn test_non_finite_samples_do_not_poison_state() {
    let mut estimator = OrientationEstimator::new(100.0, 0.033, 100, false).unwrap();
    let mut detector = RcsEventDetector::new(2.0, 20, 40, false).unwrap();
    let still = [0.0, 0.0, 9.81, 0.0, 0.0, 0.0];

    estimator.update_imu_values(&[still, still]);
    detector.update(&still).unwrap();

    let nan_row = [0.0, 0.0, 9.81, f64::NAN, 0.0, 0.0];
    assert!(matches!(estimator.update_sample(&nan_row), Err(Error::InvalidInput(_))));
    assert!(matches!(detector.update(&nan_row), Err(Error::InvalidInput(_))));

    for _ in 0..500 {
        estimator.update_sample(&still).unwrap();
        detector.update(&still).unwrap();
    }
    let q = estimator.current_rotation().unwrap();
    assert!(q.coords.iter().all(|c| c.is_finite()));
    assert!((q.norm() - 1.0).abs() < 1e-6);

    let mut events = 0;
    for i in 0..200 {
        let value = if i % 2 == 0 { 0.0 } else { 50.0 };
        if detector.update(&[value, 0.0, 9.81, 0.0, 0.0, 0.0]).unwrap().is_some() {
            events += 1;
        }
    }
    assert!(events > 0);
}

#[test]
fn test_change_energy_channel_change() {
    let mut filter = RcsFilter::default();
    filter.update(&[0.0, 0.0]).unwrap();
    filter.update(&[1.0, 0.0]).unwrap();
    assert!(filter.update(&[1.0, 0.0, 0.0]).is_err());
    // The rejected sample did not touch the running state
    assert_eq!(filter.update(&[1.0, 0.0]).unwrap(), 0.625);

    let mut detector = RcsEventDetector::new(2.0, 20, 40, false).unwrap();
    detector.update(&[0.0, 0.0]).unwrap();
    assert!(detector.update(&[0.0]).is_err());
    assert_eq!(detector.samples_processed(), 1);
}

#[test]
fn test_reset_returns_to_first_sample_behaviour() {
    let mut filter = RcsFilter::default();
    filter.update(&[0.0]).unwrap();
    filter.update(&[10.0]).unwrap();
    filter.reset();
    assert_eq!(filter.update(&[42.0]).unwrap(), 0.0);
}

#[test]
fn test_zero_quaternion_is_invalid_input() {
    let zero = Quaternion::new(0.0, 0.0, 0.0, 0.0);
    let identity = Quaternion::identity();
    assert!(matches!(signed_angle(&zero, &identity), Err(Error::InvalidInput(_))));
    assert!(matches!(unsigned_angle(&identity, &zero), Err(Error::InvalidInput(_))));
}

#[test]
fn test_first_orientation_sample_bootstraps() {
    let mut estimator = OrientationEstimator::new(100.0, 0.033, 10, false).unwrap();
    let q = estimator.update_sample(&[0.0, 0.0, 9.81, 10.0, 0.0, 0.0]).unwrap();
    assert_eq!(q, Quaternion::identity());
    assert_eq!(estimator.rotation_history().len(), 1);
}

#[test]
fn test_rotation_without_start_stays_idle() {
    let mut filter = RotationGestureFilter::default();
    let mut p = vec![0.0; 9];
    p[6] = 1.0; // end before any start
    for _ in 0..10 {
        assert_eq!(filter.update(&p, &Quaternion::identity()).unwrap(), None);
    }
    assert!(!filter.is_rotating());
}

#[test]
fn test_debounce_empty_probabilities() {
    for policy in [DebouncePolicy::Event, DebouncePolicy::Change, DebouncePolicy::Hold] {
        let mut filter =
            create_prediction_filter(policy, &PredictionConfig::default(), GestureLabels::default()).unwrap();
        assert!(matches!(filter.update(&[], &[]), Err(Error::ShapeError(_))));
    }
}

#[test]
fn test_single_class_never_confirms() {
    for policy in [DebouncePolicy::Event, DebouncePolicy::Change, DebouncePolicy::Hold] {
        let mut filter =
            create_prediction_filter(policy, &PredictionConfig::default(), GestureLabels::default()).unwrap();
        for _ in 0..5 {
            assert!(filter.update(&[1.0], &[]).unwrap().is_none());
        }
    }
}
