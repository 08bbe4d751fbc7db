//! Unit tests for the smoothing stage.

use wbal::metrics::analytics::Sample;
use wbal::metrics::smoothing::{RollingAverage, SmoothingStage, DEFAULT_WINDOW_SIZE};

#[test]
fn test_default_window_is_ten() {
    assert_eq!(SmoothingStage::default().window_size(), DEFAULT_WINDOW_SIZE);
    assert_eq!(DEFAULT_WINDOW_SIZE, 10);
}

#[test]
fn test_rolling_mean_with_backfill() {
    let values: Vec<f64> = (1..=15).map(f64::from).collect();
    let smoothed = SmoothingStage::default().apply(&values);

    assert_eq!(smoothed.len(), values.len());
    // First full window is 1..=10, mean 5.5, back-filled over the first nine values
    for v in &smoothed[..10] {
        assert!((v - 5.5).abs() < 1e-12);
    }
    // Last window is 6..=15
    assert!((smoothed[14] - 10.5).abs() < 1e-12);
}

#[test]
fn test_constant_signal_unchanged() {
    let values = vec![-0.03; 40];
    let smoothed = SmoothingStage::new(7).apply(&values);
    assert!(smoothed.iter().all(|v| (v + 0.03).abs() < 1e-15));
}

#[test]
fn test_samples_keep_alignment() {
    let samples: Vec<Sample> = (0..25)
        .map(|i| Sample::new(i as f64 * 0.5, if i % 2 == 0 { 1.0 } else { -1.0 }))
        .collect();
    let smoothed = SmoothingStage::new(4).apply_to_samples(&samples);

    assert_eq!(smoothed.len(), samples.len());
    for (s, raw) in smoothed.iter().zip(&samples) {
        assert_eq!(s.timestamp, raw.timestamp);
        assert!(s.rate.abs() < 1e-12);
    }
}

#[test]
fn test_rolling_average_drops_oldest() {
    let mut avg = RollingAverage::new(2);
    avg.add(10.0);
    avg.add(20.0);
    assert_eq!(avg.add(40.0), Some(30.0));
    assert_eq!(avg.len(), 2);
}
