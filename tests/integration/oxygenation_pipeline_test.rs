//! Integration tests for the muscle oxygenation (CMR / M') workflow.
//!
//! The trial fit yields a negative M' for deoxygenation data; the pipeline has
//! to invert it, smooth the SmO2 acceleration and drain on rates below CMR.

use wbal::metrics::analytics::{
    AnalyticsError, BalanceError, DepletionComparator, ModelKind, Trial,
};
use wbal::recording::{export_balance_csv, parse_samples_csv, parse_trials_csv};
use wbal::{AppConfig, BalancePipeline};

fn cmr_trials() -> Vec<Trial> {
    parse_trials_csv("-0.019,7200\n-0.035,4800\n-0.048,3600\n-0.068,2400\n-0.22,1200\n")
        .unwrap()
}

/// Six-column SmO2 export: time,SmO2,SmO2_accel,SmO2_jerk,acceleration,jerk.
fn smo2_workout(accel: impl Fn(usize) -> f64, len: usize) -> String {
    (0..len)
        .map(|i| format!("{i},{:.1},{},0.0,0.0,0.0\n", 70.0 - i as f64 * 0.01, accel(i)))
        .collect()
}

#[test]
fn test_full_oxygenation_pipeline() {
    let config = AppConfig::default();
    let fit = config.fitter().fit(&cmr_trials()).unwrap();
    assert!(fit.model.capacity < 0.0);
    let cmr = fit.model.asymptote;

    // Deoxygenate 0.05 %/s faster than CMR for two minutes, then ease off
    let csv = smo2_workout(
        |i| if (60..180).contains(&i) { cmr - 0.05 } else { cmr + 0.05 },
        400,
    );
    let samples = parse_samples_csv(&csv, ModelKind::Oxygenation.default_rate_column()).unwrap();
    assert_eq!(samples.len(), 400);

    let pipeline = BalancePipeline::from_config(&config, ModelKind::Oxygenation, fit.model).unwrap();
    assert_eq!(pipeline.simulator().comparator(), DepletionComparator::LessThan);
    let capacity = pipeline.simulator().model().capacity;
    assert_eq!(capacity, fit.model.capacity.abs());

    let output = pipeline.run(&samples).unwrap();
    assert!(output.smoothed);

    let balances = output.series.balances();
    assert!(balances.iter().all(|b| *b >= 0.0 && *b <= capacity));
    assert!(output.summary.min_balance < capacity);
    assert!(output.summary.min_balance_at >= 150.0 && output.summary.min_balance_at <= 200.0);
    assert!(output.summary.final_balance > output.summary.min_balance);

    let exported = export_balance_csv(&samples, &output.series, output.smoothed).unwrap();
    let mut lines = exported.lines();
    assert_eq!(lines.next(), Some("timestamp,rate,smoothed_rate,balance"));
    assert_eq!(lines.count(), 400);
}

#[test]
fn test_oxygenation_reserve_clamps_at_zero() {
    let config = AppConfig::default();
    let fit = config.fitter().fit(&cmr_trials()).unwrap();
    let cmr = fit.model.asymptote;

    // Far below CMR for long enough to drain M' completely
    let capacity = fit.model.capacity.abs();
    let len = (capacity / 0.5) as usize + 200;
    let csv = smo2_workout(|_| cmr - 0.5, len);
    let samples = parse_samples_csv(&csv, 2).unwrap();

    let output = BalancePipeline::from_config(&config, ModelKind::Oxygenation, fit.model)
        .unwrap()
        .run(&samples)
        .unwrap();

    assert_eq!(output.summary.min_balance, 0.0);
    assert!(output.summary.time_exhausted_secs > 0.0);
    assert!(output.series.balances().iter().all(|b| *b >= 0.0));
}

#[test]
fn test_out_of_order_workout_rejected() {
    let samples = parse_samples_csv("0,70,-0.01\n5,69,-0.02\n3,68,-0.03\n", 2).unwrap();
    let fit = AppConfig::default().fitter().fit(&cmr_trials()).unwrap();

    let result = BalancePipeline::from_config(&AppConfig::default(), ModelKind::Oxygenation, fit.model)
        .unwrap()
        .with_smoothing(None)
        .run(&samples);

    assert!(matches!(
        result,
        Err(AnalyticsError::Balance(BalanceError::OutOfOrderInput { index: 2, .. }))
    ));
}
