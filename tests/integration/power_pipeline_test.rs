//! Integration tests for the power (CP / W') workflow.
//!
//! Tests the end-to-end flow:
//! 1. Read exhaustion trials from CSV and fit CP / W'
//! 2. Read a time,power workout from CSV
//! 3. Simulate W' balance
//! 4. Export the augmented series

use wbal::metrics::analytics::{FittedModel, ModelKind};
use wbal::recording::{
    export_balance_csv_to_file, import_samples_from_file, import_trials_from_file,
};
use wbal::storage::config::{load_config_from, save_config_to};
use wbal::{AppConfig, BalancePipeline};

/// Simulates 3x 2-min intervals well above CP with 3-min recoveries, one sample per second.
fn simulate_interval_workout(cp: f64) -> String {
    let mut rows = String::new();
    let mut t = 0;
    let mut push = |secs: u32, power: f64, rows: &mut String| {
        for _ in 0..secs {
            rows.push_str(&format!("{t},{power}\n"));
            t += 1;
        }
    };

    push(300, cp * 0.6, &mut rows);
    for _ in 0..3 {
        push(120, cp * 1.3, &mut rows);
        push(180, cp * 0.5, &mut rows);
    }
    rows
}

#[test]
fn test_full_power_pipeline() {
    let dir = tempfile::tempdir().unwrap();

    let trials_path = dir.path().join("trials.csv");
    std::fs::write(
        &trials_path,
        "Power (watts),Duration (sec)\n278,3533\n349,1790\n435,600\n465,300\n725,120\n",
    )
    .unwrap();

    let config = AppConfig::default();
    let trials = import_trials_from_file(&trials_path).unwrap();
    assert_eq!(trials.len(), 5);

    let fit = config.fitter().fit(&trials).unwrap();
    let model = fit.model;
    assert!(model.capacity > 0.0);

    let workout_path = dir.path().join("power2.csv");
    std::fs::write(&workout_path, simulate_interval_workout(model.asymptote)).unwrap();
    let samples = import_samples_from_file(&workout_path, 1).unwrap();
    assert_eq!(samples.len(), 300 + 3 * 300);

    let output = BalancePipeline::from_config(&config, ModelKind::Power, model)
        .unwrap()
        .run(&samples)
        .unwrap();

    let balances = output.series.balances();
    assert_eq!(balances.len(), samples.len());
    assert_eq!(balances[0], model.capacity);
    assert!(balances.iter().all(|b| *b >= 0.0 && *b <= model.capacity));

    // Each interval drains 0.3 * CP * 120s of W', recoveries only partly refill
    let first_interval_end = balances[300 + 120 - 1];
    let drain_per_sec = model.asymptote * 1.3 - model.asymptote;
    let expected = (model.capacity - drain_per_sec * 120.0).max(0.0);
    assert!((first_interval_end - expected).abs() < 1e-6);
    assert!(output.summary.min_balance < first_interval_end);
    assert!((output.summary.time_depleting_secs - 3.0 * 120.0).abs() <= 3.0);

    let out_path = dir.path().join("wbal.csv");
    export_balance_csv_to_file(&samples, &output.series, output.smoothed, &out_path).unwrap();
    let written = std::fs::read_to_string(&out_path).unwrap();
    assert_eq!(written.lines().count(), samples.len() + 1);
    assert!(written.starts_with("timestamp,rate,balance\n"));
}

#[test]
fn test_manual_model_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = AppConfig::default();
    config.model.power = Some(FittedModel::new(250.0, 20000.0));
    config.simulation.tau_secs = 546.0;
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    let model = loaded.manual_model(ModelKind::Power).unwrap();
    let pipeline = BalancePipeline::from_config(&loaded, ModelKind::Power, model).unwrap();

    assert_eq!(pipeline.simulator().tau_secs(), 546.0);
    assert_eq!(pipeline.simulator().model(), model);
}
