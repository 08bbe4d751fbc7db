//! Unit tests for reserve balance simulation properties.

use wbal::metrics::analytics::{
    BalanceError, BalanceSimulator, DepletionComparator, FittedModel, Regime, Sample,
};

/// Deterministic pseudo-random workout with irregular sampling.
fn irregular_workout(len: usize, seed: u64) -> Vec<Sample> {
    let mut state = seed;
    let mut next = || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };

    let mut t = 0.0;
    (0..len)
        .map(|i| {
            if i > 0 {
                // Occasional repeated timestamps and long gaps
                let r = next();
                t += if r < 0.1 {
                    0.0
                } else if r > 0.95 {
                    120.0
                } else {
                    r * 3.0
                };
            }
            Sample::new(t, next() * 900.0)
        })
        .collect()
}

#[test]
fn test_balance_bounded_for_random_workouts() {
    let model = FittedModel::new(280.0, 15000.0);

    for seed in 1..20 {
        let samples = irregular_workout(2000, seed);
        for comparator in [DepletionComparator::GreaterThan, DepletionComparator::LessThan] {
            let series = BalanceSimulator::new(model)
                .unwrap()
                .with_comparator(comparator)
                .simulate(&samples)
                .unwrap();

            assert_eq!(series.len(), samples.len());
            for (point, sample) in series.points().iter().zip(&samples) {
                assert_eq!(point.timestamp, sample.timestamp);
                assert!(point.balance >= 0.0 && point.balance <= model.capacity);
            }
        }
    }
}

#[test]
fn test_constant_supra_threshold_matches_closed_form() {
    let model = FittedModel::new(250.0, 12000.0);
    let (rate, dt) = (400.0, 2.0);
    let samples: Vec<Sample> = (0..60).map(|i| Sample::new(i as f64 * dt, rate)).collect();

    let series = BalanceSimulator::new(model).unwrap().simulate(&samples).unwrap();

    for (i, balance) in series.balances().iter().enumerate() {
        let expected = (model.capacity - (rate - model.asymptote) * dt * i as f64).max(0.0);
        assert!((balance - expected).abs() < 1e-9, "step {i}");
    }
}

#[test]
fn test_recovery_matches_analytic_solution_with_custom_tau() {
    let model = FittedModel::new(250.0, 20000.0);
    let tau = 180.0;
    let simulator = BalanceSimulator::new(model).unwrap().with_tau(tau).unwrap();

    // One 5s effort at +1000W leaves a 5kJ deficit, then recover at dt = 4s
    let mut samples = vec![Sample::new(0.0, 0.0), Sample::new(5.0, 1250.0)];
    samples.extend((1..=200).map(|k| Sample::new(5.0 + 4.0 * k as f64, 150.0)));

    let series = simulator.simulate(&samples).unwrap();
    let balances = series.balances();
    let deficit = model.capacity - balances[1];
    assert!((deficit - 5000.0).abs() < 1e-9);

    for k in 1..=200 {
        let t = 4.0 * k as f64;
        let expected = model.capacity - deficit * (-t / tau).exp();
        let actual = balances[k + 1];
        assert!((actual - expected).abs() < 1e-6);
        assert!(actual >= balances[k]);
    }
}

#[test]
fn test_rate_equal_to_asymptote_holds_capacity_for_both_polarities() {
    let model = FittedModel::new(-0.05, 300.0);
    let samples: Vec<Sample> = (0..50).map(|i| Sample::new(i as f64, -0.05)).collect();

    for comparator in [DepletionComparator::GreaterThan, DepletionComparator::LessThan] {
        let series = BalanceSimulator::new(model)
            .unwrap()
            .with_comparator(comparator)
            .simulate(&samples)
            .unwrap();
        assert!(series.balances().iter().all(|b| *b == 300.0));
    }
}

#[test]
fn test_out_of_order_produces_no_output() {
    let mut samples: Vec<Sample> = (0..10).map(|i| Sample::new(i as f64, 500.0)).collect();
    samples[6].timestamp = 4.5;

    let result = BalanceSimulator::new(FittedModel::new(250.0, 20000.0))
        .unwrap()
        .simulate(&samples);

    match result {
        Err(BalanceError::OutOfOrderInput { index, .. }) => assert_eq!(index, 6),
        other => panic!("expected OutOfOrderInput, got {other:?}"),
    }
}

#[test]
fn test_regimes_recorded_per_step() {
    let samples = vec![
        Sample::new(0.0, 500.0),
        Sample::new(1.0, 500.0),
        Sample::new(1.0, 500.0),
        Sample::new(2.0, 100.0),
    ];
    let series = BalanceSimulator::new(FittedModel::new(250.0, 20000.0))
        .unwrap()
        .simulate(&samples)
        .unwrap();

    let regimes: Vec<Option<Regime>> = series.points().iter().map(|p| p.regime).collect();
    assert_eq!(
        regimes,
        vec![None, Some(Regime::Depletion), None, Some(Regime::Recovery)]
    );
}
