use ptsa_core::{run_solver, PtsaConfig, SolverError};

fn square(n: usize, value: f64) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 0.0 } else { value }).collect())
        .collect()
}

fn expect_config_error(config: PtsaConfig) {
    let err = run_solver(&square(4, 1.0), 1, &config).unwrap_err();
    assert!(
        matches!(err, SolverError::InvalidConfiguration(_)),
        "expected a configuration error, got {err}"
    );
}

fn expect_matrix_error(rows: &[Vec<f64>]) {
    let err = run_solver(rows, 1, &PtsaConfig::default()).unwrap_err();
    assert!(
        matches!(err, SolverError::InvalidMatrix(_)),
        "expected a matrix error, got {err}"
    );
}

#[test]
fn rejects_empty_population() {
    expect_config_error(PtsaConfig {
        number_of_states: 0,
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_zero_threads() {
    expect_config_error(PtsaConfig {
        number_of_concurrent_threads: 0,
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_out_of_range_probabilities() {
    expect_config_error(PtsaConfig {
        probability_of_shuffle: 1.5,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        probability_of_heuristic: -0.1,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        swap_states_probability: f64::NAN,
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_bad_temperature_ranges() {
    expect_config_error(PtsaConfig {
        min_temperature: 0.0,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        min_temperature: 10.0,
        max_temperature: 1.0,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        temp_beta_a: 0.0,
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_bad_segment_bound() {
    expect_config_error(PtsaConfig {
        max_length_percent_of_cycle: 0.0,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        max_length_percent_of_cycle: 0.4,
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_bad_closeness_and_cooling() {
    expect_config_error(PtsaConfig {
        closeness: 0.5,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        cooling_rate: 0.0,
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        cooling_rate: 1.2,
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_zero_stop_conditions() {
    expect_config_error(PtsaConfig {
        steps_per_epoch: Some(0),
        ..PtsaConfig::default()
    });
    expect_config_error(PtsaConfig {
        max_epochs: Some(0),
        ..PtsaConfig::default()
    });
}

#[test]
fn rejects_zero_time_budget() {
    let err = run_solver(&square(4, 1.0), 0, &PtsaConfig::default()).unwrap_err();
    assert!(matches!(err, SolverError::InvalidConfiguration(_)));
}

#[test]
fn rejects_non_square_matrix() {
    expect_matrix_error(&[
        vec![0.0, 1.0, 2.0],
        vec![1.0, 0.0],
        vec![2.0, 1.0, 0.0],
    ]);
}

#[test]
fn rejects_too_small_matrix() {
    expect_matrix_error(&[]);
    expect_matrix_error(&[vec![0.0]]);
}

#[test]
fn rejects_negative_and_non_finite_entries() {
    expect_matrix_error(&[vec![0.0, -1.0], vec![1.0, 0.0]]);
    expect_matrix_error(&[vec![0.0, f64::NAN], vec![1.0, 0.0]]);
    expect_matrix_error(&[vec![0.0, f64::INFINITY], vec![1.0, 0.0]]);
}

#[test]
fn diagonal_entries_are_ignored() {
    // The cycle never uses self-edges, so diagonal values carry no meaning.
    let rows = vec![vec![99.0, 3.0], vec![7.0, -5.0]];
    let result = run_solver(&rows, 1, &PtsaConfig::default()).unwrap();
    assert_eq!(result.length, 10.0);
}
